//! Kontrol rack model
//!
//! Read-only view of the control surface consumed by the OSC broadcaster:
//! racks hold modules, modules expose pages of parameters. Every state change
//! is delivered as a [`Notification`] tagged with the [`ChangeSource`] it came
//! from, through the [`KontrolCallback`] interface.
//!
//! # Example
//!
//! ```
//! use kontrol_model::{ChangeSource, EntityId, Module, ParamValue, Parameter, Rack};
//!
//! let rack = Rack::new("rack-1", "127.0.0.1", 6000);
//! let module = Module::new("m1", "Reverb", "mec.reverb");
//! let param = Parameter::new("mix", "Mix", "pct", ParamValue::Float(0.5))
//!     .with_attributes(vec![ParamValue::Float(0.0), ParamValue::Float(1.0)]);
//!
//! assert_eq!(rack.id, EntityId::from("rack-1"));
//! assert_ne!(ChangeSource::local(), ChangeSource::peer("127.0.0.1", 9000));
//! # let _ = (module, param);
//! ```

pub mod entities;
pub mod notification;
pub mod source;

// Re-exports
pub use entities::{EntityId, Module, Page, ParamValue, Parameter, Rack};
pub use notification::{KontrolCallback, Notification};
pub use source::{ChangeSource, SourceKind};
