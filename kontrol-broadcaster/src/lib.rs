//! OSC broadcaster for Kontrol peers
//!
//! Keeps remote control/display applications in sync with the local rack by
//! sending every state change as an OSC message over UDP. One
//! [`OscBroadcaster`] serves one peer.
//!
//! # Features
//!
//! - Non-blocking notification path: encode into fixed 512-byte frames and
//!   push onto an unbounded queue, nothing else
//! - Dedicated writer thread owns all socket I/O
//! - Echo suppression: a change is never sent back to the peer it came from
//! - Keep-alive pings from the master broadcaster, liveness tracking per peer
//! - Best-effort delivery: send failures are logged and the frame dropped
//!
//! # Example Usage
//!
//! ```no_run
//! use std::time::Duration;
//! use kontrol_broadcaster::{BroadcasterConfig, KontrolCallback, OscBroadcaster};
//! use kontrol_model::{ChangeSource, Module, ParamValue, Parameter, Rack};
//!
//! let peer = ChangeSource::peer("192.168.1.40", 9000);
//! let config = BroadcasterConfig::new(peer, Duration::from_secs(5), true);
//! let broadcaster = OscBroadcaster::new(config);
//! assert!(broadcaster.connect("192.168.1.40", 9000));
//!
//! let rack = Rack::new("rack-1", "192.168.1.10", 6000);
//! let module = Module::new("m1", "Reverb", "mec.reverb");
//! let mix = Parameter::new("mix", "Mix", "pct", ParamValue::Float(0.7));
//!
//! // Local edit: forwarded to the peer
//! broadcaster.changed(&ChangeSource::local(), &rack, &module, &mix);
//!
//! // Driven by a timer elsewhere
//! broadcaster.write_poll();
//!
//! broadcaster.stop();
//! ```

pub mod broadcaster;
pub mod clock;
pub mod encode;
pub mod error;
pub mod frame;
pub mod osc;
pub mod transport;
pub mod writer;

// Re-exports
pub use broadcaster::{BroadcasterConfig, OscBroadcaster};
pub use clock::{default_clock, Clock, ManualClock, MonotonicClock};
pub use error::{BroadcasterError, DecodeError, EncodeError, Result};
pub use frame::{Frame, FrameBatch, MAX_N_OSC_MSGS, MAX_OSC_MESSAGE_SIZE};
pub use kontrol_model::{KontrolCallback, Notification};
pub use osc::{OscArg, OscMessage};
pub use transport::{Connector, Destination, TransmitChannel, Transport, UdpConnector, UdpTransport};
pub use writer::{WriterConfig, WriterState, WriterStats};
