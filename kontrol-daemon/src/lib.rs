//! Kontrol relay daemon library
//!
//! This module re-exports the daemon's modules for integration testing.

pub mod config;
pub mod listener;
pub mod registry;

pub use config::{DaemonConfig, PeerConfig};
pub use registry::{PeerDefaults, PeerRegistry, RegistryError};
