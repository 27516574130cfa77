//! Configuration management

use anyhow::{bail, Context, Result};
use kontrol_model::Rack;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Longest keep-alive that fits the ping's int32 field
pub const MAX_KEEP_ALIVE_MS: u64 = i32::MAX as u64;

/// One OSC peer to keep in sync
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeerConfig {
    pub host: String,
    pub port: u16,

    /// Master peer broadcaster emits the keep-alive pings (at most one)
    #[serde(default)]
    pub master: bool,
}

/// Relay daemon configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    /// Path to configuration file
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Port we listen on, announced to peers in pings
    pub announce_port: u16,

    /// Keep-alive interval (milliseconds), 0 disables liveness expiry
    pub keep_alive_ms: u64,

    /// Peer is dropped after this many keep-alive intervals without a ping
    pub liveness_factor: u32,

    /// How often `write_poll` runs (milliseconds)
    pub poll_interval_ms: u64,

    /// Writer thread wake-up interval (milliseconds)
    pub writer_wake_ms: u64,

    /// Flush budget on shutdown (milliseconds)
    pub drain_timeout_ms: u64,

    /// Peers to broadcast to
    pub peers: Vec<PeerConfig>,

    /// Rack published to every peer at start-up
    pub demo_rack: Option<Rack>,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            config_path: Self::default_config_path(),
            announce_port: 6000,
            keep_alive_ms: 5000,
            liveness_factor: 2,
            poll_interval_ms: 250,
            writer_wake_ms: 100,
            drain_timeout_ms: 500,
            peers: vec![PeerConfig {
                host: "127.0.0.1".to_string(),
                port: 9000,
                master: true,
            }],
            demo_rack: None,
        }
    }
}

impl DaemonConfig {
    /// Load configuration from the default location, or create it
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            let config = Self::default();
            config.save().context("Failed to save default config")?;
            Ok(config)
        }
    }

    /// Load configuration from a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let mut config: DaemonConfig =
            toml::from_str(&contents).context("Failed to parse config file")?;

        config.config_path = path.to_path_buf();
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(&self.config_path, contents).context("Failed to write config file")?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let masters = self.peers.iter().filter(|p| p.master).count();
        if masters > 1 {
            bail!("{} peers marked as master, at most one allowed", masters);
        }
        if let Some(peer) = self.peers.iter().find(|p| p.host.trim().is_empty()) {
            bail!("Peer with port {} has an empty host", peer.port);
        }
        if self.keep_alive_ms > MAX_KEEP_ALIVE_MS {
            bail!(
                "keep_alive_ms {} exceeds the maximum of {}",
                self.keep_alive_ms,
                MAX_KEEP_ALIVE_MS
            );
        }
        if self.liveness_factor == 0 {
            bail!("liveness_factor must be greater than zero");
        }
        if self.poll_interval_ms == 0 {
            bail!("poll_interval_ms must be greater than zero");
        }
        Ok(())
    }

    fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("kontrol")
            .join("relay.toml")
    }
}
