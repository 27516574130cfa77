//! Per-peer broadcaster registry
//!
//! Owns one [`OscBroadcaster`] per configured peer and fans every notification
//! out to all of them. Each broadcaster filters out changes that came from its
//! own peer.

use kontrol_broadcaster::{BroadcasterConfig, OscBroadcaster, WriterConfig, WriterState};
use kontrol_model::{ChangeSource, KontrolCallback, Notification, Rack};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::{DaemonConfig, PeerConfig};

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Peer {host}:{port} already registered")]
    Duplicate { host: String, port: u16 },

    #[error("A master peer is already registered ({host}:{port})")]
    MasterTaken { host: String, port: u16 },

    #[error("Failed to connect to {host}:{port}")]
    ConnectFailed { host: String, port: u16 },
}

/// Broadcaster settings shared by every peer
#[derive(Debug, Clone)]
pub struct PeerDefaults {
    pub keep_alive: Duration,
    pub announce_port: u16,
    pub liveness_factor: u32,
    pub writer: WriterConfig,
}

impl From<&DaemonConfig> for PeerDefaults {
    fn from(config: &DaemonConfig) -> Self {
        Self {
            keep_alive: Duration::from_millis(config.keep_alive_ms),
            announce_port: config.announce_port,
            liveness_factor: config.liveness_factor,
            writer: WriterConfig {
                wake_interval: Duration::from_millis(config.writer_wake_ms.max(1)),
                drain_timeout: Duration::from_millis(config.drain_timeout_ms),
            },
        }
    }
}

pub struct PeerRegistry {
    defaults: PeerDefaults,
    peers: RwLock<Vec<Arc<OscBroadcaster>>>,
}

impl PeerRegistry {
    pub fn new(defaults: PeerDefaults) -> Self {
        Self {
            defaults,
            peers: RwLock::new(Vec::new()),
        }
    }

    fn peer_config(&self, peer: &PeerConfig) -> BroadcasterConfig {
        BroadcasterConfig::new(
            ChangeSource::peer(&peer.host, peer.port),
            self.defaults.keep_alive,
            peer.master,
        )
        .with_announce_port(self.defaults.announce_port)
        .with_liveness_factor(self.defaults.liveness_factor)
        .with_writer(self.defaults.writer)
    }

    /// Create, connect and register a broadcaster for `peer`
    pub fn add_peer(&self, peer: &PeerConfig) -> Result<Arc<OscBroadcaster>, RegistryError> {
        let broadcaster = OscBroadcaster::new(self.peer_config(peer));
        self.register(peer, broadcaster)
    }

    /// Register an already constructed broadcaster, connecting it to `peer`.
    ///
    /// The connect happens outside the peers lock so notifications keep
    /// flowing to the other peers while the socket is being set up.
    pub fn register(
        &self,
        peer: &PeerConfig,
        broadcaster: OscBroadcaster,
    ) -> Result<Arc<OscBroadcaster>, RegistryError> {
        Self::admit(&self.peers.read(), peer, &broadcaster)?;

        if !broadcaster.connect(&peer.host, peer.port) {
            return Err(RegistryError::ConnectFailed {
                host: peer.host.clone(),
                port: peer.port,
            });
        }

        let mut peers = self.peers.write();
        if let Err(e) = Self::admit(&peers, peer, &broadcaster) {
            drop(peers);
            broadcaster.stop();
            return Err(e);
        }

        info!("Registered peer {}:{} (master: {})", peer.host, peer.port, peer.master);
        let broadcaster = Arc::new(broadcaster);
        peers.push(Arc::clone(&broadcaster));
        Ok(broadcaster)
    }

    /// Duplicate and single-master checks against the current peer set
    fn admit(
        peers: &[Arc<OscBroadcaster>],
        peer: &PeerConfig,
        broadcaster: &OscBroadcaster,
    ) -> Result<(), RegistryError> {
        if peers.iter().any(|b| b.is_this_host(&peer.host, peer.port)) {
            return Err(RegistryError::Duplicate {
                host: peer.host.clone(),
                port: peer.port,
            });
        }
        if broadcaster.is_master() {
            if let Some(master) = peers.iter().find(|b| b.is_master()) {
                return Err(RegistryError::MasterTaken {
                    host: master.host(),
                    port: master.port(),
                });
            }
        }
        Ok(())
    }

    pub fn find(&self, host: &str, port: u16) -> Option<Arc<OscBroadcaster>> {
        self.peers
            .read()
            .iter()
            .find(|b| b.is_this_host(host, port))
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.peers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.read().is_empty()
    }

    /// Publish `racks` to every peer
    pub fn publish(&self, src: &ChangeSource, racks: &[Rack]) {
        for peer in self.peers.read().iter() {
            peer.publish(src, racks);
        }
    }

    /// Drive keep-alive and drop peers that went silent or whose writer has
    /// already shut down.
    ///
    /// Returns the number of peers removed.
    pub fn poll(&self) -> usize {
        let snapshot: Vec<_> = self.peers.read().clone();
        let mut dead = Vec::new();
        for peer in &snapshot {
            if peer.writer_state() == WriterState::Terminated {
                dead.push(Arc::clone(peer));
                continue;
            }
            peer.write_poll();
            if !peer.is_active() {
                dead.push(Arc::clone(peer));
            }
        }
        if dead.is_empty() {
            return 0;
        }

        self.peers
            .write()
            .retain(|p| !dead.iter().any(|d| Arc::ptr_eq(p, d)));
        for peer in &dead {
            warn!("Peer {}:{} inactive, removing", peer.host(), peer.port());
            peer.stop();
        }
        dead.len()
    }
}

impl KontrolCallback for PeerRegistry {
    fn notify(&self, src: &ChangeSource, event: &Notification<'_>) {
        for peer in self.peers.read().iter() {
            peer.notify(src, event);
        }
    }

    fn stop(&self) {
        let peers: Vec<_> = self.peers.write().drain(..).collect();
        for peer in peers {
            peer.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kontrol_broadcaster::{default_clock, Connector, Destination, Transport, UdpConnector};
    use kontrol_model::{Module, ParamValue, Parameter};
    use std::io;
    use std::time::Instant;

    /// Connector whose socket setup takes a while, like a slow name lookup
    struct SlowConnector(Duration);

    impl Connector for SlowConnector {
        fn open(&self, dest: &Destination) -> io::Result<Arc<dyn Transport>> {
            std::thread::sleep(self.0);
            UdpConnector.open(dest)
        }
    }

    fn defaults() -> PeerDefaults {
        PeerDefaults {
            keep_alive: Duration::from_millis(1000),
            announce_port: 6000,
            liveness_factor: 2,
            writer: WriterConfig {
                wake_interval: Duration::from_millis(5),
                drain_timeout: Duration::from_millis(100),
            },
        }
    }

    fn peer(port: u16, master: bool) -> PeerConfig {
        PeerConfig {
            host: "127.0.0.1".to_string(),
            port,
            master,
        }
    }

    #[test]
    fn test_duplicate_peer_rejected() {
        let registry = PeerRegistry::new(defaults());
        registry.add_peer(&peer(19000, false)).unwrap();
        assert!(matches!(
            registry.add_peer(&peer(19000, false)),
            Err(RegistryError::Duplicate { port: 19000, .. })
        ));
        assert_eq!(registry.len(), 1);
        registry.stop();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_single_master() {
        let registry = PeerRegistry::new(defaults());
        registry.add_peer(&peer(19001, true)).unwrap();
        assert!(matches!(
            registry.add_peer(&peer(19002, true)),
            Err(RegistryError::MasterTaken { port: 19001, .. })
        ));
        registry.add_peer(&peer(19002, false)).unwrap();
        assert_eq!(registry.len(), 2);
        assert!(registry.find("127.0.0.1", 19002).is_some());
        assert!(registry.find("127.0.0.1", 19003).is_none());
        registry.stop();
    }

    #[test]
    fn test_notifications_flow_while_peer_connects() {
        let registry = Arc::new(PeerRegistry::new(defaults()));
        registry.add_peer(&peer(19004, false)).unwrap();

        let slow_peer = peer(19005, false);
        let slow = OscBroadcaster::with_parts(
            registry.peer_config(&slow_peer),
            Arc::new(SlowConnector(Duration::from_millis(1500))),
            default_clock(),
        );
        let registering = {
            let registry = Arc::clone(&registry);
            std::thread::spawn(move || registry.register(&slow_peer, slow).map(|_| ()))
        };
        std::thread::sleep(Duration::from_millis(100));

        let rack = Rack::new("rack-1", "127.0.0.1", 6000);
        let module = Module::new("m1", "Osc", "mec.osc");
        let param = Parameter::new("freq", "Freq", "float", ParamValue::Float(440.0));
        let started = Instant::now();
        registry.changed(&ChangeSource::local(), &rack, &module, &param);
        assert!(
            started.elapsed() < Duration::from_millis(100),
            "notification took {:?}",
            started.elapsed()
        );

        registering.join().unwrap().unwrap();
        assert_eq!(registry.len(), 2);
        registry.stop();
    }

    #[test]
    fn test_duplicate_detected_after_connect_stops_broadcaster() {
        let registry = Arc::new(PeerRegistry::new(defaults()));
        let dup = peer(19006, false);
        let slow = OscBroadcaster::with_parts(
            registry.peer_config(&dup),
            Arc::new(SlowConnector(Duration::from_millis(300))),
            default_clock(),
        );
        let registering = {
            let registry = Arc::clone(&registry);
            let dup = dup.clone();
            std::thread::spawn(move || registry.register(&dup, slow))
        };
        std::thread::sleep(Duration::from_millis(50));
        registry.add_peer(&dup).unwrap();

        assert!(matches!(
            registering.join().unwrap(),
            Err(RegistryError::Duplicate { port: 19006, .. })
        ));
        assert_eq!(registry.len(), 1);
        registry.stop();
    }

    #[test]
    fn test_poll_removes_peer_with_stopped_writer() {
        let registry = PeerRegistry::new(defaults());
        let stopped = registry.add_peer(&peer(19007, false)).unwrap();
        registry.add_peer(&peer(19008, false)).unwrap();

        stopped.stop();
        assert_eq!(stopped.writer_state(), WriterState::Terminated);
        assert_eq!(registry.poll(), 1);
        assert_eq!(registry.len(), 1);
        assert!(registry.find("127.0.0.1", 19007).is_none());
        registry.stop();
    }

    #[test]
    fn test_defaults_from_config() {
        let config = DaemonConfig {
            keep_alive_ms: 750,
            writer_wake_ms: 0,
            ..DaemonConfig::default()
        };
        let d = PeerDefaults::from(&config);
        assert_eq!(d.keep_alive, Duration::from_millis(750));
        assert_eq!(d.writer.wake_interval, Duration::from_millis(1));
    }
}
