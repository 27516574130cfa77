use kontrol_broadcaster::encode::{encode_ping, ADDR_CHANGED};
use kontrol_broadcaster::{OscMessage, WriterConfig};
use kontrol_daemon::{listener, PeerConfig, PeerDefaults, PeerRegistry};
use kontrol_model::{ChangeSource, KontrolCallback, Module, ParamValue, Parameter, Rack};
use std::net::UdpSocket;
use std::sync::Arc;
use std::time::Duration;

fn defaults(keep_alive_ms: u64) -> PeerDefaults {
    PeerDefaults {
        keep_alive: Duration::from_millis(keep_alive_ms),
        announce_port: 6000,
        liveness_factor: 2,
        writer: WriterConfig {
            wake_interval: Duration::from_millis(5),
            drain_timeout: Duration::from_millis(200),
        },
    }
}

fn receiver() -> (UdpSocket, PeerConfig) {
    let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
    socket.set_read_timeout(Some(Duration::from_millis(500))).unwrap();
    let port = socket.local_addr().unwrap().port();
    let peer = PeerConfig {
        host: "127.0.0.1".to_string(),
        port,
        master: false,
    };
    (socket, peer)
}

fn recv_message(socket: &UdpSocket) -> Option<OscMessage> {
    let mut buf = [0u8; 1024];
    let n = socket.recv(&mut buf).ok()?;
    Some(OscMessage::decode(&buf[..n]).unwrap())
}

#[test]
fn test_fan_out_skips_originating_peer() {
    let (sock_a, peer_a) = receiver();
    let (sock_b, peer_b) = receiver();

    let registry = PeerRegistry::new(defaults(5000));
    registry.add_peer(&peer_a).unwrap();
    registry.add_peer(&peer_b).unwrap();

    let rack = Rack::new("rack-1", "127.0.0.1", 6000);
    let module = Module::new("m1", "Osc", "mec.osc");
    let param = Parameter::new("freq", "Freq", "float", ParamValue::Float(440.0));

    let from_a = ChangeSource::peer(&peer_a.host, peer_a.port);
    registry.changed(&from_a, &rack, &module, &param);

    let msg = recv_message(&sock_b).expect("peer B should receive the change");
    assert_eq!(msg.address, ADDR_CHANGED);
    assert_eq!(msg.args[3].as_float(), Some(440.0));
    assert!(recv_message(&sock_a).is_none(), "change echoed back to peer A");

    registry.stop();
}

#[test]
fn test_silent_peer_is_pruned() {
    let (_sock, peer) = receiver();
    let registry = PeerRegistry::new(defaults(50));
    registry.add_peer(&peer).unwrap();

    assert_eq!(registry.poll(), 0);
    std::thread::sleep(Duration::from_millis(150));
    assert_eq!(registry.poll(), 1);
    assert!(registry.is_empty());
}

#[test]
fn test_ping_keeps_peer_alive() {
    let (_sock, peer) = receiver();
    let registry = PeerRegistry::new(defaults(100));
    registry.add_peer(&peer).unwrap();

    for _ in 0..5 {
        std::thread::sleep(Duration::from_millis(60));
        registry.ping(&ChangeSource::peer(&peer.host, peer.port), &peer.host, peer.port, 100);
        assert_eq!(registry.poll(), 0);
    }
    assert_eq!(registry.len(), 1);
    registry.stop();
}

#[tokio::test]
async fn test_listener_routes_pings_to_registry() {
    let (_sock, peer) = receiver();
    let registry = Arc::new(PeerRegistry::new(defaults(100)));
    registry.add_peer(&peer).unwrap();

    let socket = tokio::net::UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let listen_addr = socket.local_addr().unwrap();
    let task = tokio::spawn(listener::run(socket, Arc::clone(&registry)));

    // Announce ourselves on the peer's own port so the source address matches
    let sender = UdpSocket::bind(("127.0.0.1", 0)).unwrap();
    let ping = encode_ping(peer.port, 100).unwrap();

    for _ in 0..5 {
        tokio::time::sleep(Duration::from_millis(60)).await;
        sender.send_to(ping.as_bytes(), listen_addr).unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(registry.poll(), 0);
    }

    task.abort();
    registry.stop();
}
