//! Inbound keep-alive listener
//!
//! Only `/Kontrol/ping` is understood here; it feeds liveness tracking in the
//! registry. Every other inbound message is ignored.

use kontrol_broadcaster::encode::ADDR_PING;
use kontrol_broadcaster::OscMessage;
use kontrol_model::{ChangeSource, KontrolCallback};
use std::sync::Arc;
use tokio::net::UdpSocket;
use tracing::{debug, trace};

use crate::registry::PeerRegistry;

const RECV_BUFFER_SIZE: usize = 1024;

/// Announced port and keep-alive (ms) of a ping message
pub fn parse_ping(msg: &OscMessage) -> Option<(u16, u32)> {
    if msg.address != ADDR_PING {
        return None;
    }
    let port = msg.args.first()?.as_int()?;
    let keep_alive = msg.args.get(1).and_then(|a| a.as_int()).unwrap_or(0);
    Some((u16::try_from(port).ok()?, u32::try_from(keep_alive).unwrap_or(0)))
}

pub async fn run(socket: UdpSocket, registry: Arc<PeerRegistry>) -> std::io::Result<()> {
    let mut buf = [0u8; RECV_BUFFER_SIZE];
    loop {
        let (n, from) = socket.recv_from(&mut buf).await?;
        let msg = match OscMessage::decode(&buf[..n]) {
            Ok(msg) => msg,
            Err(e) => {
                debug!("Ignoring malformed packet from {}: {}", from, e);
                continue;
            }
        };

        match parse_ping(&msg) {
            Some((port, keep_alive)) => {
                let host = from.ip().to_string();
                trace!("Ping from {}:{} (keep-alive {} ms)", host, port, keep_alive);
                registry.ping(&ChangeSource::peer(&host, port), &host, port, keep_alive);
            }
            None => trace!("Ignoring {} from {}", msg.address, from),
        }
    }
}
