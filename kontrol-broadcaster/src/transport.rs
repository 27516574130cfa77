//! Destination-bound UDP transmit channel

use parking_lot::RwLock;
use std::fmt;
use std::io;
use std::net::UdpSocket;
use std::sync::Arc;

/// Peer address a broadcaster sends to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Destination {
    pub host: String,
    pub port: u16,
}

impl Destination {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    pub fn matches(&self, host: &str, port: u16) -> bool {
        self.host == host && self.port == port
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Fire-and-forget datagram sink
pub trait Transport: Send + Sync {
    fn send(&self, bytes: &[u8]) -> io::Result<()>;
}

/// Creates transports for a destination
pub trait Connector: Send + Sync {
    fn open(&self, dest: &Destination) -> io::Result<Arc<dyn Transport>>;
}

/// UDP socket connected to a single destination
pub struct UdpTransport {
    socket: UdpSocket,
}

impl UdpTransport {
    pub fn connect(dest: &Destination) -> io::Result<Self> {
        let socket = UdpSocket::bind(("0.0.0.0", 0))?;
        socket.connect((dest.host.as_str(), dest.port))?;
        Ok(Self { socket })
    }
}

impl Transport for UdpTransport {
    fn send(&self, bytes: &[u8]) -> io::Result<()> {
        let sent = self.socket.send(bytes)?;
        if sent != bytes.len() {
            return Err(io::Error::new(
                io::ErrorKind::WriteZero,
                format!("short datagram: {} of {} bytes", sent, bytes.len()),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct UdpConnector;

impl Connector for UdpConnector {
    fn open(&self, dest: &Destination) -> io::Result<Arc<dyn Transport>> {
        Ok(Arc::new(UdpTransport::connect(dest)?))
    }
}

/// Currently bound transport, shared between the owner and the writer thread.
///
/// Each [`send`](TransmitChannel::send) grabs the transport once, so a frame
/// goes out entirely over the old or entirely over the new socket when
/// [`replace`](TransmitChannel::replace) races with it.
#[derive(Clone, Default)]
pub struct TransmitChannel {
    current: Arc<RwLock<Option<Arc<dyn Transport>>>>,
}

impl TransmitChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replace(&self, transport: Arc<dyn Transport>) {
        *self.current.write() = Some(transport);
    }

    pub fn release(&self) {
        self.current.write().take();
    }

    pub fn send(&self, bytes: &[u8]) -> io::Result<()> {
        let transport = self.current.read().clone();
        match transport {
            Some(t) => t.send(bytes),
            None => Err(io::Error::new(
                io::ErrorKind::NotConnected,
                "transmit channel released",
            )),
        }
    }
}
