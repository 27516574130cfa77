use crossbeam_channel::{Receiver, Sender};
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use kontrol_model::{ChangeSource, KontrolCallback, Notification, Rack};

use crate::clock::{default_clock, Clock};
use crate::encode::{encode, encode_ping, encode_publish};
use crate::error::{BroadcasterError, EncodeError, Result};
use crate::frame::{Frame, FrameBatch};
use crate::transport::{Connector, Destination, TransmitChannel, UdpConnector};
use crate::writer::{outbound_queue, WriterConfig, WriterState, WriterStats, WriterTask};

/// Port announced in pings when none is configured
pub const DEFAULT_ANNOUNCE_PORT: u16 = 6000;

/// A peer counts as alive for this many keep-alive intervals after its last ping
pub const DEFAULT_LIVENESS_FACTOR: u32 = 2;

const STATE_CONSTRUCTED: u8 = 0;
const STATE_RUNNING: u8 = 1;
const STATE_STOPPED: u8 = 2;

/// Per-broadcaster settings
#[derive(Debug, Clone)]
pub struct BroadcasterConfig {
    /// Origin tag of the peer this broadcaster talks to; changes from it are not echoed back
    pub source: ChangeSource,
    /// Keep-alive interval announced in our pings
    pub keep_alive: Duration,
    /// Whether this broadcaster emits periodic pings
    pub master: bool,
    /// Port announced in periodic pings
    pub announce_port: u16,
    pub liveness_factor: u32,
    pub writer: WriterConfig,
}

impl BroadcasterConfig {
    pub fn new(source: ChangeSource, keep_alive: Duration, master: bool) -> Self {
        Self {
            source,
            keep_alive,
            master,
            announce_port: DEFAULT_ANNOUNCE_PORT,
            liveness_factor: DEFAULT_LIVENESS_FACTOR,
            writer: WriterConfig::default(),
        }
    }

    pub fn with_announce_port(mut self, port: u16) -> Self {
        self.announce_port = port;
        self
    }

    pub fn with_liveness_factor(mut self, factor: u32) -> Self {
        self.liveness_factor = factor.max(1);
        self
    }

    pub fn with_writer(mut self, writer: WriterConfig) -> Self {
        self.writer = writer;
        self
    }
}

#[derive(Debug)]
struct Liveness {
    last_ping: Duration,
    /// Peer's keep-alive, used for the liveness threshold
    keep_alive: Duration,
    announced: bool,
}

struct Lifecycle {
    receiver: Option<Receiver<Frame>>,
    writer: Option<Arc<WriterTask>>,
}

/// Streams control-surface changes to one OSC peer.
///
/// Notification methods (from [`KontrolCallback`]) only encode and enqueue, so
/// they are safe to call from real-time threads. A dedicated writer thread,
/// started by the first successful [`connect`](OscBroadcaster::connect),
/// does all socket I/O.
pub struct OscBroadcaster {
    config: BroadcasterConfig,
    connector: Arc<dyn Connector>,
    clock: Arc<dyn Clock>,
    destination: RwLock<Option<Destination>>,
    channel: TransmitChannel,
    queue: Sender<Frame>,
    lifecycle: Mutex<Lifecycle>,
    state: AtomicU8,
    liveness: Mutex<Liveness>,
}

impl OscBroadcaster {
    /// Broadcaster sending over UDP with the build's default clock
    pub fn new(config: BroadcasterConfig) -> Self {
        Self::with_parts(config, Arc::new(UdpConnector), default_clock())
    }

    pub fn with_parts(
        config: BroadcasterConfig,
        connector: Arc<dyn Connector>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (queue, receiver) = outbound_queue();
        let liveness = Liveness {
            last_ping: clock.now(),
            keep_alive: config.keep_alive,
            announced: false,
        };

        Self {
            config,
            connector,
            clock,
            destination: RwLock::new(None),
            channel: TransmitChannel::new(),
            queue,
            lifecycle: Mutex::new(Lifecycle {
                receiver: Some(receiver),
                writer: None,
            }),
            state: AtomicU8::new(STATE_CONSTRUCTED),
            liveness: Mutex::new(liveness),
        }
    }

    /// Bind to `host:port`, starting the writer on first success.
    ///
    /// Returns false if the socket cannot be created or the broadcaster was
    /// stopped. Reconnecting keeps frames that are already queued.
    pub fn connect(&self, host: &str, port: u16) -> bool {
        match self.try_connect(host, port) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("OSC broadcaster failed to connect to {}:{}: {}", host, port, e);
                false
            }
        }
    }

    pub fn try_connect(&self, host: &str, port: u16) -> Result<()> {
        let mut lifecycle = self.lifecycle.lock();
        if self.state.load(Ordering::Acquire) == STATE_STOPPED {
            return Err(BroadcasterError::Stopped);
        }

        let dest = Destination::new(host, port);
        let transport = self.connector.open(&dest)?;
        self.channel.replace(transport);
        *self.destination.write() = Some(dest.clone());

        if lifecycle.writer.is_none() {
            let receiver = lifecycle.receiver.take().ok_or_else(|| {
                std::io::Error::new(std::io::ErrorKind::Other, "outbound queue consumer lost")
            })?;
            let writer = WriterTask::spawn(receiver, self.channel.clone(), self.config.writer)?;
            lifecycle.writer = Some(Arc::new(writer));
            self.state.store(STATE_RUNNING, Ordering::Release);
            tracing::info!("OSC broadcaster connected to {} (source {})", dest, self.config.source);
        } else {
            tracing::info!("OSC broadcaster reconnected to {}", dest);
        }
        Ok(())
    }

    /// Announce ourselves: `port` is where the peer should send back to
    pub fn send_ping(&self, port: u16) {
        let keep_alive_ms = duration_ms(self.config.keep_alive);
        match encode_ping(port, keep_alive_ms) {
            Ok(frame) => self.enqueue(FrameBatch::single(frame)),
            Err(e) => tracing::error!("Failed to encode ping: {}", e),
        }
    }

    /// Periodic tick. A master pings when its keep-alive interval has passed.
    pub fn write_poll(&self) {
        if !self.config.master || self.is_stopped() {
            return;
        }

        let now = self.clock.now();
        let due = {
            let mut liveness = self.liveness.lock();
            let elapsed = now.saturating_sub(liveness.last_ping);
            let due = !liveness.announced
                || (!self.config.keep_alive.is_zero() && elapsed >= self.config.keep_alive);
            if due {
                liveness.last_ping = now;
                liveness.announced = true;
            }
            due
        };

        if due {
            tracing::trace!("Sending keep-alive ping to {:?}", self.destination());
            self.send_ping(self.config.announce_port);
        }
    }

    /// True while the peer has pinged within the liveness threshold
    pub fn is_active(&self) -> bool {
        let liveness = self.liveness.lock();
        if liveness.keep_alive.is_zero() {
            return true;
        }
        let threshold = liveness
            .keep_alive
            .checked_mul(self.config.liveness_factor)
            .unwrap_or(Duration::MAX);
        self.clock.now().saturating_sub(liveness.last_ping) < threshold
    }

    pub fn is_this_host(&self, host: &str, port: u16) -> bool {
        self.destination
            .read()
            .as_ref()
            .is_some_and(|dest| dest.matches(host, port))
    }

    pub fn destination(&self) -> Option<Destination> {
        self.destination.read().clone()
    }

    /// Connected host, empty before the first connect
    pub fn host(&self) -> String {
        self.destination
            .read()
            .as_ref()
            .map(|d| d.host.clone())
            .unwrap_or_default()
    }

    /// Connected port, zero before the first connect
    pub fn port(&self) -> u16 {
        self.destination.read().as_ref().map_or(0, |d| d.port)
    }

    pub fn source(&self) -> &ChangeSource {
        &self.config.source
    }

    pub fn is_master(&self) -> bool {
        self.config.master
    }

    pub fn is_running(&self) -> bool {
        self.state.load(Ordering::Acquire) == STATE_RUNNING
    }

    pub fn is_stopped(&self) -> bool {
        self.state.load(Ordering::Acquire) == STATE_STOPPED
    }

    /// Writer thread state, `Idle` until the first successful connect
    pub fn writer_state(&self) -> WriterState {
        self.lifecycle
            .lock()
            .writer
            .as_ref()
            .map_or(WriterState::Idle, |w| w.state())
    }

    pub fn stats(&self) -> WriterStats {
        self.lifecycle
            .lock()
            .writer
            .as_ref()
            .map(|w| w.stats())
            .unwrap_or_default()
    }

    /// Publish several racks as one batch (see [`encode_publish`])
    pub fn publish(&self, src: &ChangeSource, racks: &[Rack]) {
        if !self.should_broadcast(src) {
            return;
        }
        self.submit("publish", encode_publish(racks));
    }

    /// Changes originating from our own peer are not sent back to it
    fn broadcast_change(&self, src: &ChangeSource) -> bool {
        src != &self.config.source
    }

    fn should_broadcast(&self, src: &ChangeSource) -> bool {
        if self.is_stopped() {
            tracing::trace!("Broadcaster stopped, dropping change from {}", src);
            return false;
        }
        if !self.broadcast_change(src) {
            tracing::trace!("Not echoing change back to its origin {}", src);
            return false;
        }
        true
    }

    fn submit(&self, kind: &str, encoded: std::result::Result<FrameBatch, EncodeError>) {
        match encoded {
            Ok(batch) => self.enqueue(batch),
            Err(e) => tracing::error!("Dropping {} message: {}", kind, e),
        }
    }

    fn enqueue(&self, batch: FrameBatch) {
        for frame in batch {
            if self.queue.send(frame).is_err() {
                tracing::trace!("Outbound queue closed, dropping frame");
                return;
            }
        }
    }

    fn record_ping(&self, host: &str, port: u16, keep_alive_ms: u32) {
        if !self.is_this_host(host, port) {
            return;
        }
        let mut liveness = self.liveness.lock();
        liveness.last_ping = self.clock.now();
        if keep_alive_ms > 0 {
            liveness.keep_alive = Duration::from_millis(u64::from(keep_alive_ms));
        }
    }
}

impl KontrolCallback for OscBroadcaster {
    fn notify(&self, src: &ChangeSource, event: &Notification<'_>) {
        if let Notification::Ping { host, port, keep_alive_ms } = *event {
            self.record_ping(host, port, keep_alive_ms);
            return;
        }
        if !self.should_broadcast(src) {
            return;
        }
        self.submit(event.kind(), encode(event));
    }

    /// Drain and stop the writer, release the socket. Idempotent.
    fn stop(&self) {
        let writer = {
            let mut lifecycle = self.lifecycle.lock();
            let previous = self.state.swap(STATE_STOPPED, Ordering::AcqRel);
            if previous != STATE_STOPPED {
                tracing::info!("Stopping OSC broadcaster for {:?}", self.destination());
            }
            lifecycle.receiver.take();
            lifecycle.writer.clone()
        };

        if let Some(writer) = writer {
            writer.shutdown();
        }
        self.channel.release();
    }
}

impl Drop for OscBroadcaster {
    fn drop(&mut self) {
        KontrolCallback::stop(self);
    }
}

fn duration_ms(d: Duration) -> u32 {
    u32::try_from(d.as_millis()).unwrap_or(u32::MAX)
}
