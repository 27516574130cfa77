//! Outbound queue and the writer thread that drains it
//!
//! ```text
//! [notification threads] --Sender<Frame>--> [kontrol-osc-writer] --> TransmitChannel --> UDP
//! ```
//!
//! Producers push onto an unbounded `crossbeam_channel`, which never blocks.
//! The writer is the only thread doing network I/O. It wakes at least every
//! `wake_interval` to check the stop flag; once stopped it keeps sending
//! whatever is still queued for at most `drain_timeout`, then exits.

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};
use std::time::{Duration, Instant};

use crate::frame::Frame;
use crate::transport::TransmitChannel;

const WRITER_THREAD_NAME: &str = "kontrol-osc-writer";

pub fn outbound_queue() -> (Sender<Frame>, Receiver<Frame>) {
    crossbeam_channel::unbounded()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriterConfig {
    /// Longest the writer sleeps before re-checking the stop flag
    pub wake_interval: Duration,
    /// Budget for flushing queued frames after stop
    pub drain_timeout: Duration,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            wake_interval: Duration::from_millis(100),
            drain_timeout: Duration::from_millis(500),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WriterState {
    Idle = 0,
    Running = 1,
    Draining = 2,
    Terminated = 3,
}

impl WriterState {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => WriterState::Running,
            2 => WriterState::Draining,
            3 => WriterState::Terminated,
            _ => WriterState::Idle,
        }
    }
}

/// Send counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriterStats {
    pub sent: u64,
    pub failed: u64,
}

#[derive(Default)]
struct Shared {
    stop: AtomicBool,
    state: AtomicU8,
    sent: AtomicU64,
    failed: AtomicU64,
}

impl Shared {
    fn set_state(&self, state: WriterState) {
        self.state.store(state as u8, Ordering::Release);
    }
}

/// Handle to the background writer thread
pub struct WriterTask {
    shared: Arc<Shared>,
    handle: Mutex<Option<JoinHandle<()>>>,
    thread_id: Option<ThreadId>,
}

impl WriterTask {
    pub fn spawn(
        queue: Receiver<Frame>,
        channel: TransmitChannel,
        config: WriterConfig,
    ) -> std::io::Result<Self> {
        let shared = Arc::new(Shared::default());
        shared.set_state(WriterState::Running);

        let worker = Arc::clone(&shared);
        let handle = thread::Builder::new()
            .name(WRITER_THREAD_NAME.to_string())
            .spawn(move || run(queue, channel, config, &worker))?;

        Ok(Self {
            thread_id: Some(handle.thread().id()),
            shared,
            handle: Mutex::new(Some(handle)),
        })
    }

    pub fn state(&self) -> WriterState {
        WriterState::from_u8(self.shared.state.load(Ordering::Acquire))
    }

    pub fn stats(&self) -> WriterStats {
        WriterStats {
            sent: self.shared.sent.load(Ordering::Relaxed),
            failed: self.shared.failed.load(Ordering::Relaxed),
        }
    }

    /// Ask the writer to drain and exit, then wait for it.
    ///
    /// Concurrent callers all return after the thread has been joined. Called
    /// from the writer thread itself it only raises the flag.
    pub fn shutdown(&self) {
        self.shared.stop.store(true, Ordering::Release);

        if self.thread_id == Some(thread::current().id()) {
            return;
        }

        let mut handle = self.handle.lock();
        if let Some(handle) = handle.take() {
            if handle.join().is_err() {
                tracing::error!("OSC writer thread panicked");
                self.shared.set_state(WriterState::Terminated);
            }
        }
    }
}

fn transmit(channel: &TransmitChannel, frame: &Frame, shared: &Shared) {
    match channel.send(frame.as_bytes()) {
        Ok(()) => {
            shared.sent.fetch_add(1, Ordering::Relaxed);
        }
        Err(e) => {
            shared.failed.fetch_add(1, Ordering::Relaxed);
            tracing::warn!("Failed to send OSC frame ({} bytes): {}", frame.len(), e);
        }
    }
}

fn run(queue: Receiver<Frame>, channel: TransmitChannel, config: WriterConfig, shared: &Shared) {
    tracing::debug!("OSC writer started");

    while !shared.stop.load(Ordering::Acquire) {
        match queue.recv_timeout(config.wake_interval) {
            Ok(frame) => transmit(&channel, &frame, shared),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    shared.set_state(WriterState::Draining);
    let deadline = Instant::now() + config.drain_timeout;
    let mut drained = 0usize;
    while Instant::now() < deadline {
        match queue.try_recv() {
            Ok(frame) => {
                transmit(&channel, &frame, shared);
                drained += 1;
            }
            Err(_) => break,
        }
    }
    let dropped = queue.len();
    if dropped > 0 {
        tracing::warn!("OSC writer drain budget exhausted, dropping {} frames", dropped);
    }

    shared.set_state(WriterState::Terminated);
    tracing::debug!("OSC writer stopped (drained {} frames)", drained);
}
