//! Monotonic time source for keep-alive bookkeeping
//!
//! The broadcaster only ever asks for "now" as a [`Duration`] since an
//! arbitrary fixed epoch. Builds with the `rt-clock` feature read the kernel's
//! raw monotonic clock instead of [`std::time::Instant`].

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub trait Clock: Send + Sync {
    fn now(&self) -> Duration;
}

/// `std::time::Instant` based clock
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    epoch: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Duration {
        self.epoch.elapsed()
    }
}

/// `CLOCK_MONOTONIC_RAW` clock for real-time kernels
#[cfg(feature = "rt-clock")]
#[derive(Debug, Clone, Default)]
pub struct RtClock;

#[cfg(feature = "rt-clock")]
impl Clock for RtClock {
    fn now(&self) -> Duration {
        let mut ts = libc::timespec {
            tv_sec: 0,
            tv_nsec: 0,
        };
        // SAFETY: `ts` is a valid, writable timespec for the duration of the call.
        let rc = unsafe { libc::clock_gettime(libc::CLOCK_MONOTONIC_RAW, &mut ts) };
        if rc != 0 {
            return Duration::ZERO;
        }
        Duration::new(ts.tv_sec as u64, ts.tv_nsec as u32)
    }
}

/// Clock selected for this build
#[cfg(not(feature = "rt-clock"))]
pub fn default_clock() -> Arc<dyn Clock> {
    Arc::new(MonotonicClock::new())
}

/// Clock selected for this build
#[cfg(feature = "rt-clock")]
pub fn default_clock() -> Arc<dyn Clock> {
    Arc::new(RtClock)
}

/// Hand-driven clock for tests and simulations
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<Mutex<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock() += by;
    }

    pub fn set(&self, to: Duration) {
        *self.now.lock() = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        *self.now.lock()
    }
}
