//! Millisecond clock used to bound the response wait.

use std::time::{Duration, Instant};

/// Monotonic millisecond time source.
pub trait Clock {
    /// Milliseconds since an arbitrary, fixed origin.
    fn now_millis(&self) -> u64;

    /// Called between polls while waiting for a response. Hosted clocks
    /// yield the thread here; a device loop can feed its watchdog.
    fn idle(&self) {}
}

/// Wall-clock time from [`Instant`]; idles by sleeping one millisecond.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        u64::try_from(self.origin.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    fn idle(&self) {
        std::thread::sleep(Duration::from_millis(1));
    }
}
