use std::time::{Duration, Instant};

/// Monotonic time source used to time the averaging window.
pub trait Clock {
    /// Time elapsed since an arbitrary but fixed epoch.
    fn now(&self) -> Duration;
}

#[derive(Debug, Copy, Clone)]
pub struct MonotonicClock {
    epoch: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self { epoch: Instant::now() }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    #[inline]
    fn now(&self) -> Duration {
        self.epoch.elapsed()
    }
}
