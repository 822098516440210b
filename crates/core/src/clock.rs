//! Time sources for suppression decisions

use parking_lot::Mutex;
use std::fmt;
use std::time::{Duration, Instant};

/// Source of "now" for the decision engine
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Monotonic wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to
///
/// Used by tests and replay tools to drive interval behavior
/// deterministically.
pub struct ManualClock {
    origin: Instant,
    elapsed: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            elapsed: Mutex::new(Duration::ZERO),
        }
    }

    /// Instant the clock started at
    pub fn origin(&self) -> Instant {
        self.origin
    }

    /// Move the clock forward by `by`
    pub fn advance(&self, by: Duration) {
        *self.elapsed.lock() += by;
    }

    /// Set the time elapsed since the origin
    pub fn set_elapsed(&self, since_origin: Duration) {
        *self.elapsed.lock() = since_origin;
    }

    /// Convenience for `set_elapsed(Duration::from_millis(ms))`
    pub fn set_millis(&self, ms: u64) {
        self.set_elapsed(Duration::from_millis(ms));
    }

    pub fn elapsed(&self) -> Duration {
        *self.elapsed.lock()
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + *self.elapsed.lock()
    }
}

impl fmt::Debug for ManualClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualClock")
            .field("elapsed", &self.elapsed())
            .finish()
    }
}
