//! Per-path debouncing decision
//!
//! Decides whether a raw event is forwarded or suppressed as a duplicate of
//! a recent event for the same path.

use quietwatch_core::config::validate_interval;
use quietwatch_core::{Clock, ConfigError, Ledger};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::trace;

/// Interval-based duplicate filter over a [`Ledger`]
pub struct DebounceFilter {
    ledger: Ledger,
    /// Suppression interval in nanoseconds
    interval_nanos: AtomicU64,
    enabled: AtomicBool,
    clock: Arc<dyn Clock>,
}

impl DebounceFilter {
    pub fn new(interval: Duration, clock: Arc<dyn Clock>) -> Result<Self, ConfigError> {
        Ok(Self {
            ledger: Ledger::new(),
            interval_nanos: AtomicU64::new(interval_to_nanos(interval)?),
            enabled: AtomicBool::new(true),
            clock,
        })
    }

    /// Should an event keyed on `key` reach subscribers?
    ///
    /// `now` is sampled here, once per call. When filtering is disabled the
    /// ledger is not touched.
    pub fn should_forward(&self, key: &Path) -> bool {
        if !self.is_enabled() {
            return true;
        }

        let now = self.clock.now();
        let forward = !self.ledger.record_and_check(key, now, self.interval());
        trace!("debounce {} -> {}", key.display(), if forward { "forward" } else { "suppress" });
        forward
    }

    pub fn interval(&self) -> Duration {
        Duration::from_nanos(self.interval_nanos.load(Ordering::Acquire))
    }

    /// Change the interval for subsequent decisions
    pub fn set_interval(&self, interval: Duration) -> Result<(), ConfigError> {
        let nanos = interval_to_nanos(interval)?;
        self.interval_nanos.store(nanos, Ordering::Release);
        Ok(())
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Drop ledger entries idle for at least `max_idle`
    pub fn prune(&self, max_idle: Duration) -> usize {
        self.ledger.prune_idle(self.clock.now(), max_idle)
    }
}

fn interval_to_nanos(interval: Duration) -> Result<u64, ConfigError> {
    validate_interval(interval)?;
    u64::try_from(interval.as_nanos()).map_err(|_| ConfigError::IntervalOutOfRange {
        value_ms: interval.as_millis(),
        max_ms: quietwatch_core::config::MAX_INTERVAL_MS,
    })
}
