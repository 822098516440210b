//! Per-path suppression ledger
//!
//! Maps each path ever seen to the instant of its most recent raw event.
//! The ledger only grows unless the owner calls [`Ledger::prune_idle`];
//! the number of entries is bounded by the files touched while watching.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Concurrency-safe path -> last-seen map
///
/// Updates for one path are serialized by the shard lock owning its
/// entry; unrelated paths only contend when they hash to the same shard.
#[derive(Debug, Default)]
pub struct Ledger {
    entries: DashMap<PathBuf, Instant>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an event for `path` at `now` and report whether it was recent
    ///
    /// First sighting inserts `now` and returns `false`. Otherwise the
    /// stored instant is refreshed whatever the outcome, so duplicates keep
    /// extending the window, and the result is `elapsed < interval`. Two
    /// events at the same instant always count as one, even with a zero
    /// interval.
    pub fn record_and_check(&self, path: &Path, now: Instant, interval: Duration) -> bool {
        // Fast path avoids allocating a key for paths already present
        if let Some(mut last_seen) = self.entries.get_mut(path) {
            return refresh(&mut last_seen, now, interval);
        }

        match self.entries.entry(path.to_path_buf()) {
            Entry::Occupied(mut occupied) => refresh(occupied.get_mut(), now, interval),
            Entry::Vacant(vacant) => {
                vacant.insert(now);
                false
            }
        }
    }

    /// Instant of the last event recorded for `path`
    pub fn last_seen(&self, path: &Path) -> Option<Instant> {
        self.entries.get(path).map(|entry| *entry)
    }

    /// Remove entries idle for at least `max_idle`, returning how many went
    pub fn prune_idle(&self, now: Instant, max_idle: Duration) -> usize {
        let mut removed = 0;
        self.entries.retain(|_, last_seen| {
            let keep = now.saturating_duration_since(*last_seen) < max_idle;
            if !keep {
                removed += 1;
            }
            keep
        });
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}

fn refresh(last_seen: &mut Instant, now: Instant, interval: Duration) -> bool {
    let elapsed = now.saturating_duration_since(*last_seen);
    // Samples taken on different threads can land out of order; never move back
    *last_seen = now.max(*last_seen);
    elapsed.is_zero() || elapsed < interval
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Barrier};

    const INTERVAL: Duration = Duration::from_millis(100);

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_first_sighting_is_not_recent() {
        let ledger = Ledger::new();
        let t0 = Instant::now();
        assert!(!ledger.record_and_check(Path::new("/w/a.txt"), t0, INTERVAL));
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.last_seen(Path::new("/w/a.txt")), Some(t0));
    }

    #[test]
    fn test_window_slides_on_suppressed_events() {
        let ledger = Ledger::new();
        let path = Path::new("/w/a.txt");
        let t0 = Instant::now();

        assert!(!ledger.record_and_check(path, t0, INTERVAL));
        assert!(ledger.record_and_check(path, t0 + ms(50), INTERVAL));
        assert!(ledger.record_and_check(path, t0 + ms(100), INTERVAL));
        // Measured from the refresh at t0+100, not from t0
        assert!(ledger.record_and_check(path, t0 + ms(101), INTERVAL));
        assert_eq!(ledger.last_seen(path), Some(t0 + ms(101)));
        assert!(!ledger.record_and_check(path, t0 + ms(201), INTERVAL));
    }

    #[test]
    fn test_zero_interval_only_merges_simultaneous_events() {
        let ledger = Ledger::new();
        let path = Path::new("/w/a.txt");
        let t0 = Instant::now();

        assert!(!ledger.record_and_check(path, t0, Duration::ZERO));
        assert!(ledger.record_and_check(path, t0, Duration::ZERO));
        assert!(!ledger.record_and_check(path, t0 + Duration::from_nanos(1), Duration::ZERO));
    }

    #[test]
    fn test_out_of_order_sample_does_not_rewind() {
        let ledger = Ledger::new();
        let path = Path::new("/w/a.txt");
        let t0 = Instant::now();

        ledger.record_and_check(path, t0 + ms(10), INTERVAL);
        assert!(ledger.record_and_check(path, t0, INTERVAL));
        assert_eq!(ledger.last_seen(path), Some(t0 + ms(10)));
    }

    #[test]
    fn test_paths_are_independent() {
        let ledger = Ledger::new();
        let t0 = Instant::now();
        for i in 0..10 {
            assert!(!ledger.record_and_check(Path::new(&format!("/w/{i}")), t0, INTERVAL));
        }
        assert_eq!(ledger.len(), 10);
    }

    #[test]
    fn test_prune_idle() {
        let ledger = Ledger::new();
        let t0 = Instant::now();
        ledger.record_and_check(Path::new("/w/old"), t0, INTERVAL);
        ledger.record_and_check(Path::new("/w/new"), t0 + ms(900), INTERVAL);

        assert_eq!(ledger.prune_idle(t0 + ms(1000), ms(500)), 1);
        assert_eq!(ledger.len(), 1);
        assert!(ledger.last_seen(Path::new("/w/old")).is_none());

        ledger.clear();
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_concurrent_first_sightings_insert_once() {
        let ledger = Arc::new(Ledger::new());
        let not_recent = Arc::new(AtomicUsize::new(0));
        let threads = 8;
        let barrier = Arc::new(Barrier::new(threads));
        let now = Instant::now();

        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let ledger = Arc::clone(&ledger);
                let not_recent = Arc::clone(&not_recent);
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    for _ in 0..100 {
                        if !ledger.record_and_check(Path::new("/w/hot"), now, INTERVAL) {
                            not_recent.fetch_add(1, Ordering::SeqCst);
                        }
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(not_recent.load(Ordering::SeqCst), 1);
        assert_eq!(ledger.len(), 1);
    }
}
