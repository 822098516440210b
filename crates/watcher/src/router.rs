//! Event routing
//!
//! Takes one raw event at a time from the source thread, asks the debounce
//! filter about it, and on "forward" runs every handler registered for its
//! kind in registration order, synchronously, on the calling thread.

use crate::debounce::DebounceFilter;
use crate::error::{DispatchError, HandlerFailure, WatchError};
use crate::registry::SubscriberRegistry;
use crate::source::RawEventHandler;
use parking_lot::{RwLock, RwLockReadGuard};
use quietwatch_core::RawEvent;
use std::any::Any;
use std::cell::RefCell;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tracing::{debug, warn};

/// Outcome of routing one raw event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Forwarded; the number of handlers that ran
    Forwarded(usize),
    /// Dropped as a duplicate of a recent event for the same path
    Suppressed,
    /// Not evaluated: raising is disabled or the watcher is disposed
    Skipped,
}

/// Counters since the watcher was built
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub received: u64,
    pub forwarded: u64,
    pub suppressed: u64,
    pub skipped: u64,
    pub handler_failures: u64,
}

#[derive(Debug, Default)]
struct Counters {
    received: AtomicU64,
    forwarded: AtomicU64,
    suppressed: AtomicU64,
    skipped: AtomicU64,
    handler_failures: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64, by: u64) {
        counter.fetch_add(by, Ordering::Relaxed);
    }

    fn snapshot(&self) -> DispatchStats {
        DispatchStats {
            received: self.received.load(Ordering::Relaxed),
            forwarded: self.forwarded.load(Ordering::Relaxed),
            suppressed: self.suppressed.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            handler_failures: self.handler_failures.load(Ordering::Relaxed),
        }
    }
}

static NEXT_GATE_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    /// Gates this thread is currently dispatching through
    static ACTIVE_GATES: RefCell<Vec<u64>> = const { RefCell::new(Vec::new()) };
}

/// Closes once on disposal and lets disposal wait for in-flight dispatch
///
/// Dispatch holds a shared guard for its whole round; closing takes the
/// exclusive side, which blocks until rounds on other threads finish.
struct DispatchGate {
    id: u64,
    closed: AtomicBool,
    in_flight: RwLock<()>,
}

struct GatePass<'a> {
    id: u64,
    _guard: RwLockReadGuard<'a, ()>,
}

impl Drop for GatePass<'_> {
    fn drop(&mut self) {
        ACTIVE_GATES.with(|active| {
            let mut active = active.borrow_mut();
            if let Some(index) = active.iter().rposition(|id| *id == self.id) {
                active.remove(index);
            }
        });
    }
}

impl DispatchGate {
    fn new() -> Self {
        Self {
            id: NEXT_GATE_ID.fetch_add(1, Ordering::Relaxed),
            closed: AtomicBool::new(false),
            in_flight: RwLock::new(()),
        }
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn enter(&self) -> Option<GatePass<'_>> {
        // Recursive so a handler that injects another event cannot deadlock
        // behind a waiting closer
        let guard = self.in_flight.read_recursive();
        if self.is_closed() {
            return None;
        }
        ACTIVE_GATES.with(|active| active.borrow_mut().push(self.id));
        Some(GatePass {
            id: self.id,
            _guard: guard,
        })
    }

    /// Close the gate; false if it was already closed
    fn close(&self) -> bool {
        !self.closed.swap(true, Ordering::AcqRel)
    }

    /// Wait for rounds on other threads to finish
    ///
    /// A round running on this thread (disposal from inside a handler)
    /// cannot be waited for; it stops at its next handler instead.
    fn drain(&self) {
        let dispatching_here = ACTIVE_GATES.with(|active| active.borrow().contains(&self.id));
        if !dispatching_here {
            drop(self.in_flight.write());
        }
    }
}

/// Filters raw events and fans them out to subscribers
pub struct Router {
    filter: DebounceFilter,
    registry: SubscriberRegistry,
    raising_enabled: AtomicBool,
    gate: DispatchGate,
    counters: Counters,
}

impl Router {
    pub fn new(filter: DebounceFilter, raising_enabled: bool) -> Self {
        Self {
            filter,
            registry: SubscriberRegistry::new(),
            raising_enabled: AtomicBool::new(raising_enabled),
            gate: DispatchGate::new(),
            counters: Counters::default(),
        }
    }

    pub fn filter(&self) -> &DebounceFilter {
        &self.filter
    }

    pub fn registry(&self) -> &SubscriberRegistry {
        &self.registry
    }

    pub fn raising_enabled(&self) -> bool {
        self.raising_enabled.load(Ordering::Acquire)
    }

    pub fn set_raising_enabled(&self, enabled: bool) {
        self.raising_enabled.store(enabled, Ordering::Release);
    }

    pub fn stats(&self) -> DispatchStats {
        self.counters.snapshot()
    }

    pub fn is_disposed(&self) -> bool {
        self.gate.is_closed()
    }

    /// Stop routing new rounds; returns false if already closed
    ///
    /// Rounds already in flight stop before their next handler.
    pub(crate) fn close(&self) -> bool {
        self.gate.close()
    }

    /// Wait until no round is running on another thread
    pub(crate) fn drain(&self) {
        self.gate.drain();
    }

    /// Drop every subscription, returning how many were released
    pub(crate) fn release(&self) -> usize {
        let released = self.registry.clear();
        debug!("router released {} subscription(s)", released);
        released
    }

    /// Decide on one raw event and, if forwarded, run its handlers
    pub fn route(&self, event: &RawEvent) -> Result<Dispatch, DispatchError> {
        if !self.raising_enabled() {
            Counters::bump(&self.counters.skipped, 1);
            return Ok(Dispatch::Skipped);
        }
        let Some(_pass) = self.gate.enter() else {
            Counters::bump(&self.counters.skipped, 1);
            return Ok(Dispatch::Skipped);
        };

        Counters::bump(&self.counters.received, 1);

        if !self.filter.should_forward(event.suppression_key()) {
            debug!("suppressed duplicate {}", event);
            Counters::bump(&self.counters.suppressed, 1);
            return Ok(Dispatch::Suppressed);
        }

        let handlers = self.registry.snapshot(event.kind());
        let mut invoked = 0;
        let mut failures = Vec::new();

        for (subscription, handler) in handlers.iter() {
            if self.gate.is_closed() {
                break;
            }
            invoked += 1;
            match panic::catch_unwind(AssertUnwindSafe(|| handler(event))) {
                Ok(Ok(())) => {}
                Ok(Err(error)) => failures.push(HandlerFailure::Returned {
                    subscription: *subscription,
                    error,
                }),
                Err(payload) => failures.push(HandlerFailure::Panicked {
                    subscription: *subscription,
                    message: panic_message(payload.as_ref()),
                }),
            }
        }

        Counters::bump(&self.counters.forwarded, 1);
        debug!("forwarded {} to {} handler(s)", event, invoked);

        if failures.is_empty() {
            return Ok(Dispatch::Forwarded(invoked));
        }

        Counters::bump(&self.counters.handler_failures, failures.len() as u64);
        Err(DispatchError {
            event: event.clone(),
            invoked,
            failures,
        })
    }

    /// Hand an error to every error handler
    pub fn report(&self, error: &WatchError) {
        if self.is_disposed() {
            return;
        }
        let handlers = self.registry.error_snapshot();
        if handlers.is_empty() {
            return;
        }
        for (subscription, handler) in handlers.iter() {
            if panic::catch_unwind(AssertUnwindSafe(|| handler(error))).is_err() {
                warn!("{} panicked while handling: {}", subscription, error);
            }
        }
    }

    fn deliver(&self, event: RawEvent) {
        if let Err(error) = self.route(&event) {
            for failure in &error.failures {
                warn!("{} handler failed: {}", event.kind(), failure);
            }
            self.report(&WatchError::Dispatch(error));
        }
    }
}

impl RawEventHandler for Router {
    fn on_created(&self, path: &Path) {
        self.deliver(RawEvent::created(path));
    }

    fn on_changed(&self, path: &Path) {
        self.deliver(RawEvent::changed(path));
    }

    fn on_deleted(&self, path: &Path) {
        self.deliver(RawEvent::deleted(path));
    }

    fn on_renamed(&self, path: &Path, old_path: &Path) {
        self.deliver(RawEvent::renamed(path, old_path));
    }

    fn on_error(&self, error: WatchError) {
        warn!("notification source error: {}", error);
        self.report(&error);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
