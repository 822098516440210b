//! Duplicate-suppressing file watching for Quietwatch
//!
//! This crate wraps a raw notification source with:
//! - Per-path, interval-based duplicate suppression
//! - Independent subscriber lists for created/changed/deleted/renamed
//! - Isolation of failing handlers
//! - One-way disposal that releases every handler and the source
//!
//! ```no_run
//! use quietwatch_watcher::{FilteredWatcher, WatchOptions};
//!
//! # fn main() -> Result<(), quietwatch_watcher::WatchError> {
//! let watcher = FilteredWatcher::watch(WatchOptions::new("/tmp/project").filter("*.rs"))?;
//! watcher.on_changed(|path| {
//!     println!("changed {}", path.display());
//!     Ok(())
//! })?;
//! # Ok(())
//! # }
//! ```

pub mod debounce;
pub mod error;
pub mod filter;
pub mod platform;
pub mod registry;
pub mod router;
pub mod source;

pub use debounce::DebounceFilter;
pub use error::{DispatchError, HandlerError, HandlerFailure, HandlerResult, WatchError};
pub use filter::NameFilter;
pub use platform::{NotifySource, WatchOptions};
pub use registry::{ErrorHandler, EventHandler, Subscription, Topic};
pub use router::{Dispatch, DispatchStats};
pub use source::{EventSource, ManualHandle, ManualSource, RawEventHandler};

use crossbeam_channel::Sender;
use parking_lot::Mutex;
use quietwatch_core::config::DEFAULT_INTERVAL_MS;
use quietwatch_core::{ChangeKind, Clock, RawEvent, SystemClock, WatcherConfig};
use router::Router;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Settings applied when a [`FilteredWatcher`] is built
#[derive(Clone)]
pub struct WatcherBuilder {
    interval: Duration,
    filter_enabled: bool,
    raising_enabled: bool,
    clock: Arc<dyn Clock>,
}

impl WatcherBuilder {
    pub fn new() -> Self {
        Self {
            interval: Duration::from_millis(DEFAULT_INTERVAL_MS),
            filter_enabled: true,
            raising_enabled: true,
            clock: Arc::new(SystemClock),
        }
    }

    /// Interval and filter flag taken from `config`
    pub fn from_config(config: &WatcherConfig) -> Self {
        Self::new()
            .interval(config.interval())
            .filter_enabled(config.filter_enabled)
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn filter_enabled(mut self, enabled: bool) -> Self {
        self.filter_enabled = enabled;
        self
    }

    /// Start with event processing on or off (on by default)
    pub fn raising_enabled(mut self, enabled: bool) -> Self {
        self.raising_enabled = enabled;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Validate the settings and attach a new watcher to `source`
    pub fn build<S>(self, source: S) -> Result<FilteredWatcher, WatchError>
    where
        S: EventSource + 'static,
    {
        let filter = DebounceFilter::new(self.interval, self.clock)?;
        filter.set_enabled(self.filter_enabled);
        let router = Arc::new(Router::new(filter, self.raising_enabled));

        let mut source: Box<dyn EventSource> = Box::new(source);
        source.attach(Arc::clone(&router) as Arc<dyn RawEventHandler>)?;

        info!(
            "Watcher active (interval: {:?}, dedup: {}, raising: {})",
            self.interval, self.filter_enabled, self.raising_enabled
        );

        Ok(FilteredWatcher {
            router,
            source: Mutex::new(Some(source)),
        })
    }
}

impl Default for WatcherBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A watcher that forwards each logical change once
///
/// Handlers run synchronously on the source's delivery thread. Every method
/// takes `&self` and may be called from any thread, including from inside a
/// handler.
pub struct FilteredWatcher {
    router: Arc<Router>,
    source: Mutex<Option<Box<dyn EventSource>>>,
}

impl FilteredWatcher {
    /// Watch a directory through the platform's native notifications
    pub fn watch(options: WatchOptions) -> Result<Self, WatchError> {
        let source = NotifySource::new(options)?;
        WatcherBuilder::new().build(source)
    }

    /// Validate `config` and watch what it describes
    pub fn from_config(config: &WatcherConfig) -> Result<Self, WatchError> {
        config.validate()?;
        let source = NotifySource::new(WatchOptions::from(config))?;
        WatcherBuilder::from_config(config).build(source)
    }

    pub fn builder() -> WatcherBuilder {
        WatcherBuilder::new()
    }

    pub fn on_created<F>(&self, handler: F) -> Result<Subscription, WatchError>
    where
        F: Fn(&Path) -> HandlerResult + Send + Sync + 'static,
    {
        self.subscribe(ChangeKind::Created, Arc::new(move |event: &RawEvent| handler(event.path())))
    }

    pub fn on_changed<F>(&self, handler: F) -> Result<Subscription, WatchError>
    where
        F: Fn(&Path) -> HandlerResult + Send + Sync + 'static,
    {
        self.subscribe(ChangeKind::Changed, Arc::new(move |event: &RawEvent| handler(event.path())))
    }

    pub fn on_deleted<F>(&self, handler: F) -> Result<Subscription, WatchError>
    where
        F: Fn(&Path) -> HandlerResult + Send + Sync + 'static,
    {
        self.subscribe(ChangeKind::Deleted, Arc::new(move |event: &RawEvent| handler(event.path())))
    }

    /// Register a rename handler; it receives `(new_path, old_path)`
    pub fn on_renamed<F>(&self, handler: F) -> Result<Subscription, WatchError>
    where
        F: Fn(&Path, &Path) -> HandlerResult + Send + Sync + 'static,
    {
        self.subscribe(
            ChangeKind::Renamed,
            Arc::new(move |event: &RawEvent| {
                handler(event.path(), event.old_path().unwrap_or_else(|| event.path()))
            }),
        )
    }

    /// Register a handler that sees the whole [`RawEvent`]
    ///
    /// Registering the same handler twice invokes it twice per event, in
    /// registration order.
    pub fn subscribe(&self, kind: ChangeKind, handler: EventHandler) -> Result<Subscription, WatchError> {
        self.ensure_active()?;
        let subscription = self.router.registry().subscribe(kind, handler);
        self.undo_if_disposed(subscription)?;
        Ok(subscription)
    }

    /// Send every forwarded event of `kinds` into `sender`
    ///
    /// A disconnected receiver shows up as a handler failure.
    pub fn subscribe_channel(
        &self,
        kinds: &[ChangeKind],
        sender: Sender<RawEvent>,
    ) -> Result<Vec<Subscription>, WatchError> {
        let mut subscriptions = Vec::with_capacity(kinds.len());
        for &kind in kinds {
            let sender = sender.clone();
            let subscription = self.subscribe(
                kind,
                Arc::new(move |event: &RawEvent| -> HandlerResult {
                    sender.send(event.clone())?;
                    Ok(())
                }),
            );
            match subscription {
                Ok(subscription) => subscriptions.push(subscription),
                Err(err) => {
                    for subscription in subscriptions {
                        self.router.registry().unsubscribe(subscription);
                    }
                    return Err(err);
                }
            }
        }
        Ok(subscriptions)
    }

    /// Register a handler for source failures and failed dispatch rounds
    pub fn on_error<F>(&self, handler: F) -> Result<Subscription, WatchError>
    where
        F: Fn(&WatchError) + Send + Sync + 'static,
    {
        self.ensure_active()?;
        let subscription = self.router.registry().subscribe_errors(Arc::new(handler));
        self.undo_if_disposed(subscription)?;
        Ok(subscription)
    }

    /// Remove one registration; `Ok(false)` if it was already removed
    pub fn unsubscribe(&self, subscription: Subscription) -> Result<bool, WatchError> {
        self.ensure_active()?;
        Ok(self.router.registry().unsubscribe(subscription))
    }

    /// Run `event` through the watcher as if the source had delivered it
    ///
    /// Returns [`Dispatch::Skipped`] once the watcher is disposed.
    pub fn inject(&self, event: &RawEvent) -> Result<Dispatch, DispatchError> {
        self.router.route(event)
    }

    pub fn raising_enabled(&self) -> bool {
        self.router.raising_enabled()
    }

    /// Turn event processing on or off; while off, raw events are dropped
    /// before they reach the ledger
    pub fn set_raising_enabled(&self, enabled: bool) -> Result<(), WatchError> {
        self.ensure_active()?;
        self.router.set_raising_enabled(enabled);
        Ok(())
    }

    pub fn filter_enabled(&self) -> bool {
        self.router.filter().is_enabled()
    }

    pub fn set_filter_enabled(&self, enabled: bool) -> Result<(), WatchError> {
        self.ensure_active()?;
        self.router.filter().set_enabled(enabled);
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        self.router.filter().interval()
    }

    /// Change the suppression interval for subsequent events
    pub fn set_interval(&self, interval: Duration) -> Result<(), WatchError> {
        self.ensure_active()?;
        self.router.filter().set_interval(interval)?;
        Ok(())
    }

    /// Forget paths not seen for `max_idle`; returns how many were removed
    pub fn prune_ledger(&self, max_idle: Duration) -> usize {
        self.router.filter().prune(max_idle)
    }

    /// Number of paths currently remembered
    pub fn ledger_len(&self) -> usize {
        self.router.filter().ledger().len()
    }

    pub fn subscriber_count(&self, kind: ChangeKind) -> usize {
        self.router.registry().len(kind)
    }

    pub fn stats(&self) -> DispatchStats {
        self.router.stats()
    }

    pub fn is_disposed(&self) -> bool {
        self.router.is_disposed()
    }

    /// Stop watching and release every handler
    ///
    /// Once this returns no handler is invoked again. Idempotent. Called
    /// from inside a handler, the rest of that handler's round is skipped.
    pub fn dispose(&self) {
        let first = self.router.close();
        if first {
            if let Some(mut source) = self.source.lock().take() {
                source.detach();
            }
        }

        self.router.drain();

        if first {
            let released = self.router.release();
            let stats = self.router.stats();
            info!(
                "Watcher disposed ({} subscription(s) released, {} forwarded, {} suppressed)",
                released, stats.forwarded, stats.suppressed
            );
        }
    }

    fn ensure_active(&self) -> Result<(), WatchError> {
        if self.router.is_disposed() {
            return Err(WatchError::Disposed);
        }
        Ok(())
    }

    /// A subscribe racing with `dispose` must not outlive it
    fn undo_if_disposed(&self, subscription: Subscription) -> Result<(), WatchError> {
        if self.router.is_disposed() {
            self.router.registry().unsubscribe(subscription);
            return Err(WatchError::Disposed);
        }
        Ok(())
    }
}

impl Drop for FilteredWatcher {
    fn drop(&mut self) {
        self.dispose();
    }
}
