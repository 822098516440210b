//! Raw notification sources
//!
//! A source delivers raw change records to a [`RawEventHandler`] from its
//! own thread(s). The watcher attaches its router at construction and
//! detaches it exactly once on disposal.

use crate::error::WatchError;
use parking_lot::Mutex;
use quietwatch_core::{ChangeKind, RawEvent};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Receiver of raw, unfiltered notifications
///
/// Methods may be called concurrently from any number of threads.
pub trait RawEventHandler: Send + Sync {
    fn on_created(&self, path: &Path);
    fn on_changed(&self, path: &Path);
    fn on_deleted(&self, path: &Path);
    fn on_renamed(&self, path: &Path, old_path: &Path);
    fn on_error(&self, error: WatchError);
}

/// Producer of raw notifications
pub trait EventSource: Send {
    /// Start delivering events to `handler`
    fn attach(&mut self, handler: Arc<dyn RawEventHandler>) -> Result<(), WatchError>;

    /// Stop delivering events and release the handler and any OS resources
    ///
    /// Must be safe to call more than once.
    fn detach(&mut self);
}

/// Route a [`RawEvent`] to the matching handler method
pub fn deliver(handler: &dyn RawEventHandler, event: &RawEvent) {
    match (event.kind(), event.old_path()) {
        (ChangeKind::Created, _) => handler.on_created(event.path()),
        (ChangeKind::Changed, _) => handler.on_changed(event.path()),
        (ChangeKind::Deleted, _) => handler.on_deleted(event.path()),
        (ChangeKind::Renamed, Some(old_path)) => handler.on_renamed(event.path(), old_path),
        (ChangeKind::Renamed, None) => handler.on_renamed(event.path(), event.path()),
    }
}

#[derive(Default)]
struct Slot {
    handler: Mutex<Option<Arc<dyn RawEventHandler>>>,
    attaches: AtomicUsize,
    releases: AtomicUsize,
}

/// Source driven by hand through a [`ManualHandle`]
///
/// Used for tests, replaying recorded event streams, and bridging
/// notification mechanisms that are not backed by `notify`.
pub struct ManualSource {
    slot: Arc<Slot>,
}

/// Injection side of a [`ManualSource`]; cheap to clone and share
#[derive(Clone)]
pub struct ManualHandle {
    slot: Arc<Slot>,
}

impl ManualSource {
    pub fn new() -> (Self, ManualHandle) {
        let slot = Arc::new(Slot::default());
        (
            Self {
                slot: Arc::clone(&slot),
            },
            ManualHandle { slot },
        )
    }
}

impl EventSource for ManualSource {
    fn attach(&mut self, handler: Arc<dyn RawEventHandler>) -> Result<(), WatchError> {
        *self.slot.handler.lock() = Some(handler);
        self.slot.attaches.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn detach(&mut self) {
        if self.slot.handler.lock().take().is_some() {
            self.slot.releases.fetch_add(1, Ordering::SeqCst);
        }
    }
}

impl ManualHandle {
    fn handler(&self) -> Option<Arc<dyn RawEventHandler>> {
        // Cloned out so a handler that disposes the watcher cannot deadlock on the slot
        self.slot.handler.lock().clone()
    }

    /// Deliver `event`; returns false when no handler is attached
    pub fn emit(&self, event: &RawEvent) -> bool {
        match self.handler() {
            Some(handler) => {
                deliver(handler.as_ref(), event);
                true
            }
            None => false,
        }
    }

    pub fn created(&self, path: impl AsRef<Path>) -> bool {
        self.emit(&RawEvent::created(path.as_ref()))
    }

    pub fn changed(&self, path: impl AsRef<Path>) -> bool {
        self.emit(&RawEvent::changed(path.as_ref()))
    }

    pub fn deleted(&self, path: impl AsRef<Path>) -> bool {
        self.emit(&RawEvent::deleted(path.as_ref()))
    }

    pub fn renamed(&self, path: impl AsRef<Path>, old_path: impl AsRef<Path>) -> bool {
        self.emit(&RawEvent::renamed(path.as_ref(), old_path.as_ref()))
    }

    /// Report a source failure
    pub fn error(&self, error: WatchError) -> bool {
        match self.handler() {
            Some(handler) => {
                handler.on_error(error);
                true
            }
            None => false,
        }
    }

    pub fn is_attached(&self) -> bool {
        self.slot.handler.lock().is_some()
    }

    /// Number of times a handler was attached
    pub fn attach_count(&self) -> usize {
        self.slot.attaches.load(Ordering::SeqCst)
    }

    /// Number of times an attached handler was released
    pub fn release_count(&self) -> usize {
        self.slot.releases.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<String>>,
    }

    impl RawEventHandler for Recorder {
        fn on_created(&self, path: &Path) {
            self.seen.lock().push(format!("created {}", path.display()));
        }
        fn on_changed(&self, path: &Path) {
            self.seen.lock().push(format!("changed {}", path.display()));
        }
        fn on_deleted(&self, path: &Path) {
            self.seen.lock().push(format!("deleted {}", path.display()));
        }
        fn on_renamed(&self, path: &Path, old_path: &Path) {
            self.seen
                .lock()
                .push(format!("renamed {} -> {}", old_path.display(), path.display()));
        }
        fn on_error(&self, error: WatchError) {
            self.seen.lock().push(format!("error {error}"));
        }
    }

    #[test]
    fn test_manual_source_delivers_while_attached() {
        let (mut source, handle) = ManualSource::new();
        let recorder = Arc::new(Recorder::default());

        assert!(!handle.changed("a"));
        source.attach(recorder.clone()).unwrap();
        assert!(handle.is_attached());

        assert!(handle.created("a"));
        assert!(handle.renamed(PathBuf::from("b"), "a"));
        assert!(handle.error(WatchError::Disposed));

        source.detach();
        source.detach();
        assert!(!handle.deleted("b"));

        assert_eq!(
            *recorder.seen.lock(),
            vec![
                "created a".to_string(),
                "renamed a -> b".to_string(),
                "error watcher has been disposed".to_string(),
            ]
        );
        assert_eq!(handle.attach_count(), 1);
        assert_eq!(handle.release_count(), 1);
    }
}
