//! Subscriber lists
//!
//! One list per change kind plus one for error handlers. Lists are
//! copy-on-write: dispatch clones an `Arc` snapshot and iterates it without
//! holding the lock, so handlers may subscribe or unsubscribe freely.

use crate::error::{HandlerResult, WatchError};
use parking_lot::RwLock;
use quietwatch_core::{ChangeKind, RawEvent};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Handler invoked for every forwarded event of a kind
pub type EventHandler = Arc<dyn Fn(&RawEvent) -> HandlerResult + Send + Sync>;

/// Handler invoked for source failures and failed dispatch rounds
pub type ErrorHandler = Arc<dyn Fn(&WatchError) + Send + Sync>;

/// What a subscription listens to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    Event(ChangeKind),
    Error,
}

/// Token returned by a subscribe call; pass it back to unsubscribe
///
/// Registering the same handler twice yields two subscriptions, each
/// removed independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription {
    topic: Topic,
    id: u64,
}

impl Subscription {
    pub fn topic(&self) -> Topic {
        self.topic
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}

impl fmt::Display for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.topic {
            Topic::Event(kind) => write!(f, "{kind} subscription #{}", self.id),
            Topic::Error => write!(f, "error subscription #{}", self.id),
        }
    }
}

/// Ordered snapshot of a list; insertion order is dispatch order
pub type Snapshot<H> = Arc<Vec<(Subscription, H)>>;

struct HandlerList<H> {
    entries: RwLock<Snapshot<H>>,
}

impl<H: Clone> HandlerList<H> {
    fn new() -> Self {
        Self {
            entries: RwLock::new(Arc::new(Vec::new())),
        }
    }

    fn push(&self, subscription: Subscription, handler: H) {
        let mut entries = self.entries.write();
        // Clones the vector only while a dispatch still holds the old snapshot
        Arc::make_mut(&mut entries).push((subscription, handler));
    }

    fn remove(&self, subscription: Subscription) -> bool {
        let mut entries = self.entries.write();
        let Some(index) = entries.iter().position(|(s, _)| *s == subscription) else {
            return false;
        };
        Arc::make_mut(&mut entries).remove(index);
        true
    }

    fn snapshot(&self) -> Snapshot<H> {
        Arc::clone(&self.entries.read())
    }

    /// Replace the list with a fresh empty one, releasing our handler references
    fn clear(&self) -> usize {
        let mut entries = self.entries.write();
        let dropped = entries.len();
        *entries = Arc::new(Vec::new());
        dropped
    }

    fn len(&self) -> usize {
        self.entries.read().len()
    }
}

/// The four event lists and the error list of one watcher
pub struct SubscriberRegistry {
    created: HandlerList<EventHandler>,
    changed: HandlerList<EventHandler>,
    deleted: HandlerList<EventHandler>,
    renamed: HandlerList<EventHandler>,
    errors: HandlerList<ErrorHandler>,
    next_id: AtomicU64,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self {
            created: HandlerList::new(),
            changed: HandlerList::new(),
            deleted: HandlerList::new(),
            renamed: HandlerList::new(),
            errors: HandlerList::new(),
            next_id: AtomicU64::new(1),
        }
    }

    fn list(&self, kind: ChangeKind) -> &HandlerList<EventHandler> {
        match kind {
            ChangeKind::Created => &self.created,
            ChangeKind::Changed => &self.changed,
            ChangeKind::Deleted => &self.deleted,
            ChangeKind::Renamed => &self.renamed,
        }
    }

    fn next(&self, topic: Topic) -> Subscription {
        Subscription {
            topic,
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
        }
    }

    pub fn subscribe(&self, kind: ChangeKind, handler: EventHandler) -> Subscription {
        let subscription = self.next(Topic::Event(kind));
        self.list(kind).push(subscription, handler);
        subscription
    }

    pub fn subscribe_errors(&self, handler: ErrorHandler) -> Subscription {
        let subscription = self.next(Topic::Error);
        self.errors.push(subscription, handler);
        subscription
    }

    /// Remove one registration; returns false if it was already gone
    pub fn unsubscribe(&self, subscription: Subscription) -> bool {
        match subscription.topic {
            Topic::Event(kind) => self.list(kind).remove(subscription),
            Topic::Error => self.errors.remove(subscription),
        }
    }

    pub fn snapshot(&self, kind: ChangeKind) -> Snapshot<EventHandler> {
        self.list(kind).snapshot()
    }

    pub fn error_snapshot(&self) -> Snapshot<ErrorHandler> {
        self.errors.snapshot()
    }

    /// Empty every list, returning how many registrations were dropped
    pub fn clear(&self) -> usize {
        let events: usize = ChangeKind::ALL
            .into_iter()
            .map(|kind| self.list(kind).clear())
            .sum();
        events + self.errors.clear()
    }

    pub fn len(&self, kind: ChangeKind) -> usize {
        self.list(kind).len()
    }

    pub fn error_len(&self) -> usize {
        self.errors.len()
    }
}

impl Default for SubscriberRegistry {
    fn default() -> Self {
        Self::new()
    }
}
