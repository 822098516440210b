//! Quietwatch Core - primitives for duplicate-suppressing file watching
//!
//! This crate provides the layer the watcher is built on:
//! - Raw change records and their kinds
//! - Injectable clocks
//! - The per-path suppression ledger
//! - Watcher configuration and validation

pub mod clock;
pub mod config;
pub mod error;
pub mod event;
pub mod ledger;

// Re-export main types for convenience
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::WatcherConfig;
pub use error::ConfigError;
pub use event::{ChangeKind, RawEvent};
pub use ledger::Ledger;
