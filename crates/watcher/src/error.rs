//! Watcher and dispatch errors

use crate::registry::Subscription;
use quietwatch_core::{ConfigError, RawEvent};
use std::fmt;
use thiserror::Error;

/// Error a handler may return; anything implementing `Error` converts with `?`
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Result returned by event handlers
pub type HandlerResult = Result<(), HandlerError>;

#[derive(Debug, Error)]
pub enum WatchError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("watcher has been disposed")]
    Disposed,

    #[error("notification source failed: {0}")]
    Source(#[from] notify::Error),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

/// One or more handlers failed while an event was dispatched
///
/// Every handler in the round still ran; this collects the ones that
/// returned an error or panicked.
#[derive(Debug, Error)]
#[error("{} of {invoked} handler(s) failed for {event}", .failures.len())]
pub struct DispatchError {
    pub event: RawEvent,
    pub invoked: usize,
    pub failures: Vec<HandlerFailure>,
}

#[derive(Debug)]
pub enum HandlerFailure {
    /// Handler returned `Err`
    Returned {
        subscription: Subscription,
        error: HandlerError,
    },
    /// Handler panicked; the payload message is kept
    Panicked {
        subscription: Subscription,
        message: String,
    },
}

impl HandlerFailure {
    pub fn subscription(&self) -> Subscription {
        match self {
            HandlerFailure::Returned { subscription, .. }
            | HandlerFailure::Panicked { subscription, .. } => *subscription,
        }
    }
}

impl fmt::Display for HandlerFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerFailure::Returned { subscription, error } => {
                write!(f, "{subscription} returned error: {error}")
            }
            HandlerFailure::Panicked {
                subscription,
                message,
            } => write!(f, "{subscription} panicked: {message}"),
        }
    }
}
