//! Configuration errors
//!
//! Raised eagerly at construction, setter, or validation time and never
//! silently clamped.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("watch path is empty")]
    MissingPath,

    #[error("watch path does not exist: {}", .0.display())]
    PathNotFound(PathBuf),

    #[error("watch path is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("filter pattern is empty")]
    EmptyFilter,

    #[error("invalid filter pattern '{pattern}': {reason}")]
    InvalidFilter { pattern: String, reason: String },

    #[error("interval {value_ms}ms is out of range (0-{max_ms}ms)")]
    IntervalOutOfRange { value_ms: u128, max_ms: u64 },

    #[error("prune_idle_secs {value} is out of range (0 to disable, or 1-{max})")]
    PruneOutOfRange { value: u64, max: u64 },

    #[error("failed to read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}
