//! Watcher configuration
//!
//! Loaded from TOML, overlaid by the caller, then checked with
//! [`WatcherConfig::validate`] before a watcher is built from it.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default suppression interval
pub const DEFAULT_INTERVAL_MS: u64 = 100;

/// Largest accepted suppression interval
pub const MAX_INTERVAL_MS: u64 = 60_000;

/// Largest accepted idle time before a ledger entry may be pruned
pub const MAX_PRUNE_IDLE_SECS: u64 = 86_400;

/// Filter that matches every file name
pub const DEFAULT_FILTER: &str = "*";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WatcherConfig {
    /// Directory to watch
    pub path: PathBuf,

    /// File-name glob; prefix with `!` to exclude instead
    pub filter: String,

    /// Watch subdirectories too
    pub recursive: bool,

    /// Suppression interval in milliseconds
    pub interval_ms: u64,

    /// When false every raw event is forwarded
    pub filter_enabled: bool,

    /// Prune ledger entries idle this long (0 = never)
    pub prune_idle_secs: u64,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::new(),
            filter: DEFAULT_FILTER.to_string(),
            recursive: true,
            interval_ms: DEFAULT_INTERVAL_MS,
            filter_enabled: true,
            prune_idle_secs: 0,
        }
    }
}

impl WatcherConfig {
    /// Read and parse a TOML config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check ranges and required fields
    ///
    /// Existence of `path` is checked by the notification source when it
    /// is opened, not here.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.path.as_os_str().is_empty() {
            return Err(ConfigError::MissingPath);
        }

        validate_filter(&self.filter)?;
        validate_interval(self.interval())?;

        if self.prune_idle_secs > MAX_PRUNE_IDLE_SECS {
            return Err(ConfigError::PruneOutOfRange {
                value: self.prune_idle_secs,
                max: MAX_PRUNE_IDLE_SECS,
            });
        }

        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Idle time after which ledger entries are pruned, if enabled
    pub fn prune_idle(&self) -> Option<Duration> {
        (self.prune_idle_secs > 0).then(|| Duration::from_secs(self.prune_idle_secs))
    }
}

/// Reject intervals above [`MAX_INTERVAL_MS`]
pub fn validate_interval(interval: Duration) -> Result<(), ConfigError> {
    if interval > Duration::from_millis(MAX_INTERVAL_MS) {
        return Err(ConfigError::IntervalOutOfRange {
            value_ms: interval.as_millis(),
            max_ms: MAX_INTERVAL_MS,
        });
    }
    Ok(())
}

/// Reject empty or whitespace-only filter patterns
pub fn validate_filter(pattern: &str) -> Result<(), ConfigError> {
    if pattern.trim().is_empty() {
        return Err(ConfigError::EmptyFilter);
    }
    Ok(())
}

/// Example configuration with every key documented
pub fn example_config() -> String {
    format!(
        r#"# Quietwatch configuration

# Directory to watch
path = "."

# File-name glob ("*.txt"); prefix with "!" to exclude ("!*.tmp")
filter = "{DEFAULT_FILTER}"

# Watch subdirectories too
recursive = true

# Raw events for a path arriving within this many milliseconds of the
# previous one are treated as duplicates (0-{MAX_INTERVAL_MS})
interval_ms = {DEFAULT_INTERVAL_MS}

# Set to false to forward every raw event unfiltered
filter_enabled = true

# Forget paths untouched for this many seconds (0 = never, max {MAX_PRUNE_IDLE_SECS})
prune_idle_secs = 0
"#
    )
}
