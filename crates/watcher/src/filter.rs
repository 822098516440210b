//! File-name filters for the notification source
//!
//! A filter is one or more comma-separated globs matched against the file
//! name of each event path:
//! 1. `*` (or `*.*`) matches everything and skips glob matching entirely
//! 2. `*.txt,*.md` keeps only matching names
//! 3. `!*.tmp` drops matching names and keeps the rest
//!
//! Globs are compiled with the `ignore` crate's override matcher, so the
//! usual gitignore glob syntax applies.

use ignore::overrides::{Override, OverrideBuilder};
use quietwatch_core::config::validate_filter;
use quietwatch_core::ConfigError;
use std::path::Path;

/// Compiled file-name filter
#[derive(Debug, Clone)]
pub struct NameFilter {
    pattern: String,
    /// `None` when the filter matches everything
    matcher: Option<Override>,
}

impl NameFilter {
    /// Compile `pattern`, rejecting empty or malformed globs
    pub fn new(pattern: &str) -> Result<Self, ConfigError> {
        validate_filter(pattern)?;

        let globs: Vec<&str> = pattern.split(',').map(str::trim).collect();
        if globs.iter().all(|glob| matches!(*glob, "*" | "*.*")) {
            return Ok(Self::match_all());
        }

        // Names are matched relative to an empty root
        let mut builder = OverrideBuilder::new("");
        for glob in globs {
            if glob.is_empty() || glob == "!" {
                return Err(invalid(pattern, "empty glob in list"));
            }
            if glob.contains('/') {
                return Err(invalid(pattern, "globs match file names and cannot contain '/'"));
            }
            builder
                .add(glob)
                .map_err(|err| invalid(pattern, &err.to_string()))?;
        }

        let matcher = builder
            .build()
            .map_err(|err| invalid(pattern, &err.to_string()))?;

        Ok(Self {
            pattern: pattern.to_string(),
            matcher: Some(matcher),
        })
    }

    /// Filter that keeps every path
    pub fn match_all() -> Self {
        Self {
            pattern: quietwatch_core::config::DEFAULT_FILTER.to_string(),
            matcher: None,
        }
    }

    /// Does the file name of `path` pass the filter?
    pub fn matches(&self, path: &Path) -> bool {
        let Some(matcher) = &self.matcher else {
            return true;
        };
        let Some(name) = path.file_name() else {
            return false;
        };
        !matcher.matched(Path::new(name), false).is_ignore()
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn is_match_all(&self) -> bool {
        self.matcher.is_none()
    }
}

impl Default for NameFilter {
    fn default() -> Self {
        Self::match_all()
    }
}

fn invalid(pattern: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidFilter {
        pattern: pattern.to_string(),
        reason: reason.to_string(),
    }
}
