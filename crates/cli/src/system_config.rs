//! User-level configuration file
//!
//! Looked up at `<config dir>/quietwatch/config.toml`, where the config dir
//! comes from `dirs` (or `QW_CONFIG_DIR` when set).

use anyhow::{Context, Result};
use quietwatch_core::WatcherConfig;
use std::path::{Path, PathBuf};

pub const CONFIG_DIR_ENV: &str = "QW_CONFIG_DIR";
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Directory holding the user config file
pub fn config_dir() -> Option<PathBuf> {
    if let Some(dir) = std::env::var_os(CONFIG_DIR_ENV) {
        return Some(PathBuf::from(dir));
    }
    dirs::config_dir().map(|dir| dir.join("quietwatch"))
}

pub fn config_file_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join(CONFIG_FILE_NAME))
}

/// Load `explicit` if given, else the user config file if it exists, else
/// the defaults
pub fn load(explicit: Option<&Path>) -> Result<WatcherConfig> {
    if let Some(path) = explicit {
        return WatcherConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()));
    }

    match config_file_path() {
        Some(path) if path.exists() => WatcherConfig::load(&path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        _ => Ok(WatcherConfig::default()),
    }
}
