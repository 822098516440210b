//! Configuration commands
//!
//! Print an example file, validate a file, or show where the default file
//! is looked up.

use crate::system_config;
use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use quietwatch_core::config::{example_config, MAX_INTERVAL_MS, MAX_PRUNE_IDLE_SECS};
use quietwatch_core::WatcherConfig;
use quietwatch_watcher::NameFilter;
use std::path::Path;

/// Print an example configuration file
pub async fn run_example() -> Result<()> {
    print!("{}", example_config());
    Ok(())
}

/// Validate a configuration file and print its effective values
pub async fn run_check(file: &Path) -> Result<()> {
    let config = WatcherConfig::load(file)
        .with_context(|| format!("Failed to load config from {}", file.display()))?;
    config
        .validate()
        .with_context(|| format!("Invalid config {}", file.display()))?;
    NameFilter::new(&config.filter)
        .with_context(|| format!("Invalid config {}", file.display()))?;

    println!("{} {} is valid\n", "✓".green(), file.display());

    println!("  {} = {}", "path".cyan(), config.path.display());
    println!("  {} = {:?}", "filter".cyan(), config.filter);
    println!("  {} = {}", "recursive".cyan(), config.recursive);
    println!(
        "  {} = {} {}",
        "interval_ms".cyan(),
        config.interval_ms,
        format!("(0-{MAX_INTERVAL_MS})").dimmed()
    );
    println!("  {} = {}", "filter_enabled".cyan(), config.filter_enabled);
    println!(
        "  {} = {} {}",
        "prune_idle_secs".cyan(),
        config.prune_idle_secs,
        if config.prune_idle_secs == 0 {
            "(never)".dimmed().to_string()
        } else {
            format!("(max {MAX_PRUNE_IDLE_SECS})").dimmed().to_string()
        }
    );

    Ok(())
}

/// Print the default configuration file location
pub async fn run_path() -> Result<()> {
    let config_path =
        system_config::config_file_path().context("Could not determine config file path")?;

    let status = if config_path.exists() {
        "(exists)".green().to_string()
    } else {
        "(not found, defaults apply)".dimmed().to_string()
    };
    println!("{} {}", config_path.display(), status);
    Ok(())
}
