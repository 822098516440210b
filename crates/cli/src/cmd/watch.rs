//! Watch command - print deduplicated changes until Ctrl-C

use crate::system_config;
use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use quietwatch_core::{ChangeKind, RawEvent, WatcherConfig};
use quietwatch_watcher::FilteredWatcher;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

/// Flags given to `qw watch`; each one overrides the config file
pub struct WatchArgs {
    pub path: Option<PathBuf>,
    pub filter: Option<String>,
    pub interval_ms: Option<u64>,
    pub no_dedup: bool,
    pub non_recursive: bool,
    pub config: Option<PathBuf>,
    pub json: bool,
}

impl WatchArgs {
    fn apply(&self, mut config: WatcherConfig) -> WatcherConfig {
        if let Some(path) = &self.path {
            config.path = path.clone();
        }
        if let Some(filter) = &self.filter {
            config.filter = filter.clone();
        }
        if let Some(interval_ms) = self.interval_ms {
            config.interval_ms = interval_ms;
        }
        if self.no_dedup {
            config.filter_enabled = false;
        }
        if self.non_recursive {
            config.recursive = false;
        }
        config
    }
}

pub async fn run(args: WatchArgs) -> Result<()> {
    let config = args.apply(system_config::load(args.config.as_deref())?);
    config.validate().context("Invalid watch configuration")?;

    let watcher = FilteredWatcher::from_config(&config)
        .with_context(|| format!("Failed to watch {}", config.path.display()))?;
    let watcher = Arc::new(watcher);

    let (tx, rx) = crossbeam_channel::unbounded();
    watcher.subscribe_channel(&ChangeKind::ALL, tx)?;
    watcher.on_error(|error| eprintln!("{} {}", "error:".red().bold(), error))?;

    if !args.json {
        println!(
            "{} {} {}",
            "Watching".bold(),
            config.path.display().cyan(),
            "(Ctrl-C to stop)".dimmed()
        );
    }

    // Ends once dispose() drops the channel senders
    let json = args.json;
    let printer = tokio::task::spawn_blocking(move || -> Result<u64> {
        let mut printed = 0;
        for event in rx.iter() {
            print_event(&event, json)?;
            printed += 1;
        }
        Ok(printed)
    });

    let pruner = config.prune_idle().map(|max_idle| {
        let watcher = Arc::clone(&watcher);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(max_idle);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let pruned = watcher.prune_ledger(max_idle);
                if pruned > 0 {
                    debug!("Pruned {} idle path(s)", pruned);
                }
            }
        })
    });

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;

    if let Some(pruner) = pruner {
        pruner.abort();
    }
    watcher.dispose();

    let printed = printer.await.context("Event printer task failed")??;
    let stats = watcher.stats();
    info!(
        "Stopped: {} raw event(s), {} forwarded, {} suppressed, {} handler failure(s)",
        stats.received, stats.forwarded, stats.suppressed, stats.handler_failures
    );

    if !json {
        println!(
            "\n{} {} change(s) printed, {} duplicate(s) suppressed",
            "Stopped.".bold(),
            printed,
            stats.suppressed
        );
    }

    Ok(())
}

fn print_event(event: &RawEvent, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(event).context("Failed to encode event")?);
        return Ok(());
    }

    let path = event.path().display();
    match (event.kind(), event.old_path()) {
        (ChangeKind::Renamed, Some(old_path)) => println!(
            "{:>8} {} {} {}",
            event.kind().magenta(),
            old_path.display(),
            "->".dimmed(),
            path
        ),
        (ChangeKind::Created, _) => println!("{:>8} {}", event.kind().green(), path),
        (ChangeKind::Deleted, _) => println!("{:>8} {}", event.kind().red(), path),
        (kind, _) => println!("{:>8} {}", kind.yellow(), path),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn args() -> WatchArgs {
        WatchArgs {
            path: None,
            filter: None,
            interval_ms: None,
            no_dedup: false,
            non_recursive: false,
            config: None,
            json: false,
        }
    }

    #[test]
    fn test_flags_override_config() {
        let base = WatcherConfig {
            path: PathBuf::from("/from/config"),
            filter: "*.md".to_string(),
            ..WatcherConfig::default()
        };

        let config = WatchArgs {
            path: Some(PathBuf::from("/from/flag")),
            interval_ms: Some(250),
            no_dedup: true,
            non_recursive: true,
            ..args()
        }
        .apply(base);

        assert_eq!(config.path, PathBuf::from("/from/flag"));
        assert_eq!(config.filter, "*.md");
        assert_eq!(config.interval(), Duration::from_millis(250));
        assert!(!config.filter_enabled);
        assert!(!config.recursive);
    }

    #[test]
    fn test_no_flags_keep_config() {
        let base = WatcherConfig {
            path: PathBuf::from("/w"),
            interval_ms: 40,
            ..WatcherConfig::default()
        };
        assert_eq!(args().apply(base.clone()), base);
    }
}
