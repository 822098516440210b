//! Quietwatch CLI - qw command

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cmd;
mod logging;
mod system_config;

/// Quietwatch - file change notifications without the duplicates
#[derive(Parser)]
#[command(name = "qw")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Also write logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch a directory and print each logical change once
    Watch {
        /// Directory to watch (default: `path` from the config file)
        path: Option<PathBuf>,

        /// File-name glob, e.g. "*.rs" or "!*.tmp"
        #[arg(short, long)]
        filter: Option<String>,

        /// Duplicate window in milliseconds (default: 100)
        #[arg(short, long)]
        interval_ms: Option<u64>,

        /// Forward every raw event without deduplication
        #[arg(long)]
        no_dedup: bool,

        /// Only watch the top-level directory
        #[arg(long)]
        non_recursive: bool,

        /// Config file (default: the user config file, if present)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Print one JSON object per event
        #[arg(long)]
        json: bool,
    },
    /// Inspect and validate configuration files
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print an example configuration file
    Example,

    /// Validate a configuration file
    Check {
        /// File to check
        file: PathBuf,
    },

    /// Print where the default configuration file is looked up
    Path,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Flushes the log file on exit
    let _log_guard = logging::init(cli.log_file.as_deref())?;

    match cli.command {
        Commands::Watch {
            path,
            filter,
            interval_ms,
            no_dedup,
            non_recursive,
            config,
            json,
        } => {
            cmd::watch::run(cmd::watch::WatchArgs {
                path,
                filter,
                interval_ms,
                no_dedup,
                non_recursive,
                config,
                json,
            })
            .await
        }
        Commands::Config(config_cmd) => match config_cmd {
            ConfigCommands::Example => cmd::config::run_example().await,
            ConfigCommands::Check { file } => cmd::config::run_check(&file).await,
            ConfigCommands::Path => cmd::config::run_path().await,
        },
    }
}
