//! Tracing setup
//!
//! Logs go to stderr so event output on stdout stays clean. `RUST_LOG`
//! overrides the default `info` level.

use anyhow::{Context, Result};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global subscriber, optionally teeing into `log_file`
///
/// The returned guard must live until exit or buffered file output is lost.
pub fn init(log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let console = fmt::layer().with_target(false).with_writer(std::io::stderr);

    let Some(log_file) = log_file else {
        tracing_subscriber::registry().with(filter).with(console).init();
        return Ok(None);
    };

    let dir = match log_file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
    let file_name = log_file
        .file_name()
        .with_context(|| format!("Log file path has no file name: {}", log_file.display()))?;

    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file_name));
    let file = fmt::layer().with_ansi(false).with_writer(writer);

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .init();

    Ok(Some(guard))
}
