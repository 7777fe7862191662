//! Logging setup for tilefetch binaries.
//!
//! The library itself only emits `tracing` events; installing a subscriber is
//! left to the application. These helpers set up:
//! - an optional log file (`<dir>/tilefetch.log`, cleared on start)
//! - console output on stderr, so stdout stays free for results
//! - filtering via `RUST_LOG`, falling back to the given default level

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Guard that must be kept alive for the duration of logging.
///
/// Dropping this guard will flush and close the log file writer.
pub struct LoggingGuard {
    _file_guard: Option<WorkerGuard>,
}

/// Log to stderr and to `log_dir/log_file`.
///
/// Creates the directory if needed and truncates any previous log file.
///
/// # Errors
///
/// Returns an error if the log file cannot be prepared or a global subscriber
/// is already installed.
pub fn init_logging(
    log_dir: &Path,
    log_file: &str,
    default_level: &str,
) -> Result<LoggingGuard, io::Error> {
    prepare_log_file(log_dir, log_file)?;

    let file_appender = tracing_appender::rolling::never(log_dir, log_file);
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false)
        .with_thread_names(true);

    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .compact();

    tracing_subscriber::registry()
        .with(env_filter(default_level))
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .map_err(io::Error::other)?;

    Ok(LoggingGuard {
        _file_guard: Some(file_guard),
    })
}

/// Log to stderr only.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_console_logging(default_level: &str) -> Result<LoggingGuard, io::Error> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(env_filter(default_level))
        .compact()
        .try_init()
        .map_err(io::Error::other)?;

    Ok(LoggingGuard { _file_guard: None })
}

/// Create `log_dir` and an empty `log_file` inside it.
pub fn prepare_log_file(log_dir: &Path, log_file: &str) -> io::Result<PathBuf> {
    fs::create_dir_all(log_dir)?;
    let log_path = log_dir.join(log_file);
    fs::write(&log_path, "")?;
    Ok(log_path)
}

/// Default log directory (`~/.tilefetch/logs`).
pub fn default_log_dir() -> PathBuf {
    crate::config::config_directory().join("logs")
}

/// Default log file name.
pub fn default_log_file() -> &'static str {
    "tilefetch.log"
}

fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}
