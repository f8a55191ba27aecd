// ============================================================================
// motionsift-cli/src/logging.rs
// ============================================================================
//
// LOGGING SETUP: Console and optional file logging
//
// The core library logs exclusively through the `log` facade. This module
// installs the backend once per process:
// - without a log directory, `env_logger` writes to stderr
// - with a log directory, `fern` dispatches to stderr and to a timestamped
//   file `motionsift_<YYYYMMDD_HHMMSS>.log` in that directory
//
// RUST_LOG, when set, overrides the level chosen from --verbose.

use log::LevelFilter;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::CliResult;
use motionsift_core::CoreError;

/// Returns the current local timestamp formatted as "YYYYMMDD_HHMMSS".
///
/// # Example
/// ```
/// let log_filename = format!("motionsift_{}.log", motionsift_cli::logging::get_timestamp());
/// assert!(log_filename.starts_with("motionsift_"));
/// ```
pub fn get_timestamp() -> String {
    chrono::Local::now().format("%Y%m%d_%H%M%S").to_string()
}

/// Picks the level from the verbose flag, unless RUST_LOG names one.
pub fn resolve_level(verbose: bool, rust_log: Option<&str>) -> LevelFilter {
    if let Some(level) = rust_log.and_then(|value| value.trim().parse::<LevelFilter>().ok()) {
        return level;
    }
    if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    }
}

/// Path of the log file for a run started now.
pub fn log_file_path(log_dir: &Path) -> PathBuf {
    log_dir.join(format!("motionsift_{}.log", get_timestamp()))
}

/// Installs the global logger. Returns the log file path when one is written.
pub fn init(verbose: bool, log_dir: Option<&Path>) -> CliResult<Option<PathBuf>> {
    let rust_log = std::env::var("RUST_LOG").ok();
    let level = resolve_level(verbose, rust_log.as_deref());

    match log_dir {
        None => {
            env_logger::Builder::new()
                .format(|buf, record| match record.level() {
                    log::Level::Info => writeln!(buf, "{}", record.args()),
                    other => writeln!(buf, "[{other}] {}", record.args()),
                })
                .filter_level(level)
                .try_init()
                .map_err(|e| CoreError::OperationFailed(format!("Failed to initialize logger: {e}")))?;
            Ok(None)
        }
        Some(dir) => {
            std::fs::create_dir_all(dir).map_err(|e| {
                CoreError::PathError(format!(
                    "Failed to create log directory '{}': {}",
                    dir.display(),
                    e
                ))
            })?;
            let path = log_file_path(dir);
            let file = fern::log_file(&path)?;

            let console = fern::Dispatch::new()
                .format(|out, message, record| match record.level() {
                    log::Level::Info => out.finish(format_args!("{message}")),
                    other => out.finish(format_args!("[{other}] {message}")),
                })
                .chain(std::io::stderr());

            // The file keeps every record plain and timestamped.
            let file_sink = fern::Dispatch::new()
                .format(|out, message, record| {
                    out.finish(format_args!(
                        "{} [{}] {}",
                        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                        record.level(),
                        console::strip_ansi_codes(&message.to_string())
                    ))
                })
                .chain(file);

            fern::Dispatch::new()
                .level(level)
                .chain(console)
                .chain(file_sink)
                .apply()
                .map_err(|e| CoreError::OperationFailed(format!("Failed to initialize logger: {e}")))?;
            Ok(Some(path))
        }
    }
}
