//! Tracing configuration and log routing.
//!
//! Events go to stdout through a compact formatter and are appended to a log file through a
//! non-blocking writer. The file is `PREBEP_LOG_FILE` when set, otherwise
//! `logs/prebep-index.log` relative to the working directory.
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const LOG_FILE_ENV: &str = "PREBEP_LOG_FILE";
const DEFAULT_LOG_DIR: &str = "logs";
const DEFAULT_LOG_FILE: &str = "prebep-index.log";

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Install the stdout and file subscribers.
///
/// `RUST_LOG` controls filtering and defaults to `info`. If the log file cannot be opened the
/// service keeps running with stdout only. Later calls leave the first subscriber in place.
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stdout_layer = fmt::layer().with_target(false).compact();
    let file_layer = open_log_writer(&log_path(std::env::var(LOG_FILE_ENV).ok())).map(|writer| {
        fmt::layer()
            .with_writer(writer)
            .with_target(true)
            .with_ansi(false)
            .compact()
    });

    let result = tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init();

    if let Err(err) = result {
        eprintln!("Tracing already initialized: {err}");
    }
}

/// Log file location for an optional override.
fn log_path(override_path: Option<String>) -> PathBuf {
    match override_path.filter(|value| !value.trim().is_empty()) {
        Some(path) => PathBuf::from(path),
        None => Path::new(DEFAULT_LOG_DIR).join(DEFAULT_LOG_FILE),
    }
}

fn open_log_writer(path: &Path) -> Option<NonBlocking> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        if let Err(err) = std::fs::create_dir_all(parent) {
            eprintln!("Failed to create log directory {}: {err}", parent.display());
            return None;
        }
    }

    match OpenOptions::new().create(true).append(true).open(path) {
        Ok(file) => {
            let (non_blocking, guard) = tracing_appender::non_blocking(file);
            let _ = LOG_GUARD.set(guard);
            Some(non_blocking)
        }
        Err(err) => {
            eprintln!("Failed to open log file {}: {err}", path.display());
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_path_defaults_under_logs_directory() {
        assert_eq!(log_path(None), PathBuf::from("logs/prebep-index.log"));
        assert_eq!(log_path(Some("  ".into())), PathBuf::from("logs/prebep-index.log"));
        assert_eq!(
            log_path(Some("/var/log/prebep.log".into())),
            PathBuf::from("/var/log/prebep.log")
        );
    }

    #[test]
    fn log_writer_creates_missing_parent_directories() {
        let root = tempfile::TempDir::new().expect("tempdir");
        let path = root.path().join("nested").join("intake.log");

        assert!(open_log_writer(&path).is_some());
        assert!(path.exists());
    }
}
