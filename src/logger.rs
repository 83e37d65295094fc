//! Debug logging support for linecase
//!
//! Standard output carries command results and the shutdown transcript, so
//! logs never go there. When debug mode is on, events are appended to
//! ~/.linecase/linecase.log instead.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, registry, EnvFilter};

/// Filter used when RUST_LOG is not set
const DEFAULT_FILTER: &str = "linecase=info";

/// Initialize the debug logging system
///
/// Returns the path to the log file, or None if logging is not enabled.
/// Errors mean debug logging was requested but is unavailable; the caller
/// decides whether to go on without it.
pub fn init_debug_logging(debug_enabled: bool) -> Result<Option<PathBuf>> {
    if !debug_enabled {
        return Ok(None);
    }

    let log_path = get_log_path()?;
    init_file_logging(&log_path)?;
    Ok(Some(log_path))
}

fn init_file_logging(log_path: &Path) -> Result<()> {
    if let Some(parent) = log_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create log directory: {}", parent.display()))?;
    }

    let log_file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
        .with_context(|| format!("Failed to open log file: {}", log_path.display()))?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let subscriber = registry()
        .with(
            fmt::layer()
                .with_writer(log_file)
                .with_ansi(false)
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false),
        )
        .with(filter);

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to set tracing subscriber: {}", e))
}

/// Get the log file path
pub fn get_log_path() -> Result<PathBuf> {
    Ok(crate::config::config_dir()?.join("linecase.log"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_debug_logging_disabled() {
        let result = init_debug_logging(false);
        assert!(result.is_ok());
        assert_eq!(result.unwrap(), None, "Should return None when debug is disabled");
    }

    #[test]
    fn test_unusable_log_directory_is_an_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let blocker = dir.path().join(".linecase");
        std::fs::write(&blocker, "not a directory").unwrap();

        let err = init_file_logging(&blocker.join("linecase.log")).unwrap_err();
        assert!(
            format!("{:#}", err).contains("Failed to create log directory"),
            "got {:#}",
            err
        );
    }

    #[test]
    fn test_log_path_lives_next_to_config() {
        if let Ok(path) = get_log_path() {
            assert!(path.ends_with(".linecase/linecase.log"), "got {}", path.display());
        }
    }
}
