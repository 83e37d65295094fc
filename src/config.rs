//! Configuration management for linecase
//!
//! linecase reads optional configuration from ~/.linecase/config.toml.
//! Command-line flags override anything set here.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::interpreter::DEFAULT_BUFFER_SIZE;

/// Smallest accepted line buffer
pub const MIN_BUFFER_SIZE: usize = 16;

/// Longest accepted session timeout (one day)
pub const MAX_ALARM_SECONDS: u32 = 86_400;

/// linecase configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Command loop settings
    #[serde(default)]
    pub session: SessionConfig,

    /// Debug logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Initial line buffer size in bytes
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,

    /// Deliver SIGALRM after this many seconds
    #[serde(default)]
    pub alarm_seconds: Option<u32>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            alarm_seconds: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Write a debug log to ~/.linecase/linecase.log
    #[serde(default)]
    pub debug: bool,
}

fn default_buffer_size() -> usize {
    DEFAULT_BUFFER_SIZE
}

/// Directory holding the config file and the debug log
pub fn config_dir() -> Result<PathBuf> {
    let home_dir = dirs::home_dir()
        .ok_or_else(|| anyhow::anyhow!("Cannot determine home directory"))?;
    Ok(home_dir.join(".linecase"))
}

/// Get the default configuration file path
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

/// Parse configuration text
pub fn parse_config(text: &str) -> Result<Config> {
    let config: Config = toml::from_str(text).context("Malformed configuration")?;
    validate_config(&config)?;
    Ok(config)
}

/// Load configuration from `path`, or from the default location.
///
/// A missing file yields the defaults. It is never created.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => config_file_path()?,
    };

    if !path.exists() {
        return Ok(Config::default());
    }

    let text = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_config(&text).with_context(|| format!("Invalid config file: {}", path.display()))
}

/// Validate configuration values
pub fn validate_config(config: &Config) -> Result<()> {
    if config.session.buffer_size < MIN_BUFFER_SIZE {
        anyhow::bail!(
            "Invalid buffer_size: {} (min {})",
            config.session.buffer_size,
            MIN_BUFFER_SIZE
        );
    }

    if let Some(seconds) = config.session.alarm_seconds {
        if seconds == 0 || seconds > MAX_ALARM_SECONDS {
            anyhow::bail!(
                "Invalid alarm_seconds: {} (must be 1-{})",
                seconds,
                MAX_ALARM_SECONDS
            );
        }
    }

    Ok(())
}
