//! Configuration for the sync core.
//!
//! Layered: TOML config file (`~/.config/staychat/config.toml`) over
//! compiled defaults. A missing config file is not an error — defaults
//! are used. An explicit path that doesn't exist is an error.

use std::path::{Path, PathBuf};
use std::time::Duration;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to parse the TOML configuration.
    #[error("failed to parse config file: {0}")]
    ParseToml(#[from] toml::de::Error),
}

/// Top-level TOML config file structure (all fields optional for partial
/// overrides).
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ConfigFile {
    sync: SyncFileConfig,
}

/// `[sync]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct SyncFileConfig {
    poll_interval_secs: Option<u64>,
    status_interval_secs: Option<u64>,
    page_size: Option<u32>,
    probe_size: Option<u32>,
}

/// Fully resolved sync configuration.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// How often the active conversation is polled for new messages.
    pub poll_interval: Duration,
    /// How often delivery/read statuses are refreshed.
    pub status_interval: Duration,
    /// Messages per history page.
    pub page_size: u32,
    /// Messages fetched by the cheap new-message probe.
    pub probe_size: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            status_interval: Duration::from_secs(6),
            page_size: 20,
            probe_size: 5,
        }
    }
}

impl SyncConfig {
    /// Load configuration from the given file, or from the default path
    /// (`~/.config/staychat/config.toml`) when `explicit_path` is `None`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when an explicit file cannot be read, or
    /// when either file fails to parse.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = load_config_file(explicit_path)?;
        Ok(Self::resolve(&file))
    }

    /// Resolve a `SyncConfig` from a parsed file: file > default. Split
    /// from `load()` so merging can be tested without touching the fs.
    fn resolve(file: &ConfigFile) -> Self {
        let defaults = Self::default();
        Self {
            poll_interval: file
                .sync
                .poll_interval_secs
                .map_or(defaults.poll_interval, Duration::from_secs),
            status_interval: file
                .sync
                .status_interval_secs
                .map_or(defaults.status_interval, Duration::from_secs),
            page_size: file.sync.page_size.unwrap_or(defaults.page_size),
            probe_size: file.sync.probe_size.unwrap_or(defaults.probe_size),
        }
    }
}

fn load_config_file(explicit_path: Option<&Path>) -> Result<ConfigFile, ConfigError> {
    let path = if let Some(p) = explicit_path {
        let contents = std::fs::read_to_string(p).map_err(|e| ConfigError::ReadFile {
            path: p.to_path_buf(),
            source: e,
        })?;
        return Ok(toml::from_str(&contents)?);
    } else {
        let Some(config_dir) = dirs::config_dir() else {
            return Ok(ConfigFile::default());
        };
        config_dir.join("staychat").join("config.toml")
    };

    match std::fs::read_to_string(&path) {
        Ok(contents) => Ok(toml::from_str(&contents)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ConfigFile::default()),
        Err(e) => Err(ConfigError::ReadFile { path, source: e }),
    }
}
