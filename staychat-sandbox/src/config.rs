//! Configuration system for the sandbox backend.
//!
//! Supports layered configuration with the following priority (highest first):
//! 1. CLI arguments
//! 2. Environment variables (via clap `env` attribute)
//! 3. TOML config file (`~/.config/staychat-sandbox/config.toml`)
//! 4. Compiled defaults

use std::path::PathBuf;

/// Errors that can occur when loading sandbox configuration.
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

/// Top-level TOML config file structure for the sandbox.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct SandboxConfigFile {
    server: ServerFileConfig,
}

/// `[server]` section of the sandbox config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ServerFileConfig {
    bind_addr: Option<String>,
    auth_token: Option<String>,
}

/// CLI arguments for the sandbox server.
#[derive(clap::Parser, Debug, Default)]
#[command(version, about = "Staychat sandbox backend")]
pub struct SandboxCliArgs {
    /// Address to bind the sandbox server to.
    #[arg(short, long, env = "STAYCHAT_SANDBOX_ADDR")]
    pub bind: Option<String>,

    /// Bearer token the primary routes require (guest routes never check).
    #[arg(long, env = "STAYCHAT_SANDBOX_TOKEN")]
    pub auth_token: Option<String>,

    /// Path to config file (default: `~/.config/staychat-sandbox/config.toml`).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Log level filter (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", env = "STAYCHAT_SANDBOX_LOG")]
    pub log_level: String,
}

/// Fully resolved sandbox configuration.
#[derive(Debug, Clone)]
pub struct SandboxConfig {
    /// Address to bind the server to (e.g., `127.0.0.1:9900`).
    pub bind_addr: String,
    /// Bearer token required on primary routes; `None` disables the check.
    pub auth_token: Option<String>,
    /// Log level filter string.
    pub log_level: String,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:9900".to_string(),
            auth_token: None,
            log_level: "info".to_string(),
        }
    }
}

impl SandboxConfig {
    /// Load configuration by merging CLI args, env vars, and a TOML file.
    ///
    /// If `--config` is given and the file does not exist, returns an error.
    /// If no `--config` is given, the default path is tried and a missing
    /// file is treated as empty config.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the explicit config file cannot be read
    /// or parsed.
    pub fn load(cli: &SandboxCliArgs) -> Result<Self, ConfigError> {
        let file = load_config_file(cli.config.as_deref())?;
        Ok(Self::resolve(cli, &file))
    }

    fn resolve(cli: &SandboxCliArgs, file: &SandboxConfigFile) -> Self {
        let defaults = Self::default();
        Self {
            bind_addr: cli
                .bind
                .clone()
                .or_else(|| file.server.bind_addr.clone())
                .unwrap_or(defaults.bind_addr),
            auth_token: cli
                .auth_token
                .clone()
                .or_else(|| file.server.auth_token.clone()),
            log_level: cli.log_level.clone(),
        }
    }
}

fn load_config_file(
    explicit_path: Option<&std::path::Path>,
) -> Result<SandboxConfigFile, ConfigError> {
    let path = if let Some(p) = explicit_path {
        let contents = std::fs::read_to_string(p).map_err(|e| ConfigError::ReadFile {
            path: p.to_path_buf(),
            source: e,
        })?;
        return Ok(toml::from_str(&contents)?);
    } else {
        let Some(config_dir) = dirs::config_dir() else {
            return Ok(SandboxConfigFile::default());
        };
        config_dir.join("staychat-sandbox").join("config.toml")
    };

    match std::fs::read_to_string(&path) {
        Ok(contents) => Ok(toml::from_str(&contents)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(SandboxConfigFile::default()),
        Err(e) => Err(ConfigError::ReadFile { path, source: e }),
    }
}
