//! Configuration for the Warrant server.
//!
//! Loaded from a single `config.toml` in the repo directory. Every field has a
//! default except `secret`, which bootstrap generates on first run.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while reading or writing configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read or write the config file.
    #[error("config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML for this schema.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be rendered as TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Top-level server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarrantConfig {
    /// Socket address the HTTP server binds to.
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Base64-encoded HMAC secret used to sign new tokens.
    #[serde(default)]
    pub secret: String,

    /// Previously used secrets, still accepted for verification.
    #[serde(default)]
    pub retired_secrets: Vec<String>,

    /// Per-request timeout for the HTTP server.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Credential store settings.
    #[serde(default)]
    pub store: StoreConfig,

    /// Logging settings.
    #[serde(default)]
    pub log: LogConfig,
}

impl Default for WarrantConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            secret: String::new(),
            retired_secrets: Vec::new(),
            request_timeout_secs: default_request_timeout_secs(),
            store: StoreConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl WarrantConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&raw)?)
    }

    /// Write configuration to a TOML file, replacing any existing one.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let raw = toml::to_string_pretty(self)?;
        fs::write(path, raw).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Which key-value engine backs the credential store.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Durable log in the data directory.
    #[default]
    File,
    /// Process memory only; everything is lost on restart.
    Memory,
}

/// Credential store settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,

    /// fsync the log after every write batch.
    #[serde(default)]
    pub sync_writes: bool,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Default filter when `RUST_LOG` is not set (e.g. "info", "warrant_server=debug").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_listen() -> String {
    "127.0.0.1:8989".to_string()
}

fn default_request_timeout_secs() -> u64 {
    60
}

fn default_log_level() -> String {
    "info".to_string()
}
