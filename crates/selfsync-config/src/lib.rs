//! Configuration management system for SelfSync
//!
//! This crate loads the client configuration from layered sources:
//! built-in defaults, a YAML/TOML/JSON file, and `SELFSYNC__*` environment
//! variables, in that order of precedence.
//!
//! # Examples
//!
//! ```rust,no_run
//! use selfsync_config::ConfigBuilder;
//!
//! let config = ConfigBuilder::new()
//!     .add_defaults()
//!     .add_source_file("selfsync.yaml")
//!     .add_env_prefix("SELFSYNC")
//!     .build()
//!     .expect("Failed to load configuration");
//!
//! println!("Syncing {} against {}", config.vault.root.display(), config.server.url);
//! ```

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub mod builder;
pub mod error;
pub mod loader;

pub use builder::ConfigBuilder;
pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;

/// File name of the persisted snapshot inside the state directory
pub const SNAPSHOT_FILE_NAME: &str = "snapshot.json";

/// Main configuration structure for SelfSync
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Sync server configuration
    pub server: ServerConfig,
    /// Local vault configuration
    pub vault: VaultConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Config {
    /// Get the bearer token, failing if none is configured
    pub fn api_key(&self) -> ConfigResult<&str> {
        match self.server.api_key.as_deref() {
            Some(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(ConfigError::missing_required("server.api_key")),
        }
    }

    /// Get the vault name used as the archive path prefix
    ///
    /// Falls back to the final component of the vault root.
    pub fn vault_name(&self) -> String {
        if let Some(name) = self.vault.name.as_deref().filter(|n| !n.is_empty()) {
            return name.to_string();
        }

        let root = std::fs::canonicalize(&self.vault.root)
            .unwrap_or_else(|_| self.vault.root.clone());
        root.file_name()
            .and_then(|name| name.to_str())
            .map_or_else(|| "vault".to_string(), ToString::to_string)
    }

    /// Get the directory holding client state inside the vault
    pub fn state_path(&self) -> PathBuf {
        self.vault.root.join(&self.vault.state_dir)
    }

    /// Get the path of the persisted snapshot
    pub fn snapshot_path(&self) -> PathBuf {
        self.state_path().join(SNAPSHOT_FILE_NAME)
    }
}

/// Sync server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Sync endpoint URL
    pub url: String,
    /// Static bearer token
    pub api_key: Option<String>,
    /// Overall request timeout in seconds (none = transport default)
    pub request_timeout_secs: Option<u64>,
}

impl ServerConfig {
    /// Get the request timeout, if one is configured
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8000/api/sync".to_string(),
            api_key: None,
            request_timeout_secs: None,
        }
    }
}

/// What happens to local files the server deleted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeleteMode {
    /// Move into the state directory's trash
    #[default]
    Trash,
    /// Remove from disk
    Permanent,
}

/// Local vault configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultConfig {
    /// Root directory of the vault
    pub root: PathBuf,
    /// Vault name (defaults to the root directory name)
    pub name: Option<String>,
    /// Name of the client state directory below the root
    pub state_dir: String,
    /// Deletion behavior for server-side deletes
    pub delete_mode: DeleteMode,
    /// Include dot-prefixed entries in the vault listing
    pub include_hidden: bool,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            name: None,
            state_dir: ".selfsync".to_string(),
            delete_mode: DeleteMode::Trash,
            include_hidden: false,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level
    pub level: String,
    /// Enable JSON formatting
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

/// Check that a state directory name is a single relative path segment
pub(crate) fn is_single_segment(name: &str) -> bool {
    let path = Path::new(name);
    !name.is_empty()
        && path.components().count() == 1
        && matches!(
            path.components().next(),
            Some(std::path::Component::Normal(_))
        )
}
