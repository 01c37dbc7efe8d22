//! Error types for configuration management

use crate::loader::ENV_PREFIX;
use selfsync_types::Error as SelfSyncError;
use std::path::PathBuf;
use thiserror::Error;

/// Configuration error type
#[derive(Error, Debug)]
pub enum ConfigError {
    /// An explicitly requested config file does not exist
    #[error("Config file '{}' not found", .path.display())]
    NotFound {
        /// Path that was requested
        path: PathBuf,
    },

    /// Reading or writing a config file failed
    #[error("I/O error on config file '{}': {source}", .path.display())]
    Io {
        /// Path to the configuration file
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// A setting has a value the client cannot work with
    #[error("Invalid setting '{field}': {reason}")]
    Invalid {
        /// Dotted key of the offending setting, e.g. `server.url`
        field: &'static str,
        /// What is wrong with the value
        reason: String,
    },

    /// A setting without a usable default was not provided
    #[error("Missing required setting '{key}' (set it in the config file or {})", env_var(.key))]
    MissingRequired {
        /// Dotted key of the missing setting
        key: &'static str,
    },

    /// Layered sources could not be merged or deserialized
    #[error("Failed to load configuration: {message}")]
    Source {
        /// Message from the `config` crate
        message: String,
    },

    /// A configuration could not be written in the requested format
    #[error("Failed to render configuration as {format}: {message}")]
    Render {
        /// Target format name
        format: &'static str,
        /// Serializer message
        message: String,
    },
}

impl From<config::ConfigError> for ConfigError {
    fn from(error: config::ConfigError) -> Self {
        Self::Source {
            message: error.to_string(),
        }
    }
}

impl From<ConfigError> for SelfSyncError {
    fn from(error: ConfigError) -> Self {
        SelfSyncError::config(error.to_string())
    }
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

impl ConfigError {
    /// Create an invalid setting error
    pub fn invalid<S: Into<String>>(field: &'static str, reason: S) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }

    /// Create a missing setting error
    pub fn missing_required(key: &'static str) -> Self {
        Self::MissingRequired { key }
    }

    /// Create a render error for `format`
    pub fn render<E: std::fmt::Display>(format: &'static str, error: E) -> Self {
        Self::Render {
            format,
            message: error.to_string(),
        }
    }

    /// Get the dotted key this error is about, if any
    pub fn field(&self) -> Option<&'static str> {
        match self {
            Self::Invalid { field, .. } => Some(*field),
            Self::MissingRequired { key } => Some(*key),
            _ => None,
        }
    }
}

/// Environment variable that overrides a dotted key, e.g. `SELFSYNC__SERVER__API_KEY`
pub fn env_var(key: &str) -> String {
    let mut name = String::from(ENV_PREFIX);
    for segment in key.split('.') {
        name.push_str("__");
        name.push_str(&segment.to_ascii_uppercase());
    }
    name
}
