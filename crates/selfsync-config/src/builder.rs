//! Configuration builder for layered configuration loading

use crate::{is_single_segment, Config, ConfigError, ConfigResult};
use config::{Environment, File, FileFormat};
use std::path::{Path, PathBuf};

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Configuration builder for loading configuration from multiple sources
///
/// Sources are applied in the order they were added; later sources win.
#[derive(Debug)]
pub struct ConfigBuilder {
    sources: Vec<ConfigSource>,
    env_separator: String,
}

#[derive(Debug, Clone)]
enum ConfigSource {
    File { path: PathBuf, format: FileFormat },
    Defaults,
    Environment { prefix: String },
}

impl ConfigBuilder {
    /// Create a new configuration builder
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
            env_separator: "__".to_string(),
        }
    }

    /// Add default configuration values
    pub fn add_defaults(mut self) -> Self {
        self.sources.push(ConfigSource::Defaults);
        self
    }

    /// Add a configuration file source; missing files are skipped
    pub fn add_source_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let format = Self::detect_format(&path);
        self.sources.push(ConfigSource::File { path, format });
        self
    }

    /// Add environment variable source with prefix
    pub fn add_env_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.sources.push(ConfigSource::Environment {
            prefix: prefix.into(),
        });
        self
    }

    /// Set environment variable separator (default: "__")
    pub fn env_separator<S: Into<String>>(mut self, separator: S) -> Self {
        self.env_separator = separator.into();
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> ConfigResult<Config> {
        // Defaults always form the base layer so partial files deserialize
        let mut inner =
            config::Config::builder().add_source(config::Config::try_from(&Config::default())?);

        for source in &self.sources {
            match source {
                ConfigSource::File { path, format } => {
                    if path.exists() {
                        inner = inner.add_source(File::from(path.clone()).format(*format));
                    }
                }
                ConfigSource::Environment { prefix } => {
                    inner = inner.add_source(
                        Environment::with_prefix(prefix).separator(&self.env_separator),
                    );
                }
                ConfigSource::Defaults => {}
            }
        }

        let result: Config = inner.build()?.try_deserialize()?;
        Self::validate(&result)?;

        Ok(result)
    }

    /// Detect file format from extension
    fn detect_format(path: &Path) -> FileFormat {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => FileFormat::Toml,
            Some("json") => FileFormat::Json,
            _ => FileFormat::Yaml,
        }
    }

    /// Validate the configuration
    fn validate(config: &Config) -> ConfigResult<()> {
        let url = config.server.url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::invalid(
                "server.url",
                format!("must start with http:// or https://, got '{}'", url),
            ));
        }

        if !is_single_segment(&config.vault.state_dir) {
            return Err(ConfigError::invalid(
                "vault.state_dir",
                "must be a single directory name below the vault root",
            ));
        }

        if config.server.request_timeout_secs == Some(0) {
            return Err(ConfigError::invalid(
                "server.request_timeout_secs",
                "must be greater than 0",
            ));
        }

        if !LOG_LEVELS.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::invalid(
                "logging.level",
                "must be one of: trace, debug, info, warn, error",
            ));
        }

        Ok(())
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DeleteMode;
    use rstest::rstest;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn yaml_file(content: &str) -> NamedTempFile {
        let mut temp_file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(temp_file, "{}", content).unwrap();
        temp_file
    }

    #[test]
    fn test_builder_defaults() {
        let config = ConfigBuilder::new().add_defaults().build().unwrap();
        assert_eq!(config.vault.state_dir, ".selfsync");
        assert_eq!(config.vault.delete_mode, DeleteMode::Trash);
        assert!(config.server.api_key.is_none());
        assert!(config.server.request_timeout().is_none());
    }

    #[test]
    fn test_builder_yaml_file() {
        let temp_file = yaml_file(
            r#"
server:
  url: https://sync.example.com/api/sync
  api_key: XYZ-123-ABC
  request_timeout_secs: 30
vault:
  root: /srv/vaults/testing
  delete_mode: permanent
"#,
        );

        let config = ConfigBuilder::new()
            .add_defaults()
            .add_source_file(temp_file.path())
            .build()
            .unwrap();

        assert_eq!(config.server.url, "https://sync.example.com/api/sync");
        assert_eq!(config.api_key().unwrap(), "XYZ-123-ABC");
        assert_eq!(config.server.request_timeout_secs, Some(30));
        assert_eq!(config.vault.root, PathBuf::from("/srv/vaults/testing"));
        assert_eq!(config.vault.delete_mode, DeleteMode::Permanent);
        // Untouched sections keep their defaults
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_missing_file_is_skipped() {
        let config = ConfigBuilder::new()
            .add_defaults()
            .add_source_file("/nonexistent/selfsync.yaml")
            .build()
            .unwrap();
        assert_eq!(config.vault.state_dir, ".selfsync");
    }

    #[rstest]
    #[case("server:\n  url: ftp://example.com\n", "server.url")]
    #[case("vault:\n  state_dir: a/b\n", "vault.state_dir")]
    #[case("server:\n  request_timeout_secs: 0\n", "server.request_timeout_secs")]
    #[case("logging:\n  level: loud\n", "logging.level")]
    fn test_builder_validation(#[case] content: &str, #[case] expected: &str) {
        let temp_file = yaml_file(content);

        let result = ConfigBuilder::new()
            .add_defaults()
            .add_source_file(temp_file.path())
            .build();

        let error = result.unwrap_err();
        assert_eq!(error.field(), Some(expected), "unexpected error: {}", error);
    }
}
