//! Configuration loader utilities

use crate::{Config, ConfigBuilder, ConfigError, ConfigResult};
use std::path::{Path, PathBuf};

/// Environment variable prefix, e.g. `SELFSYNC__SERVER__API_KEY`
pub const ENV_PREFIX: &str = "SELFSYNC";

/// Configuration loader with common loading patterns
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from the first default location found, then the environment
    pub fn load_default() -> ConfigResult<Config> {
        let mut builder = ConfigBuilder::new().add_defaults();

        if let Some(path) = Self::config_exists() {
            builder = builder.add_source_file(path);
        }

        builder.add_env_prefix(ENV_PREFIX).build()
    }

    /// Load configuration from a specific file, then the environment
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> ConfigResult<Config> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.to_path_buf(),
            });
        }

        ConfigBuilder::new()
            .add_defaults()
            .add_source_file(path)
            .add_env_prefix(ENV_PREFIX)
            .build()
    }

    /// Load from an explicit file when given, otherwise from default locations
    pub fn load(path: Option<&Path>) -> ConfigResult<Config> {
        match path {
            Some(path) => Self::load_from_file(path),
            None => Self::load_default(),
        }
    }

    /// Save configuration to a file, choosing the format by extension
    pub fn save_to_file<P: AsRef<Path>>(config: &Config, path: P) -> ConfigResult<()> {
        let path = path.as_ref();
        std::fs::write(path, Self::render(config, path)?).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Generate a default configuration file
    pub fn generate_default_config<P: AsRef<Path>>(path: P) -> ConfigResult<()> {
        Self::save_to_file(&Config::default(), path)
    }

    /// Serialize configuration in the format matching `path`'s extension (YAML by default)
    pub fn render(config: &Config, path: &Path) -> ConfigResult<String> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => {
                toml::to_string_pretty(config).map_err(|e| ConfigError::render("TOML", e))
            }
            Some("json") => {
                serde_json::to_string_pretty(config).map_err(|e| ConfigError::render("JSON", e))
            }
            _ => serde_yaml::to_string(config).map_err(|e| ConfigError::render("YAML", e)),
        }
    }

    /// Find the first existing configuration file in the default locations
    pub fn config_exists() -> Option<PathBuf> {
        Self::default_config_paths()
            .into_iter()
            .find(|path| path.exists())
    }

    /// Default configuration file paths in order of preference
    fn default_config_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        for stem in ["selfsync", ".selfsync"] {
            for ext in ["yaml", "yml", "toml"] {
                paths.push(PathBuf::from(format!("{stem}.{ext}")));
            }
        }

        if let Some(config_dir) = dirs::config_dir() {
            let selfsync_dir = config_dir.join("selfsync");
            paths.push(selfsync_dir.join("config.yaml"));
            paths.push(selfsync_dir.join("config.yml"));
            paths.push(selfsync_dir.join("config.toml"));
        }

        #[cfg(unix)]
        {
            paths.push(PathBuf::from("/etc/selfsync/config.yaml"));
            paths.push(PathBuf::from("/etc/selfsync/config.toml"));
        }

        paths
    }
}

mod dirs {
    use std::path::PathBuf;

    pub fn config_dir() -> Option<PathBuf> {
        #[cfg(target_os = "windows")]
        {
            std::env::var("APPDATA").ok().map(PathBuf::from)
        }
        #[cfg(target_os = "macos")]
        {
            std::env::var("HOME").ok().map(|home| {
                PathBuf::from(home)
                    .join("Library")
                    .join("Application Support")
            })
        }
        #[cfg(not(any(target_os = "windows", target_os = "macos")))]
        {
            std::env::var("XDG_CONFIG_HOME")
                .ok()
                .map(PathBuf::from)
                .or_else(|| {
                    std::env::var("HOME")
                        .ok()
                        .map(|home| PathBuf::from(home).join(".config"))
                })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DeleteMode;
    use rstest::rstest;
    use tempfile::TempDir;

    #[rstest]
    #[case("selfsync.yaml")]
    #[case("selfsync.toml")]
    #[case("selfsync.json")]
    fn test_save_and_load(#[case] file_name: &str) {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join(file_name);

        let mut original = Config::default();
        original.server.url = "https://sync.example.com/api/sync".to_string();
        original.server.api_key = Some("XYZ-123-ABC".to_string());
        original.vault.delete_mode = DeleteMode::Permanent;
        ConfigLoader::save_to_file(&original, &config_path).unwrap();

        let loaded = ConfigLoader::load_from_file(&config_path).unwrap();
        assert_eq!(loaded.server.url, original.server.url);
        assert_eq!(loaded.server.api_key, original.server.api_key);
        assert_eq!(loaded.vault.delete_mode, DeleteMode::Permanent);
        assert_eq!(loaded.vault.state_dir, original.vault.state_dir);
    }

    #[test]
    fn test_load_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let result = ConfigLoader::load_from_file(temp_dir.path().join("absent.yaml"));
        assert!(matches!(result, Err(ConfigError::NotFound { .. })));
    }

    #[test]
    fn test_generate_default_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("default.yaml");

        ConfigLoader::generate_default_config(&config_path).unwrap();
        assert!(config_path.exists());

        let config = ConfigLoader::load(Some(&config_path)).unwrap();
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.vault.delete_mode, DeleteMode::Trash);
    }

    #[test]
    fn test_render_defaults_to_yaml() {
        let rendered = ConfigLoader::render(&Config::default(), Path::new("config")).unwrap();
        assert!(rendered.contains("state_dir: .selfsync"));
    }
}
