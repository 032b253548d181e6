//! Configuration loader utilities

use crate::{ConfigBuilder, ConfigError, ConfigResult};
use std::path::{Path, PathBuf};

/// Environment variable prefix read by every loader entry point
pub const ENV_PREFIX: &str = "REPLISYNC";

/// Configuration loader with common loading patterns
pub struct ConfigLoader;

impl ConfigLoader {
    /// Builder seeded with defaults, a configuration file and the environment
    ///
    /// With an explicit path that file is used; otherwise the first file found
    /// in the default locations is. Callers may add overrides before building.
    pub fn builder(explicit: Option<&Path>) -> ConfigResult<ConfigBuilder> {
        let mut builder = ConfigBuilder::new().add_defaults();

        match explicit {
            Some(path) => {
                if !path.is_file() {
                    return Err(ConfigError::Io {
                        path: path.to_path_buf(),
                        source: std::io::Error::new(
                            std::io::ErrorKind::NotFound,
                            "Configuration file not found",
                        ),
                    });
                }
                builder = builder.add_source_file(path);
            }
            None => {
                if let Some(path) = Self::config_exists() {
                    builder = builder.add_source_file(path);
                }
            }
        }

        Ok(builder.add_env_prefix(ENV_PREFIX))
    }

    /// Get default configuration file paths in order of preference
    fn get_default_config_paths() -> Vec<PathBuf> {
        let mut paths = vec![
            PathBuf::from("replisync.yaml"),
            PathBuf::from("replisync.yml"),
            PathBuf::from("replisync.toml"),
            PathBuf::from(".replisync.yaml"),
            PathBuf::from(".replisync.toml"),
        ];

        if let Some(config_dir) = dirs::config_dir() {
            let app_dir = config_dir.join("replisync");
            paths.push(app_dir.join("config.yaml"));
            paths.push(app_dir.join("config.yml"));
            paths.push(app_dir.join("config.toml"));
        }

        paths
    }

    /// Check if a configuration file exists in default locations
    fn config_exists() -> Option<PathBuf> {
        Self::get_default_config_paths()
            .into_iter()
            .find(|path| path.is_file())
    }
}

// Cross-platform config directory detection
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
        #[cfg(target_os = "linux")]
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
        #[cfg(not(any(target_os = "windows", target_os = "macos", target_os = "linux")))]
        {
            None
        }
    }
}
