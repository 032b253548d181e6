//! Configuration builder for layered configuration loading

use crate::{Config, ConfigError, ConfigResult};
use config::{ConfigBuilder as ConfigBuilderInner, Environment, File, FileFormat, Value};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Separator between the prefix, section and key of an environment variable
const ENV_SEPARATOR: &str = "__";

/// Configuration builder for loading configuration from multiple sources
///
/// Sources apply in the order they were added; explicit overrides always
/// win over every other source.
#[derive(Debug)]
pub struct ConfigBuilder {
    inner: ConfigBuilderInner<config::builder::DefaultState>,
    sources: Vec<ConfigSource>,
    overrides: Vec<(String, Value)>,
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
            inner: config::Config::builder(),
            sources: Vec::new(),
            overrides: Vec::new(),
        }
    }

    /// Add default configuration values
    pub fn add_defaults(mut self) -> Self {
        self.sources.push(ConfigSource::Defaults);
        self
    }

    /// Add a configuration file source
    ///
    /// Missing files are skipped; use [`crate::ConfigLoader::builder`]
    /// when the file is mandatory.
    pub fn add_source_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let format = Self::detect_format(&path);
        self.sources.push(ConfigSource::File { path, format });
        self
    }

    /// Add environment variable source with prefix
    ///
    /// Variables are named `<PREFIX>__<SECTION>__<KEY>`, for example
    /// `REPLISYNC__SCHEDULE__INTERVAL_MINUTES`.
    pub fn add_env_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.sources.push(ConfigSource::Environment {
            prefix: prefix.into(),
        });
        self
    }

    /// Force a value for `key` (dotted, e.g. `schedule.interval_minutes`)
    pub fn set_override<K: Into<String>, V: Into<Value>>(mut self, key: K, value: V) -> Self {
        self.overrides.push((key.into(), value.into()));
        self
    }

    /// Build the configuration
    pub fn build(mut self) -> ConfigResult<Config> {
        // Defaults are always the base layer
        let defaults = Config::default();
        let defaults_value = serde_yaml::to_value(&defaults)
            .map_err(|e| ConfigError::other(format!("Failed to serialize defaults: {}", e)))?;
        self.inner = self
            .inner
            .add_source(config::Config::try_from(&defaults_value)?);

        for source in &self.sources {
            match source {
                ConfigSource::File { path, format } => {
                    if path.exists() {
                        debug!("Loading configuration from {}", path.display());
                        self.inner = self
                            .inner
                            .add_source(File::from(path.clone()).format(*format));
                    }
                }
                ConfigSource::Environment { prefix } => {
                    self.inner = self.inner.add_source(
                        Environment::with_prefix(prefix)
                            .separator(ENV_SEPARATOR)
                            .try_parsing(true),
                    );
                }
                ConfigSource::Defaults => {
                    // Already handled above
                }
            }
        }

        for (key, value) in self.overrides {
            self.inner = self.inner.set_override(key, value)?;
        }

        let config = self.inner.build()?;
        let result: Config = config.try_deserialize()?;

        Self::validate(&result)?;

        Ok(result)
    }

    /// Detect file format from extension
    fn detect_format(path: &Path) -> FileFormat {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml") | Some("yml") => FileFormat::Yaml,
            Some("toml") => FileFormat::Toml,
            Some("json") => FileFormat::Json,
            _ => FileFormat::Yaml, // Default to YAML
        }
    }

    /// Validate the configuration
    fn validate(config: &Config) -> ConfigResult<()> {
        if config.schedule.interval_minutes == 0 {
            return Err(ConfigError::invalid_value(
                "schedule.interval_minutes",
                "interval must be a positive number of minutes",
            ));
        }

        if !["trace", "debug", "info", "warn", "error"].contains(&config.logging.level.as_str()) {
            return Err(ConfigError::validation(
                "Log level must be one of: trace, debug, info, warn, error",
            ));
        }

        if let Some(log_file) = &config.logging.log_file {
            if log_file.is_dir() {
                return Err(ConfigError::invalid_value(
                    "logging.log_file".to_string(),
                    format!("'{}' is a directory", log_file.display()),
                ));
            }
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
    use replisync_types::HashAlgorithm;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_builder_defaults() {
        let config = ConfigBuilder::new().add_defaults().build().unwrap();
        assert_eq!(config.sync.hash_algorithm, HashAlgorithm::Md5);
        assert_eq!(config.schedule.interval_minutes, 1);
    }

    #[test]
    fn test_builder_yaml_file() {
        let mut temp_file = NamedTempFile::with_suffix(".yaml").unwrap();
        writeln!(
            temp_file,
            r#"
sync:
  hash_algorithm: sha256
  chunk_size: 131072
schedule:
  interval_minutes: 15
"#
        )
        .unwrap();

        let config = ConfigBuilder::new()
            .add_defaults()
            .add_source_file(temp_file.path())
            .build()
            .unwrap();

        assert_eq!(config.sync.hash_algorithm, HashAlgorithm::Sha256);
        assert_eq!(config.sync.chunk_size.get(), 131_072);
        assert_eq!(config.schedule.interval_minutes, 15);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_builder_toml_file() {
        let mut temp_file = NamedTempFile::with_suffix(".toml").unwrap();
        writeln!(
            temp_file,
            r#"
[sync]
hash_algorithm = "blake3"

[logging]
level = "debug"
"#
        )
        .unwrap();

        let config = ConfigBuilder::new()
            .add_defaults()
            .add_source_file(temp_file.path())
            .build()
            .unwrap();

        assert_eq!(config.sync.hash_algorithm, HashAlgorithm::Blake3);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_overrides_win_over_file() {
        let mut temp_file = NamedTempFile::with_suffix(".yaml").unwrap();
        writeln!(temp_file, "schedule:\n  interval_minutes: 30\n").unwrap();

        let config = ConfigBuilder::new()
            .add_defaults()
            .add_source_file(temp_file.path())
            .set_override("schedule.interval_minutes", 5_i64)
            .set_override("sync.hash_algorithm", "xxh3")
            .build()
            .unwrap();

        assert_eq!(config.schedule.interval_minutes, 5);
        assert_eq!(config.sync.hash_algorithm, HashAlgorithm::Xxh3);
    }

    #[test]
    fn test_zero_interval_rejected() {
        let result = ConfigBuilder::new()
            .add_defaults()
            .set_override("schedule.interval_minutes", 0_i64)
            .build();

        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("interval must be a positive number of minutes"));
    }

    #[test]
    fn test_bad_chunk_size_rejected() {
        let result = ConfigBuilder::new()
            .add_defaults()
            .set_override("sync.chunk_size", 1000_i64)
            .build();

        assert!(result.is_err());
    }

    #[test]
    fn test_bad_log_level_rejected() {
        let result = ConfigBuilder::new()
            .add_defaults()
            .set_override("logging.level", "loud")
            .build();

        assert!(result.unwrap_err().to_string().contains("Log level"));
    }

    #[test]
    fn test_environment_layer_between_file_and_overrides() {
        // Unique prefix so no other test sees these variables
        std::env::set_var("REPLISYNC_LAYERTEST__SCHEDULE__INTERVAL_MINUTES", "9");
        std::env::set_var("REPLISYNC_LAYERTEST__SYNC__HASH_ALGORITHM", "blake3");
        std::env::set_var("REPLISYNC_LAYERTEST__LOGGING__LEVEL", "warn");

        let mut temp_file = NamedTempFile::with_suffix(".yaml").unwrap();
        writeln!(
            temp_file,
            "schedule:\n  interval_minutes: 30\nlogging:\n  level: debug\n"
        )
        .unwrap();

        let config = ConfigBuilder::new()
            .add_defaults()
            .add_source_file(temp_file.path())
            .add_env_prefix("REPLISYNC_LAYERTEST")
            .set_override("logging.level", "error")
            .build()
            .unwrap();

        assert_eq!(config.schedule.interval_minutes, 9);
        assert_eq!(config.sync.hash_algorithm, HashAlgorithm::Blake3);
        assert_eq!(config.logging.level, "error");
    }
}
