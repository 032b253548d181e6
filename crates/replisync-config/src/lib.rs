//! Configuration management system for replisync
//!
//! Configuration is layered: built-in defaults, then an optional YAML/TOML/JSON
//! file, then `REPLISYNC__SECTION__KEY` environment variables, then explicit
//! overrides (typically from the command line). The result is validated once;
//! any failure here is fatal at startup.
//!
//! # Examples
//!
//! ```rust,no_run
//! use replisync_config::ConfigBuilder;
//!
//! let config = ConfigBuilder::new()
//!     .add_defaults()
//!     .add_source_file("replisync.yaml")
//!     .add_env_prefix("REPLISYNC")
//!     .build()
//!     .expect("Failed to load configuration");
//!
//! println!("Pass every {} minute(s)", config.schedule.interval_minutes);
//! ```

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

use replisync_types::{ChunkSize, HashAlgorithm};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub mod builder;
pub mod error;
pub mod loader;
pub mod roots;

pub use builder::ConfigBuilder;
pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;
pub use roots::SyncRoots;

/// Main configuration structure for replisync
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Reconciliation settings
    pub sync: SyncConfig,
    /// Pass scheduling
    pub schedule: ScheduleConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Reconciliation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Algorithm used to compare file contents
    #[serde(default)]
    pub hash_algorithm: HashAlgorithm,
    /// Read size when streaming a file into the hasher
    #[serde(default)]
    pub chunk_size: ChunkSize,
    /// Plan and log actions without touching the replica
    #[serde(default)]
    pub dry_run: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            hash_algorithm: HashAlgorithm::Md5,
            chunk_size: ChunkSize::default(),
            dry_run: false,
        }
    }
}

/// Pass scheduling
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Minutes to sleep between the end of one pass and the start of the next
    pub interval_minutes: u64,
}

impl ScheduleConfig {
    /// Sleep interval as a duration
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_minutes.saturating_mul(60))
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            interval_minutes: 1,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    pub level: String,
    /// Log file path; events are written here as well as to the console
    pub log_file: Option<PathBuf>,
    /// Mirror log lines to the console
    pub console: bool,
    /// Enable colored console output
    pub colored_output: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_file: None,
            console: true,
            colored_output: true,
        }
    }
}
