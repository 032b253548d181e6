//! Startup validation of the source and replica roots

use crate::{ConfigError, ConfigResult};
use std::path::{Path, PathBuf};
use tracing::info;

/// A validated, canonical source/replica pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncRoots {
    /// Authoritative tree, read-only to replisync
    pub source: PathBuf,
    /// Tree kept identical to the source
    pub replica: PathBuf,
}

impl SyncRoots {
    /// Validate both roots, creating the replica directory when missing
    ///
    /// Fails when the source is not an existing directory, when the replica
    /// exists but is not a directory, or when one root contains the other.
    pub fn prepare<P: AsRef<Path>, Q: AsRef<Path>>(source: P, replica: Q) -> ConfigResult<Self> {
        let source = source.as_ref();
        let replica = replica.as_ref();

        if !source.exists() {
            return Err(ConfigError::invalid_value(
                "source".to_string(),
                format!("'{}' does not exist", source.display()),
            ));
        }
        if !source.is_dir() {
            return Err(ConfigError::invalid_value(
                "source".to_string(),
                format!("'{}' is not a directory", source.display()),
            ));
        }

        if replica.exists() {
            if !replica.is_dir() {
                return Err(ConfigError::invalid_value(
                    "replica".to_string(),
                    format!("'{}' is not a directory", replica.display()),
                ));
            }
        } else {
            std::fs::create_dir_all(replica).map_err(|e| ConfigError::Io {
                path: replica.to_path_buf(),
                source: e,
            })?;
            info!("Created replica directory {}", replica.display());
        }

        let source = canonical(source)?;
        let replica = canonical(replica)?;

        if source == replica {
            return Err(ConfigError::validation(
                "source and replica must be different directories",
            ));
        }
        if replica.starts_with(&source) {
            return Err(ConfigError::validation(format!(
                "replica '{}' must not be inside source '{}'",
                replica.display(),
                source.display()
            )));
        }
        if source.starts_with(&replica) {
            return Err(ConfigError::validation(format!(
                "source '{}' must not be inside replica '{}'",
                source.display(),
                replica.display()
            )));
        }

        Ok(Self { source, replica })
    }
}

fn canonical(path: &Path) -> ConfigResult<PathBuf> {
    path.canonicalize().map_err(|e| ConfigError::Io {
        path: path.to_path_buf(),
        source: e,
    })
}
