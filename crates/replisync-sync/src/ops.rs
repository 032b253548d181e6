//! Side effects applied to the replica tree

use async_trait::async_trait;
use replisync_types::{Error, Result};
use std::fmt;
use std::path::Path;
use tokio::fs;
use tracing::debug;

/// File operations the reconciler performs on the replica
///
/// Every mutation of the replica goes through this trait, so an alternative
/// implementation can fail selected paths or record calls.
#[async_trait]
pub trait ReplicaOps: Send + Sync + fmt::Debug {
    /// Copy `source` over `destination`, replacing any existing content
    ///
    /// A symbolic link at `destination` is replaced by a regular file; its
    /// target is left untouched. Returns the number of bytes copied.
    async fn copy_file(&self, source: &Path, destination: &Path) -> Result<u64>;

    /// Remove the file at `path`
    async fn remove_file(&self, path: &Path) -> Result<()>;

    /// Create `path` and any missing parents
    async fn create_dir_all(&self, path: &Path) -> Result<()>;
}

/// [`ReplicaOps`] on the local file system
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalReplicaOps;

#[async_trait]
impl ReplicaOps for LocalReplicaOps {
    async fn copy_file(&self, source: &Path, destination: &Path) -> Result<u64> {
        // Never write through a link: replace the link itself.
        let is_link = fs::symlink_metadata(destination)
            .await
            .is_ok_and(|meta| meta.file_type().is_symlink());
        if is_link {
            fs::remove_file(destination)
                .await
                .map_err(|e| Error::io_at(destination, "replace symlink", &e))?;
            debug!("Removed symlink {} before copying", destination.display());
        }

        // A full copy rewrites the content in place and refreshes mtime.
        let bytes = fs::copy(source, destination)
            .await
            .map_err(|e| Error::io_at(destination, "copy", &e))?;
        debug!(
            "Copied {} -> {} ({} bytes)",
            source.display(),
            destination.display(),
            bytes
        );
        Ok(bytes)
    }

    async fn remove_file(&self, path: &Path) -> Result<()> {
        fs::remove_file(path)
            .await
            .map_err(|e| Error::io_at(path, "remove", &e))?;
        debug!("Removed {}", path.display());
        Ok(())
    }

    async fn create_dir_all(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path)
            .await
            .map_err(|e| Error::io_at(path, "create directory", &e))?;
        debug!("Created directory {}", path.display());
        Ok(())
    }
}
