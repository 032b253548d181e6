//! Recursive tree scanning into point-in-time snapshots

use crate::hasher::ContentHasher;
use replisync_types::{Digest, Error, FileSize, RelPath, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// A regular file found by a scan
///
/// The digest is computed on first request and then cached for the lifetime
/// of the snapshot; it is never computed eagerly.
#[derive(Debug)]
pub struct FileEntry {
    path: RelPath,
    absolute: PathBuf,
    size: FileSize,
    symlink: bool,
    digest: OnceCell<Digest>,
}

impl FileEntry {
    /// Create an entry with no digest computed yet
    pub fn new(path: RelPath, absolute: PathBuf, size: FileSize) -> Self {
        Self {
            path,
            absolute,
            size,
            symlink: false,
            digest: OnceCell::new(),
        }
    }

    /// Create an entry for a symbolic link that was not followed
    pub fn symlink(path: RelPath, absolute: PathBuf) -> Self {
        Self {
            symlink: true,
            ..Self::new(path, absolute, 0)
        }
    }

    /// Path relative to the snapshot root
    pub fn path(&self) -> &RelPath {
        &self.path
    }

    /// Absolute location on disk
    pub fn absolute(&self) -> &Path {
        &self.absolute
    }

    /// Size in bytes at scan time
    pub fn size(&self) -> FileSize {
        self.size
    }

    /// Whether the entry is an unfollowed symbolic link
    pub fn is_symlink(&self) -> bool {
        self.symlink
    }

    /// Digest of the file content, computing it on first use
    pub async fn digest(&self, hasher: &dyn ContentHasher) -> Result<&Digest> {
        self.digest
            .get_or_try_init(|| hasher.digest(&self.absolute))
            .await
    }

    /// Digest if it has already been computed
    pub fn cached_digest(&self) -> Option<&Digest> {
        self.digest.get()
    }
}

/// Every regular file under a root, keyed by relative path
#[derive(Debug)]
pub struct TreeSnapshot {
    root: PathBuf,
    files: BTreeMap<RelPath, FileEntry>,
    directories: BTreeSet<RelPath>,
}

impl TreeSnapshot {
    /// Snapshot with no entries
    pub fn empty(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            files: BTreeMap::new(),
            directories: BTreeSet::new(),
        }
    }

    /// Root the snapshot was taken from
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Number of files
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// True when no files were found
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Look up a file
    pub fn get(&self, path: &RelPath) -> Option<&FileEntry> {
        self.files.get(path)
    }

    /// Whether `path` is a file in this tree
    pub fn contains_file(&self, path: &RelPath) -> bool {
        self.files.contains_key(path)
    }

    /// Whether `path` is a directory in this tree
    pub fn contains_dir(&self, path: &RelPath) -> bool {
        self.directories.contains(path)
    }

    /// Files in path order
    pub fn files(&self) -> impl Iterator<Item = &FileEntry> {
        self.files.values()
    }

    /// Directories in path order, including empty ones
    pub fn directories(&self) -> impl Iterator<Item = &RelPath> {
        self.directories.iter()
    }

    /// Sum of all file sizes
    pub fn total_bytes(&self) -> FileSize {
        self.files.values().map(FileEntry::size).sum()
    }

    /// Add a file entry
    pub fn insert_file(&mut self, entry: FileEntry) {
        self.files.insert(entry.path.clone(), entry);
    }

    /// Record a directory
    pub fn insert_dir(&mut self, path: RelPath) {
        self.directories.insert(path);
    }
}

/// Walks a directory tree into a [`TreeSnapshot`]
///
/// By default symbolic links are followed: links to files are recorded as
/// files and links to directories are descended. With link following off,
/// every link is recorded as a [`FileEntry::symlink`] and never resolved,
/// which is how the replica is scanned so a pass cannot write through a link.
/// Sockets, devices, FIFOs and dangling links are skipped. Any unreadable
/// directory fails the whole scan, since a partial snapshot of the source
/// would look like deletions.
#[derive(Debug, Clone, Copy)]
pub struct TreeScanner {
    follow_links: bool,
}

impl TreeScanner {
    /// Create a scanner that follows symbolic links
    pub fn new() -> Self {
        Self { follow_links: true }
    }

    /// Set whether symbolic links are followed
    pub fn follow_links(mut self, follow_links: bool) -> Self {
        self.follow_links = follow_links;
        self
    }

    /// Scan `root` on the blocking thread pool
    pub async fn scan(&self, root: &Path) -> Result<TreeSnapshot> {
        let scanner = *self;
        let root = root.to_path_buf();
        let snapshot = tokio::task::spawn_blocking(move || scanner.scan_blocking(&root))
            .await
            .map_err(|e| Error::other(format!("Scan task failed: {}", e)))??;

        info!(
            "Scanned {} files ({} bytes) in '{}'",
            snapshot.len(),
            snapshot.total_bytes(),
            snapshot.root().display()
        );
        Ok(snapshot)
    }

    /// Scan `root` on the current thread
    pub fn scan_blocking(&self, root: &Path) -> Result<TreeSnapshot> {
        let metadata = std::fs::metadata(root).map_err(|e| Error::io_at(root, "scan", &e))?;
        if !metadata.is_dir() {
            return Err(Error::Io {
                message: format!("scan '{}': not a directory", root.display()),
            });
        }

        let mut snapshot = TreeSnapshot::empty(root);

        for entry in WalkDir::new(root).follow_links(self.follow_links).min_depth(1) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    if err.loop_ancestor().is_some() {
                        warn!("Skipping symlink loop: {}", err);
                        continue;
                    }
                    if is_dangling_link(&err) {
                        debug!("Skipping dangling symlink: {}", err);
                        continue;
                    }
                    let path = err.path().unwrap_or(root).to_path_buf();
                    return Err(match err.into_io_error() {
                        Some(io) => Error::io_at(&path, "scan", &io),
                        None => Error::Io {
                            message: format!("scan '{}': walk failed", path.display()),
                        },
                    });
                }
            };

            let relative = entry
                .path()
                .strip_prefix(root)
                .map_err(|e| Error::other(format!("Entry outside scan root: {}", e)))?;
            let rel_path = RelPath::from_path(relative);
            let file_type = entry.file_type();

            if file_type.is_symlink() {
                debug!("Recording unfollowed symlink: {}", entry.path().display());
                snapshot.insert_file(FileEntry::symlink(rel_path, entry.path().to_path_buf()));
            } else if file_type.is_dir() {
                snapshot.insert_dir(rel_path);
            } else if file_type.is_file() {
                let metadata = entry
                    .metadata()
                    .map_err(|e| Error::Io {
                        message: format!("scan '{}': {}", entry.path().display(), e),
                    })?;
                snapshot.insert_file(FileEntry::new(
                    rel_path,
                    entry.path().to_path_buf(),
                    metadata.len(),
                ));
            } else {
                debug!("Skipping special file: {}", entry.path().display());
            }
        }

        Ok(snapshot)
    }
}

impl Default for TreeScanner {
    fn default() -> Self {
        Self::new()
    }
}

fn is_dangling_link(err: &walkdir::Error) -> bool {
    let not_found = err
        .io_error()
        .is_some_and(|io| io.kind() == std::io::ErrorKind::NotFound);
    let is_link = err
        .path()
        .and_then(|path| std::fs::symlink_metadata(path).ok())
        .is_some_and(|meta| meta.file_type().is_symlink());
    not_found && is_link
}
