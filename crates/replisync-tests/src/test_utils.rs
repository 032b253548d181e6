//! Unified test utilities for replisync integration tests

use async_trait::async_trait;
use replisync_sync::{ContentHasher, FileHasher, LocalReplicaOps, ReplicaOps, SyncEngine};
use replisync_types::{Digest, Error, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use walkdir::WalkDir;

/// Test data generation patterns
#[derive(Debug, Clone, Copy)]
pub enum TestDataPattern {
    /// All zeros
    Zeros,
    /// Deterministic pseudo-random bytes
    Random,
    /// Structured bytes similar to real files
    Realistic,
}

/// Generate test data with the specified pattern
pub fn generate_test_data(size: usize, pattern: TestDataPattern) -> Vec<u8> {
    match pattern {
        TestDataPattern::Zeros => vec![0u8; size],
        TestDataPattern::Random => {
            use std::collections::hash_map::DefaultHasher;
            use std::hash::{Hash, Hasher};

            // Deterministic so failures reproduce
            let mut data = Vec::with_capacity(size);
            let mut hasher = DefaultHasher::new();
            for i in 0..size {
                i.hash(&mut hasher);
                data.push((hasher.finish() % 256) as u8);
            }
            data
        }
        TestDataPattern::Realistic => (0..size).map(|i| ((i * 7 + 13) % 256) as u8).collect(),
    }
}

/// Write `content` at `rel` under `root`, creating parent directories
pub fn write_file(root: &Path, rel: &str, content: &[u8]) -> PathBuf {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("Failed to create parent directories");
    }
    fs::write(&path, content).expect("Failed to write test file");
    path
}

/// Every regular file under `root`, keyed by its path relative to `root`
///
/// Links are not followed, so a link in a tree never counts as a file.
pub fn tree_contents(root: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
    WalkDir::new(root)
        .min_depth(1)
        .into_iter()
        .map(|entry| entry.expect("Failed to walk tree"))
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| {
            let rel = entry
                .path()
                .strip_prefix(root)
                .expect("Entry outside root")
                .to_path_buf();
            let content = fs::read(entry.path()).expect("Failed to read file");
            (rel, content)
        })
        .collect()
}

/// A source tree and a replica tree in separate temporary directories
pub struct MirrorFixture {
    source: TempDir,
    replica: TempDir,
}

impl MirrorFixture {
    /// Create two empty trees
    pub fn new() -> Self {
        Self {
            source: TempDir::new().expect("Failed to create source dir"),
            replica: TempDir::new().expect("Failed to create replica dir"),
        }
    }

    /// Source root
    pub fn source(&self) -> &Path {
        self.source.path()
    }

    /// Replica root
    pub fn replica(&self) -> &Path {
        self.replica.path()
    }

    /// Write a file into the source tree
    pub fn write_source(&self, rel: &str, content: &[u8]) -> PathBuf {
        write_file(self.source(), rel, content)
    }

    /// Write a file into the replica tree
    pub fn write_replica(&self, rel: &str, content: &[u8]) -> PathBuf {
        write_file(self.replica(), rel, content)
    }

    /// Content of a replica file, if it exists
    pub fn read_replica(&self, rel: &str) -> Option<Vec<u8>> {
        fs::read(self.replica().join(rel)).ok()
    }

    /// Whether the replica holds exactly the source's files and contents
    pub fn is_mirrored(&self) -> bool {
        tree_contents(self.source()) == tree_contents(self.replica())
    }

    /// Run one pass with `engine`
    pub async fn reconcile(&self, engine: &SyncEngine) -> replisync_sync::PassReport {
        engine
            .reconcile(self.source(), self.replica())
            .await
            .expect("Pass failed")
    }
}

impl Default for MirrorFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Hasher that counts how many files it digested
#[derive(Debug, Default)]
pub struct CountingHasher {
    inner: FileHasher,
    calls: AtomicUsize,
    hashed: Mutex<BTreeSet<PathBuf>>,
}

impl CountingHasher {
    /// Wrap the default file hasher
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of digests computed
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Whether a file whose path ends with `name` was digested
    pub fn hashed(&self, name: &str) -> bool {
        self.hashed
            .lock()
            .expect("Hasher lock poisoned")
            .iter()
            .any(|path| path.ends_with(name))
    }
}

#[async_trait]
impl ContentHasher for CountingHasher {
    async fn digest(&self, path: &Path) -> Result<Digest> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.hashed
            .lock()
            .expect("Hasher lock poisoned")
            .insert(path.to_path_buf());
        self.inner.digest(path).await
    }

    fn name(&self) -> &str {
        "counting"
    }
}

/// Replica operations that fail for selected file names
#[derive(Debug, Default)]
pub struct FailingOps {
    fail_copy: BTreeSet<String>,
    fail_remove: BTreeSet<String>,
    calls: Mutex<Vec<String>>,
}

impl FailingOps {
    /// No failures configured
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every copy whose destination ends with `name`
    pub fn fail_copy(mut self, name: &str) -> Self {
        self.fail_copy.insert(name.to_string());
        self
    }

    /// Fail every removal of a path ending with `name`
    pub fn fail_remove(mut self, name: &str) -> Self {
        self.fail_remove.insert(name.to_string());
        self
    }

    /// Operations performed so far, as `"copy <path>"` or `"remove <path>"`
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("Ops lock poisoned").clone()
    }

    fn log(&self, operation: &str, path: &Path) {
        self.calls
            .lock()
            .expect("Ops lock poisoned")
            .push(format!("{} {}", operation, path.display()));
    }

    fn matches(names: &BTreeSet<String>, path: &Path) -> bool {
        names.iter().any(|name| path.ends_with(name))
    }
}

#[async_trait]
impl ReplicaOps for FailingOps {
    async fn copy_file(&self, source: &Path, destination: &Path) -> Result<u64> {
        self.log("copy", destination);
        if Self::matches(&self.fail_copy, destination) {
            return Err(Error::other(format!(
                "injected copy failure for {}",
                destination.display()
            )));
        }
        LocalReplicaOps.copy_file(source, destination).await
    }

    async fn remove_file(&self, path: &Path) -> Result<()> {
        self.log("remove", path);
        if Self::matches(&self.fail_remove, path) {
            return Err(Error::other(format!(
                "injected remove failure for {}",
                path.display()
            )));
        }
        LocalReplicaOps.remove_file(path).await
    }

    async fn create_dir_all(&self, path: &Path) -> Result<()> {
        LocalReplicaOps.create_dir_all(path).await
    }
}

/// Engine with the default hasher, operations and sink
pub fn default_engine() -> SyncEngine {
    SyncEngine::new(Arc::new(FileHasher::default()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_test_data_is_deterministic() {
        let a = generate_test_data(1024, TestDataPattern::Random);
        let b = generate_test_data(1024, TestDataPattern::Random);
        assert_eq!(a, b);
        assert_eq!(generate_test_data(16, TestDataPattern::Zeros), vec![0u8; 16]);
    }

    #[test]
    fn test_tree_contents_uses_relative_paths() {
        let fixture = MirrorFixture::new();
        fixture.write_source("a/b/c.txt", b"abc");
        fixture.write_source("top.txt", b"top");

        let contents = tree_contents(fixture.source());
        let keys: Vec<_> = contents.keys().cloned().collect();
        assert_eq!(keys, vec![PathBuf::from("a/b/c.txt"), PathBuf::from("top.txt")]);
        assert!(!fixture.is_mirrored());
    }
}
