//! Streaming content digests
//!
//! Files are read in fixed-size chunks and folded into a running hash, so
//! memory use does not depend on file size. The algorithm is pluggable: the
//! reconciler only sees the [`ContentHasher`] trait.

use async_trait::async_trait;
use replisync_config::SyncConfig;
use replisync_types::{ChunkSize, Digest, Error, HashAlgorithm, Result};
use sha2::Digest as _;
use std::fmt;
use std::path::Path;
use tokio::fs::File;
use tokio::io::AsyncReadExt;
use tracing::trace;

/// Capability to produce a fixed-size digest of a file's content
#[async_trait]
pub trait ContentHasher: Send + Sync + fmt::Debug {
    /// Digest the file at `path`
    ///
    /// Fails when the file cannot be opened or a read fails mid-stream.
    async fn digest(&self, path: &Path) -> Result<Digest>;

    /// Name used in log output
    fn name(&self) -> &str;
}

/// Running hash state fed one chunk at a time
pub trait StreamDigest: Send {
    /// Fold a chunk into the state
    fn update(&mut self, chunk: &[u8]);

    /// Consume the state and produce the digest
    fn finish(self: Box<Self>) -> Digest;
}

struct Md5State(md5::Md5);
struct Sha256State(sha2::Sha256);
struct Blake3State(blake3::Hasher);
struct Xxh3State(xxhash_rust::xxh3::Xxh3);

impl StreamDigest for Md5State {
    fn update(&mut self, chunk: &[u8]) {
        self.0.update(chunk);
    }

    fn finish(self: Box<Self>) -> Digest {
        Digest::new(self.0.finalize().to_vec())
    }
}

impl StreamDigest for Sha256State {
    fn update(&mut self, chunk: &[u8]) {
        self.0.update(chunk);
    }

    fn finish(self: Box<Self>) -> Digest {
        Digest::new(self.0.finalize().to_vec())
    }
}

impl StreamDigest for Blake3State {
    fn update(&mut self, chunk: &[u8]) {
        self.0.update(chunk);
    }

    fn finish(self: Box<Self>) -> Digest {
        Digest::new(self.0.finalize().as_bytes().to_vec())
    }
}

impl StreamDigest for Xxh3State {
    fn update(&mut self, chunk: &[u8]) {
        self.0.update(chunk);
    }

    fn finish(self: Box<Self>) -> Digest {
        Digest::new(self.0.digest128().to_be_bytes().to_vec())
    }
}

/// Fresh running state for `algorithm`
pub fn new_stream(algorithm: HashAlgorithm) -> Box<dyn StreamDigest> {
    match algorithm {
        HashAlgorithm::Md5 => Box::new(Md5State(md5::Md5::new())),
        HashAlgorithm::Sha256 => Box::new(Sha256State(sha2::Sha256::new())),
        HashAlgorithm::Blake3 => Box::new(Blake3State(blake3::Hasher::new())),
        HashAlgorithm::Xxh3 => Box::new(Xxh3State(xxhash_rust::xxh3::Xxh3::new())),
    }
}

/// Digest an in-memory buffer
pub fn digest_bytes(algorithm: HashAlgorithm, data: &[u8]) -> Digest {
    let mut state = new_stream(algorithm);
    state.update(data);
    state.finish()
}

/// Chunked file hasher backed by one of the built-in algorithms
#[derive(Debug, Clone, Copy)]
pub struct FileHasher {
    algorithm: HashAlgorithm,
    chunk_size: ChunkSize,
}

impl FileHasher {
    /// Create a hasher with the default chunk size
    pub fn new(algorithm: HashAlgorithm) -> Self {
        Self {
            algorithm,
            chunk_size: ChunkSize::default(),
        }
    }

    /// Create a hasher from the sync configuration section
    pub fn from_config(config: &SyncConfig) -> Self {
        Self::new(config.hash_algorithm).with_chunk_size(config.chunk_size)
    }

    /// Override the read chunk size
    pub fn with_chunk_size(mut self, chunk_size: ChunkSize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Algorithm in use
    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }
}

impl Default for FileHasher {
    fn default() -> Self {
        Self::new(HashAlgorithm::default())
    }
}

#[async_trait]
impl ContentHasher for FileHasher {
    async fn digest(&self, path: &Path) -> Result<Digest> {
        let mut file = File::open(path)
            .await
            .map_err(|e| Error::io_at(path, "open for hashing", &e))?;

        let mut state = new_stream(self.algorithm);
        let mut buffer = vec![0u8; self.chunk_size.get()];
        let mut total = 0u64;

        loop {
            let read = file
                .read(&mut buffer)
                .await
                .map_err(|e| Error::io_at(path, "read for hashing", &e))?;
            if read == 0 {
                break;
            }
            state.update(&buffer[..read]);
            total += read as u64;
        }

        let digest = state.finish();
        trace!(
            "{} {} ({} bytes): {}",
            self.algorithm,
            path.display(),
            total,
            digest
        );
        Ok(digest)
    }

    fn name(&self) -> &str {
        self.algorithm.name()
    }
}
