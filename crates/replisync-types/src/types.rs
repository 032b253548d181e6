//! Core data types for replisync
//!
//! Relative paths, content digests and per-pass statistics.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

/// File size in bytes
pub type FileSize = u64;

/// Path of a file relative to its tree root
///
/// Stored as native path components, so names that are not valid UTF-8 keep
/// their exact bytes and two distinct names never share a key. Displayed
/// `/`-separated on every platform.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RelPath(PathBuf);

impl RelPath {
    /// Build a relative path from a filesystem path relative to a root
    ///
    /// `.` components are dropped; roots and prefixes never appear in a
    /// path produced by stripping a tree root, and are ignored as well.
    pub fn from_path(path: &Path) -> Self {
        Self(
            path.components()
                .filter(|component| matches!(component, Component::Normal(_) | Component::ParentDir))
                .collect(),
        )
    }

    /// The native relative path
    pub fn as_path(&self) -> &Path {
        &self.0
    }

    /// Resolve this path under a tree root
    pub fn under(&self, root: &Path) -> PathBuf {
        root.join(&self.0)
    }

    /// Every proper ancestor, nearest first (`a/b/c` yields `a/b`, then `a`)
    pub fn ancestors(&self) -> impl Iterator<Item = RelPath> + '_ {
        self.0
            .ancestors()
            .skip(1)
            .take_while(|ancestor| !ancestor.as_os_str().is_empty())
            .map(|ancestor| RelPath(ancestor.to_path_buf()))
    }
}

impl From<&str> for RelPath {
    fn from(value: &str) -> Self {
        Self::from_path(Path::new(value))
    }
}

impl fmt::Display for RelPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, component) in self.0.components().enumerate() {
            if index > 0 {
                f.write_str("/")?;
            }
            f.write_str(&component.as_os_str().to_string_lossy())?;
        }
        Ok(())
    }
}

/// Fixed-size output of a hash function over a file's content
///
/// Two files are content-equal iff their digests are bit-identical.
#[derive(Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Digest(Vec<u8>);

impl Digest {
    /// Wrap raw digest bytes
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Raw digest bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Digest width in bits
    pub fn bits(&self) -> usize {
        self.0.len() * 8
    }

    /// Lowercase hexadecimal rendering
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self.to_hex())
    }
}

/// Hash algorithm used to decide content equality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum HashAlgorithm {
    /// MD5, 128-bit
    #[default]
    Md5,
    /// SHA-256, 256-bit
    Sha256,
    /// BLAKE3, 256-bit
    Blake3,
    /// XXH3, 128-bit, non-cryptographic
    Xxh3,
}

impl HashAlgorithm {
    /// All supported algorithms
    pub const ALL: [HashAlgorithm; 4] = [Self::Md5, Self::Sha256, Self::Blake3, Self::Xxh3];

    /// Canonical lowercase name
    pub fn name(self) -> &'static str {
        match self {
            Self::Md5 => "md5",
            Self::Sha256 => "sha256",
            Self::Blake3 => "blake3",
            Self::Xxh3 => "xxh3",
        }
    }

    /// Digest width in bits
    pub fn digest_bits(self) -> usize {
        match self {
            Self::Md5 | Self::Xxh3 => 128,
            Self::Sha256 | Self::Blake3 => 256,
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for HashAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "").as_str() {
            "md5" => Ok(Self::Md5),
            "sha256" => Ok(Self::Sha256),
            "blake3" => Ok(Self::Blake3),
            "xxh3" | "xxh3128" => Ok(Self::Xxh3),
            other => Err(format!(
                "Unknown hash algorithm '{}' (expected one of: md5, sha256, blake3, xxh3)",
                other
            )),
        }
    }
}

/// Counters for a single reconciliation pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PassStats {
    /// Files copied into the replica for the first time
    pub created: u64,
    /// Replica files overwritten with new source content
    pub updated: u64,
    /// Replica files removed
    pub deleted: u64,
    /// Files present in both trees with equal digests
    pub unchanged: u64,
    /// Error events emitted
    pub errors: u64,
    /// Total bytes written into the replica
    pub bytes_copied: u64,
    /// Wall-clock duration of the pass
    pub duration: Duration,
}

impl PassStats {
    /// Create a new empty statistics instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of replica mutations performed
    pub fn mutations(&self) -> u64 {
        self.created + self.updated + self.deleted
    }

    /// True when the pass emitted no error events
    pub fn is_clean(&self) -> bool {
        self.errors == 0
    }
}
