//! Validated configuration primitives

/// Read chunk size used when streaming a file through a hash function
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "usize", into = "usize")
)]
pub struct ChunkSize(usize);

impl ChunkSize {
    /// Minimum chunk size (4KB)
    pub const MIN: usize = 4 * 1024;
    /// Maximum chunk size (16MB)
    pub const MAX: usize = 16 * 1024 * 1024;
    /// Default chunk size (64KB)
    pub const DEFAULT: usize = 64 * 1024;

    /// Create a new chunk size with validation
    pub fn new(size: usize) -> Result<Self, String> {
        if size < Self::MIN {
            Err(format!("Chunk size {} is below minimum {}", size, Self::MIN))
        } else if size > Self::MAX {
            Err(format!("Chunk size {} exceeds maximum {}", size, Self::MAX))
        } else if !size.is_power_of_two() {
            Err(format!("Chunk size {} must be a power of two", size))
        } else {
            Ok(Self(size))
        }
    }

    /// Get the chunk size value
    pub fn get(self) -> usize {
        self.0
    }
}

impl Default for ChunkSize {
    fn default() -> Self {
        Self(Self::DEFAULT)
    }
}

impl TryFrom<usize> for ChunkSize {
    type Error = String;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ChunkSize> for usize {
    fn from(value: ChunkSize) -> Self {
        value.0
    }
}
