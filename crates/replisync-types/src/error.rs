//! Error types and handling for replisync
//!
//! Errors fall into three families: I/O failures on a single file or tree,
//! structural conflicts where a path is a file on one side and a directory on
//! the other, and configuration errors that are fatal at startup.

use std::path::{Path, PathBuf};

/// Main error type for replisync operations
#[derive(thiserror::Error, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Error {
    /// I/O operation failed
    #[error("I/O error: {message}")]
    Io {
        /// Error message from the I/O operation
        message: String,
    },

    /// File not found
    #[error("File not found during {operation}: {path}")]
    FileNotFound {
        /// Path to the file that was not found
        path: PathBuf,
        /// Operation that was being performed
        operation: String,
    },

    /// Permission denied
    #[error("Permission denied during {operation}: {path}")]
    PermissionDenied {
        /// Path to the file with permission issues
        path: PathBuf,
        /// Operation that was being performed
        operation: String,
    },

    /// Same relative path is a file on one side and a directory on the other
    #[error("Structural conflict at '{path}': {message}")]
    Conflict {
        /// Relative path of the conflicting entry
        path: String,
        /// Which side holds the directory
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message describing the configuration issue
        message: String,
    },

    /// Generic error with custom message
    #[error("{message}")]
    Other {
        /// Custom error message
        message: String,
    },
}

/// Error kind for categorizing errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// I/O related errors
    Io,
    /// File/directory collisions between the two trees
    Conflict,
    /// Configuration errors
    Config,
    /// Other errors
    Other,
}

impl Error {
    /// Get the error kind
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io { .. } | Self::FileNotFound { .. } | Self::PermissionDenied { .. } => {
                ErrorKind::Io
            }
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::Config { .. } => ErrorKind::Config,
            Self::Other { .. } => ErrorKind::Other,
        }
    }

    /// Build an I/O error that keeps the path, the operation and the cause
    pub fn io_at(path: &Path, operation: &str, source: &std::io::Error) -> Self {
        match source.kind() {
            std::io::ErrorKind::NotFound => Self::FileNotFound {
                path: path.to_path_buf(),
                operation: operation.to_string(),
            },
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied {
                path: path.to_path_buf(),
                operation: operation.to_string(),
            },
            _ => Self::Io {
                message: format!("{} '{}': {}", operation, path.display(), source),
            },
        }
    }

    /// Create a new structural conflict error
    pub fn conflict<P: Into<String>, S: Into<String>>(path: P, message: S) -> Self {
        Self::Conflict {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new generic error
    pub fn other<S: Into<String>>(message: S) -> Self {
        Self::Other {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Self::Io {
            message: error.to_string(),
        }
    }
}
