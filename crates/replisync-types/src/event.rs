//! Structured records of what a reconciliation pass did

use crate::{Error, RelPath};
use chrono::{DateTime, Local};
use std::fmt;

/// Kind of observable action or failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EventKind {
    /// File copied into the replica for the first time
    Created,
    /// Detail of a multi-step create (parent directories were made first)
    Copied,
    /// Replica file overwritten with new source content
    Updated,
    /// Replica file removed because it no longer exists in the source
    Deleted,
    /// Any per-path failure
    Error,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Created => "created",
            Self::Copied => "copied",
            Self::Updated => "updated",
            Self::Deleted => "deleted",
            Self::Error => "error",
        };
        f.write_str(label)
    }
}

/// One observable action or failure during a pass
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SyncEvent {
    /// When the event was recorded
    pub timestamp: DateTime<Local>,
    /// What happened
    pub kind: EventKind,
    /// Relative path the event concerns
    pub path: RelPath,
    /// Free-form detail, such as an error message or a byte count
    pub detail: Option<String>,
}

impl SyncEvent {
    /// Create an event stamped with the current local time
    pub fn new(kind: EventKind, path: RelPath) -> Self {
        Self {
            timestamp: Local::now(),
            kind,
            path,
            detail: None,
        }
    }

    /// Attach a detail message
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Build an `Error` event from a failure on `path`
    pub fn error(path: RelPath, error: &Error) -> Self {
        Self::new(EventKind::Error, path).with_detail(error.to_string())
    }

    /// Whether this is an `Error` event
    pub fn is_error(&self) -> bool {
        self.kind == EventKind::Error
    }
}

impl fmt::Display for SyncEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.path)?;
        if let Some(detail) = &self.detail {
            write!(f, " ({})", detail)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_display() {
        let event = SyncEvent::new(EventKind::Created, RelPath::from("a.txt")).with_detail("5 bytes");
        assert_eq!(event.to_string(), "created: a.txt (5 bytes)");

        let bare = SyncEvent::new(EventKind::Deleted, RelPath::from("b.txt"));
        assert_eq!(bare.to_string(), "deleted: b.txt");
    }

    #[test]
    fn test_error_event_carries_message() {
        let error = Error::conflict("photos", "directory in replica");
        let event = SyncEvent::error(RelPath::from("photos"), &error);

        assert!(event.is_error());
        assert!(event.detail.as_deref().unwrap_or_default().contains("directory in replica"));
    }
}
