//! Core type system and error handling for replisync
//!
//! This crate provides the foundational types shared by every replisync crate:
//!
//! - **Error handling**: Structured error type with kinds
//! - **Paths and digests**: Platform-independent relative paths and content digests
//! - **Events**: The `SyncEvent` records a reconciliation pass emits
//! - **Configuration primitives**: Validated newtypes such as [`ChunkSize`]
//!
//! # Features
//!
//! - `serde`: Enable serialization support
//!
//! # Examples
//!
//! ```rust
//! use replisync_types::{EventKind, RelPath, SyncEvent};
//!
//! let event = SyncEvent::new(EventKind::Created, RelPath::from("docs/a.txt"));
//! assert_eq!(event.path.to_string(), "docs/a.txt");
//! ```

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod event;
pub mod result;
pub mod types;

// Re-export commonly used types
pub use config::ChunkSize;
pub use error::{Error, ErrorKind};
pub use event::{EventKind, SyncEvent};
pub use result::Result;
pub use types::*;
