//! One-way mirror reconciliation for replisync
//!
//! This crate keeps a replica directory tree identical to a source tree:
//!
//! - **Hashing**: Streaming content digests behind the pluggable [`ContentHasher`] trait
//! - **Scanning**: Recursive snapshots of a tree with lazily computed digests
//! - **Difference Detection**: Size-first classification into create, update and delete sets
//! - **Reconciliation**: Sequential application of those sets, one event per action or failure
//! - **Scheduling**: A pass immediately, then one per interval until cancelled
//!
//! # Examples
//!
//! ```rust,no_run
//! use replisync_sync::{FileHasher, SyncEngine};
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = SyncEngine::new(Arc::new(FileHasher::default()));
//! let report = engine
//!     .reconcile(Path::new("source_dir"), Path::new("replica_dir"))
//!     .await?;
//! println!("{} created, {} errors", report.stats.created, report.stats.errors);
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod diff;
pub mod engine;
pub mod hasher;
pub mod ops;
pub mod scan;
pub mod scheduler;
pub mod sink;

pub use diff::{ActionSet, ConflictSide, DiffEngine};
pub use engine::{PassReport, SyncEngine, SyncOptions};
pub use hasher::{digest_bytes, ContentHasher, FileHasher};
pub use ops::{LocalReplicaOps, ReplicaOps};
pub use scan::{FileEntry, TreeScanner, TreeSnapshot};
pub use scheduler::Scheduler;
pub use sink::{EventSink, MemorySink, TracingSink};
