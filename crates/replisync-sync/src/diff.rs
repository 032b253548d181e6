//! Difference detection between a source and a replica snapshot

use crate::hasher::ContentHasher;
use crate::scan::TreeSnapshot;
use replisync_types::{Error, RelPath};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// Which side holds the directory in a file/directory collision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictSide {
    /// The path is a file in the source and a directory in the replica
    DirectoryInReplica,
    /// The path is a directory in the source and a file in the replica
    DirectoryInSource,
}

impl fmt::Display for ConflictSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DirectoryInReplica => f.write_str("file in source, directory in replica"),
            Self::DirectoryInSource => f.write_str("directory in source, file in replica"),
        }
    }
}

/// Actions needed to bring a replica in line with its source
///
/// `to_create`, `to_update` and `to_delete` are disjoint. Nothing at or below
/// a conflicting path appears in any of them.
#[derive(Debug, Default)]
pub struct ActionSet {
    /// In the source, absent from the replica
    pub to_create: BTreeSet<RelPath>,
    /// In both, with differing content or a symlink on the replica side
    pub to_update: BTreeSet<RelPath>,
    /// In the replica, absent from the source
    pub to_delete: BTreeSet<RelPath>,
    /// File on one side, directory on the other
    pub conflicts: BTreeMap<RelPath, ConflictSide>,
    /// Pairs that could not be compared because hashing failed
    pub compare_errors: Vec<(RelPath, Error)>,
    /// Pairs found identical
    pub unchanged: u64,
    /// Pairs whose sizes differed, so no hashing was needed
    pub size_mismatches: u64,
}

impl ActionSet {
    /// True when the replica already mirrors the source
    pub fn is_empty(&self) -> bool {
        self.to_create.is_empty()
            && self.to_update.is_empty()
            && self.to_delete.is_empty()
            && self.conflicts.is_empty()
            && self.compare_errors.is_empty()
    }

    /// Number of replica mutations the set calls for
    pub fn action_count(&self) -> usize {
        self.to_create.len() + self.to_update.len() + self.to_delete.len()
    }

    fn is_blocked(&self, path: &RelPath) -> bool {
        self.conflicts.contains_key(path)
            || path.ancestors().any(|ancestor| self.conflicts.contains_key(&ancestor))
    }
}

/// Engine for classifying paths into an [`ActionSet`]
#[derive(Debug, Clone)]
pub struct DiffEngine {
    hasher: Arc<dyn ContentHasher>,
}

impl DiffEngine {
    /// Create a diff engine comparing contents with `hasher`
    pub fn new(hasher: Arc<dyn ContentHasher>) -> Self {
        Self { hasher }
    }

    /// Compare two snapshots
    ///
    /// A replica entry that is a symlink is always replaced, without reading
    /// through it. Sizes are compared next: pairs of different size are
    /// updates without hashing. Equal-size pairs are always hashed, both sides concurrently,
    /// since equal size never implies equal content.
    pub async fn detect_changes(&self, source: &TreeSnapshot, replica: &TreeSnapshot) -> ActionSet {
        let mut actions = ActionSet {
            conflicts: Self::detect_conflicts(source, replica),
            ..ActionSet::default()
        };

        let mut candidates = Vec::new();
        for entry in source.files() {
            let path = entry.path();
            if actions.is_blocked(path) {
                continue;
            }
            match replica.get(path) {
                Some(existing) => candidates.push((entry, existing)),
                None => {
                    actions.to_create.insert(path.clone());
                }
            }
        }

        for entry in replica.files() {
            let path = entry.path();
            if !source.contains_file(path) && !actions.is_blocked(path) {
                actions.to_delete.insert(path.clone());
            }
        }

        for (src, rep) in candidates {
            let path = src.path();
            if rep.is_symlink() {
                debug!("Replica entry {} is a symlink, replacing it", path);
                actions.to_update.insert(path.clone());
                continue;
            }
            if src.size() != rep.size() {
                debug!("Size differs for {}: {} vs {}", path, src.size(), rep.size());
                actions.size_mismatches += 1;
                actions.to_update.insert(path.clone());
                continue;
            }

            let hasher = self.hasher.as_ref();
            match tokio::try_join!(src.digest(hasher), rep.digest(hasher)) {
                Ok((src_digest, rep_digest)) if src_digest == rep_digest => {
                    actions.unchanged += 1;
                }
                Ok((src_digest, rep_digest)) => {
                    debug!("Content differs for {}: {} vs {}", path, src_digest, rep_digest);
                    actions.to_update.insert(path.clone());
                }
                Err(error) => actions.compare_errors.push((path.clone(), error)),
            }
        }

        info!(
            "Detected {} to create, {} to update, {} to delete, {} unchanged, {} conflicts",
            actions.to_create.len(),
            actions.to_update.len(),
            actions.to_delete.len(),
            actions.unchanged,
            actions.conflicts.len()
        );
        actions
    }

    fn detect_conflicts(
        source: &TreeSnapshot,
        replica: &TreeSnapshot,
    ) -> BTreeMap<RelPath, ConflictSide> {
        let mut conflicts = BTreeMap::new();
        for entry in source.files() {
            if replica.contains_dir(entry.path()) {
                conflicts.insert(entry.path().clone(), ConflictSide::DirectoryInReplica);
            }
        }
        for entry in replica.files() {
            if source.contains_dir(entry.path()) {
                conflicts.insert(entry.path().clone(), ConflictSide::DirectoryInSource);
            }
        }
        conflicts
    }
}
