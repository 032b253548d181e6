//! Main reconciliation engine

use crate::{
    diff::{ActionSet, DiffEngine},
    hasher::{ContentHasher, FileHasher},
    ops::{LocalReplicaOps, ReplicaOps},
    scan::{TreeScanner, TreeSnapshot},
    sink::{EventSink, TracingSink},
};
use replisync_config::SyncConfig;
use replisync_types::{Error, EventKind, PassStats, RelPath, Result, SyncEvent};
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};
use uuid::Uuid;

/// Reconciliation options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncOptions {
    /// Plan and log actions without touching the replica
    pub dry_run: bool,
}

impl SyncOptions {
    /// Options for a planning-only pass
    pub fn dry_run() -> Self {
        Self { dry_run: true }
    }
}

/// Outcome of one reconciliation pass
#[derive(Debug)]
pub struct PassReport {
    /// Identifier shared by every log line of the pass
    pub pass_id: Uuid,
    /// Events in the order they were emitted
    pub events: Vec<SyncEvent>,
    /// Counters for the pass
    pub stats: PassStats,
    /// Whether the pass ran in dry-run mode
    pub dry_run: bool,
    /// The actions that were computed for the pass
    pub plan: ActionSet,
}

impl PassReport {
    /// Number of events of `kind`
    pub fn count(&self, kind: EventKind) -> usize {
        self.events.iter().filter(|event| event.kind == kind).count()
    }

    /// `Error` events only
    pub fn errors(&self) -> impl Iterator<Item = &SyncEvent> {
        self.events.iter().filter(|event| event.is_error())
    }

    /// True when the pass emitted no `Error` events
    pub fn is_clean(&self) -> bool {
        self.stats.is_clean()
    }
}

struct PassRecorder<'a> {
    sink: &'a dyn EventSink,
    events: Vec<SyncEvent>,
    stats: PassStats,
}

impl<'a> PassRecorder<'a> {
    fn new(sink: &'a dyn EventSink) -> Self {
        Self {
            sink,
            events: Vec::new(),
            stats: PassStats::new(),
        }
    }

    fn record(&mut self, event: SyncEvent) {
        match event.kind {
            EventKind::Created => self.stats.created += 1,
            EventKind::Updated => self.stats.updated += 1,
            EventKind::Deleted => self.stats.deleted += 1,
            EventKind::Error => self.stats.errors += 1,
            EventKind::Copied => {}
        }
        self.sink.emit(&event);
        self.events.push(event);
    }

    fn fail(&mut self, path: &RelPath, error: &Error) {
        self.record(SyncEvent::error(path.clone(), error));
    }
}

/// Brings a replica tree in line with its source, one pass at a time
///
/// Each pass scans both trees, classifies every path and then applies
/// creates, deletes and updates in that order, one operation at a time.
/// A failure on one path becomes an `Error` event and the pass moves on.
pub struct SyncEngine {
    scanner: TreeScanner,
    diff: DiffEngine,
    ops: Arc<dyn ReplicaOps>,
    sink: Arc<dyn EventSink>,
    options: SyncOptions,
}

impl fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncEngine")
            .field("diff", &self.diff)
            .field("ops", &self.ops)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl SyncEngine {
    /// Create an engine comparing contents with `hasher`
    pub fn new(hasher: Arc<dyn ContentHasher>) -> Self {
        Self {
            scanner: TreeScanner::new(),
            diff: DiffEngine::new(hasher),
            ops: Arc::new(LocalReplicaOps),
            sink: Arc::new(TracingSink),
            options: SyncOptions::default(),
        }
    }

    /// Create an engine from the sync configuration section
    pub fn from_config(config: &SyncConfig) -> Self {
        Self::new(Arc::new(FileHasher::from_config(config))).with_options(SyncOptions {
            dry_run: config.dry_run,
        })
    }

    /// Replace the replica operations
    pub fn with_ops(mut self, ops: Arc<dyn ReplicaOps>) -> Self {
        self.ops = ops;
        self
    }

    /// Replace the event sink
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Set reconciliation options
    pub fn with_options(mut self, options: SyncOptions) -> Self {
        self.options = options;
        self
    }

    /// Current options
    pub fn options(&self) -> SyncOptions {
        self.options
    }

    /// Scan both trees concurrently
    ///
    /// Links are followed in the source and recorded unfollowed in the
    /// replica, so replica links get replaced rather than written through.
    pub async fn scan_pair(&self, source: &Path, replica: &Path) -> Result<(TreeSnapshot, TreeSnapshot)> {
        let replica_scanner = self.scanner.follow_links(false);
        tokio::try_join!(self.scanner.scan(source), replica_scanner.scan(replica))
    }

    /// Compute the actions a pass would take, without applying any
    pub async fn plan(&self, source: &Path, replica: &Path) -> Result<ActionSet> {
        let (source_tree, replica_tree) = self.scan_pair(source, replica).await?;
        Ok(self.diff.detect_changes(&source_tree, &replica_tree).await)
    }

    /// Run one reconciliation pass
    ///
    /// Returns `Err` only when either tree cannot be scanned; nothing is
    /// applied in that case. Per-path failures are reported as events.
    pub async fn reconcile(&self, source: &Path, replica: &Path) -> Result<PassReport> {
        let started = Instant::now();
        let pass_id = Uuid::new_v4();
        info!(
            "Pass {} started: '{}' -> '{}'",
            pass_id,
            source.display(),
            replica.display()
        );

        let (source_tree, replica_tree) = self.scan_pair(source, replica).await?;
        let plan = self.diff.detect_changes(&source_tree, &replica_tree).await;

        let mut recorder = PassRecorder::new(self.sink.as_ref());
        recorder.stats.unchanged = plan.unchanged;

        for (path, side) in &plan.conflicts {
            recorder.fail(path, &Error::conflict(path.to_string(), side.to_string()));
        }

        if self.options.dry_run {
            Self::log_plan(&plan);
        } else {
            self.apply_creates(&plan, &source_tree, &replica_tree, &mut recorder)
                .await;
            self.apply_deletes(&plan, replica, &mut recorder).await;
            self.apply_updates(&plan, &source_tree, replica, &mut recorder)
                .await;
        }

        for (path, error) in &plan.compare_errors {
            recorder.fail(path, error);
        }

        let PassRecorder {
            events, mut stats, ..
        } = recorder;
        stats.duration = started.elapsed();

        info!(
            "Pass {} finished in {:.2?}: {} created, {} updated, {} deleted, {} unchanged, {} errors{}",
            pass_id,
            stats.duration,
            stats.created,
            stats.updated,
            stats.deleted,
            stats.unchanged,
            stats.errors,
            if self.options.dry_run { " (dry run)" } else { "" }
        );

        Ok(PassReport {
            pass_id,
            events,
            stats,
            dry_run: self.options.dry_run,
            plan,
        })
    }

    async fn apply_creates(
        &self,
        plan: &ActionSet,
        source_tree: &TreeSnapshot,
        replica_tree: &TreeSnapshot,
        recorder: &mut PassRecorder<'_>,
    ) {
        let replica = replica_tree.root();
        let mut made_dirs: BTreeSet<RelPath> = BTreeSet::new();

        for path in &plan.to_create {
            let mut created_dir = None;
            if let Some(parent) = path.ancestors().next() {
                if !replica_tree.contains_dir(&parent) && !made_dirs.contains(&parent) {
                    if let Err(error) = self.ops.create_dir_all(&parent.under(replica)).await {
                        recorder.fail(path, &error);
                        continue;
                    }
                    made_dirs.extend(parent.ancestors());
                    made_dirs.insert(parent.clone());
                    created_dir = Some(parent);
                }
            }

            match self
                .ops
                .copy_file(&Self::source_file(source_tree, path), &path.under(replica))
                .await
            {
                Ok(bytes) => {
                    recorder.stats.bytes_copied += bytes;
                    recorder.record(
                        SyncEvent::new(EventKind::Created, path.clone())
                            .with_detail(format!("{} bytes", bytes)),
                    );
                    if let Some(dir) = created_dir {
                        recorder.record(
                            SyncEvent::new(EventKind::Copied, path.clone())
                                .with_detail(format!("created directory {}", dir)),
                        );
                    }
                }
                Err(error) => recorder.fail(path, &error),
            }
        }
    }

    async fn apply_deletes(&self, plan: &ActionSet, replica: &Path, recorder: &mut PassRecorder<'_>) {
        for path in &plan.to_delete {
            match self.ops.remove_file(&path.under(replica)).await {
                Ok(()) => recorder.record(SyncEvent::new(EventKind::Deleted, path.clone())),
                Err(error) => recorder.fail(path, &error),
            }
        }
    }

    async fn apply_updates(
        &self,
        plan: &ActionSet,
        source_tree: &TreeSnapshot,
        replica: &Path,
        recorder: &mut PassRecorder<'_>,
    ) {
        for path in &plan.to_update {
            match self
                .ops
                .copy_file(&Self::source_file(source_tree, path), &path.under(replica))
                .await
            {
                Ok(bytes) => {
                    recorder.stats.bytes_copied += bytes;
                    recorder.record(
                        SyncEvent::new(EventKind::Updated, path.clone())
                            .with_detail(format!("{} bytes", bytes)),
                    );
                }
                Err(error) => recorder.fail(path, &error),
            }
        }
    }

    /// Location the scan found `path` at, which is what the copy reads
    fn source_file(source_tree: &TreeSnapshot, path: &RelPath) -> PathBuf {
        source_tree.get(path).map_or_else(
            || path.under(source_tree.root()),
            |entry| entry.absolute().to_path_buf(),
        )
    }

    fn log_plan(plan: &ActionSet) {
        for path in &plan.to_create {
            info!("[dry run] would create {}", path);
        }
        for path in &plan.to_delete {
            info!("[dry run] would delete {}", path);
        }
        for path in &plan.to_update {
            info!("[dry run] would update {}", path);
        }
        debug!("[dry run] {} actions planned", plan.action_count());
    }
}
