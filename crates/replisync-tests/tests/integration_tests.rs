//! Integration tests for replisync
//!
//! These tests run whole passes against real temporary trees and check the
//! replica, the emitted events and the scheduler together.

use proptest::prelude::*;
use replisync_config::{ConfigBuilder, SyncRoots};
use replisync_sync::{FileHasher, MemorySink, Scheduler, SyncEngine, SyncOptions};
use replisync_tests::test_utils::{
    default_engine, generate_test_data, CountingHasher, FailingOps, MirrorFixture,
    TestDataPattern,
};
use replisync_types::{EventKind, HashAlgorithm, RelPath};
use rstest::rstest;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn test_new_file_is_created() {
    let fixture = MirrorFixture::new();
    fixture.write_source("a.txt", b"hello");

    let report = fixture.reconcile(&default_engine()).await;

    assert_eq!(fixture.read_replica("a.txt").as_deref(), Some(&b"hello"[..]));
    assert_eq!(report.count(EventKind::Created), 1);
    assert_eq!(report.events[0].path, RelPath::from("a.txt"));
    assert_eq!(report.events[0].detail.as_deref(), Some("5 bytes"));
}

#[tokio::test]
async fn test_changed_file_is_updated() {
    let fixture = MirrorFixture::new();
    fixture.write_source("a.txt", b"hello world");
    fixture.write_replica("a.txt", b"hello");

    let report = fixture.reconcile(&default_engine()).await;

    assert_eq!(
        fixture.read_replica("a.txt").as_deref(),
        Some(&b"hello world"[..])
    );
    assert_eq!(report.count(EventKind::Updated), 1);
    assert_eq!(report.events.len(), 1);
}

#[tokio::test]
async fn test_removed_file_is_deleted() {
    let fixture = MirrorFixture::new();
    fixture.write_replica("a.txt", b"hello");

    let report = fixture.reconcile(&default_engine()).await;

    assert!(fixture.read_replica("a.txt").is_none());
    assert_eq!(report.count(EventKind::Deleted), 1);
    assert_eq!(report.stats.deleted, 1);
}

#[tokio::test]
async fn test_second_pass_emits_nothing() {
    let fixture = MirrorFixture::new();
    fixture.write_source("a.txt", b"alpha");
    fixture.write_source("docs/b.md", &generate_test_data(100_000, TestDataPattern::Random));
    fixture.write_source("docs/deep/c.bin", &generate_test_data(4096, TestDataPattern::Zeros));
    fixture.write_replica("stale.txt", b"stale");

    let engine = default_engine();
    let first = fixture.reconcile(&engine).await;
    let second = fixture.reconcile(&engine).await;

    assert!(first.is_clean());
    assert!(fixture.is_mirrored());
    assert!(second.events.is_empty());
    assert_eq!(second.stats.unchanged, 3);
    assert_eq!(second.stats.mutations(), 0);
}

#[tokio::test]
async fn test_size_prefilter_and_equal_size_hashing() {
    let fixture = MirrorFixture::new();
    fixture.write_source("grown.txt", b"hello world");
    fixture.write_replica("grown.txt", b"hello");
    fixture.write_source("swapped.txt", b"world");
    fixture.write_replica("swapped.txt", b"hello");

    let hasher = Arc::new(CountingHasher::new());
    let engine = SyncEngine::new(hasher.clone());
    let report = fixture.reconcile(&engine).await;

    assert!(!hasher.hashed("grown.txt"));
    assert!(hasher.hashed("swapped.txt"));
    assert_eq!(hasher.calls(), 2);
    assert_eq!(report.count(EventKind::Updated), 2);
    assert!(fixture.is_mirrored());
}

#[tokio::test]
async fn test_failure_is_isolated_to_one_path() {
    let fixture = MirrorFixture::new();
    fixture.write_source("one.txt", b"1");
    fixture.write_source("two.txt", b"2");
    fixture.write_source("three.txt", b"3");
    fixture.write_replica("gone.txt", b"x");

    let ops = Arc::new(FailingOps::new().fail_copy("two.txt"));
    let engine = default_engine().with_ops(ops.clone());
    let report = fixture.reconcile(&engine).await;

    let errors: Vec<_> = report.errors().collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].path, RelPath::from("two.txt"));
    assert!(errors[0].detail.as_deref().unwrap_or("").contains("injected"));

    assert_eq!(report.stats.created, 2);
    assert_eq!(report.stats.deleted, 1);
    assert!(fixture.read_replica("one.txt").is_some());
    assert!(fixture.read_replica("three.txt").is_some());
    assert!(fixture.read_replica("two.txt").is_none());
    assert_eq!(ops.calls().len(), 4);

    // The next pass retries the failed path
    let retry = fixture.reconcile(&default_engine()).await;
    assert_eq!(retry.count(EventKind::Created), 1);
    assert!(fixture.is_mirrored());
}

#[tokio::test]
async fn test_failed_remove_is_reported() {
    let fixture = MirrorFixture::new();
    fixture.write_replica("locked.txt", b"x");

    let engine = default_engine().with_ops(Arc::new(FailingOps::new().fail_remove("locked.txt")));
    let report = fixture.reconcile(&engine).await;

    assert_eq!(report.count(EventKind::Error), 1);
    assert_eq!(report.count(EventKind::Deleted), 0);
    assert!(fixture.read_replica("locked.txt").is_some());
}

#[tokio::test]
async fn test_events_reach_sink_in_order() {
    let fixture = MirrorFixture::new();
    fixture.write_source("new/file.txt", b"new");
    fixture.write_source("changed.txt", b"after");
    fixture.write_replica("changed.txt", b"befor");
    fixture.write_replica("old.txt", b"old");

    let sink = Arc::new(MemorySink::new());
    let engine = default_engine().with_sink(sink.clone());
    let report = fixture.reconcile(&engine).await;

    let kinds: Vec<_> = sink.events().iter().map(|event| event.kind).collect();
    assert_eq!(
        kinds,
        vec![
            EventKind::Created,
            EventKind::Copied,
            EventKind::Deleted,
            EventKind::Updated
        ]
    );
    assert_eq!(sink.events().len(), report.events.len());
    assert!(sink
        .events()
        .iter()
        .any(|event| event.detail.as_deref() == Some("created directory new")));
}

#[tokio::test]
async fn test_structural_conflict_is_skipped() {
    let fixture = MirrorFixture::new();
    fixture.write_source("photos", b"a file named photos");
    fixture.write_replica("photos/2024/a.jpg", b"jpeg");
    fixture.write_source("other.txt", b"still synced");

    let engine = default_engine();
    let report = fixture.reconcile(&engine).await;

    let errors: Vec<_> = report.errors().collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].path, RelPath::from("photos"));
    assert!(fixture.read_replica("photos/2024/a.jpg").is_some());
    assert!(fixture.read_replica("other.txt").is_some());

    // Unresolved conflicts are reported again on every pass
    let again = fixture.reconcile(&engine).await;
    assert_eq!(again.count(EventKind::Error), 1);
}

#[tokio::test]
async fn test_dry_run_plans_without_touching_replica() {
    let fixture = MirrorFixture::new();
    fixture.write_source("a.txt", b"new");
    fixture.write_source("b.txt", b"changed");
    fixture.write_replica("b.txt", b"original");
    fixture.write_replica("c.txt", b"extra");

    let engine = default_engine().with_options(SyncOptions::dry_run());
    let report = fixture.reconcile(&engine).await;

    assert!(report.dry_run);
    assert_eq!(report.plan.to_create.len(), 1);
    assert_eq!(report.plan.to_update.len(), 1);
    assert_eq!(report.plan.to_delete.len(), 1);
    assert_eq!(report.stats.mutations(), 0);
    assert!(fixture.read_replica("a.txt").is_none());
    assert_eq!(fixture.read_replica("b.txt").as_deref(), Some(&b"original"[..]));
    assert!(fixture.read_replica("c.txt").is_some());
}

#[tokio::test]
async fn test_missing_root_fails_pass() {
    let fixture = MirrorFixture::new();
    fixture.write_replica("keep.txt", b"keep");
    let missing = fixture.source().join("does-not-exist");

    let result = default_engine().reconcile(&missing, fixture.replica()).await;

    assert!(result.is_err());
    assert!(fixture.read_replica("keep.txt").is_some());
}

#[cfg(unix)]
#[tokio::test]
async fn test_replica_file_links_never_touch_their_targets() {
    let fixture = MirrorFixture::new();
    fixture.write_source("a.txt", b"new");
    let shared = fixture.write_source("b.txt", b"old");
    std::os::unix::fs::symlink(&shared, fixture.replica().join("a.txt")).unwrap();
    std::os::unix::fs::symlink(&shared, fixture.replica().join("b.txt")).unwrap();

    let engine = default_engine();
    let report = fixture.reconcile(&engine).await;

    assert!(report.is_clean());
    assert_eq!(report.count(EventKind::Updated), 2);
    assert_eq!(std::fs::read(&shared).unwrap(), b"old");
    assert!(fixture.is_mirrored());
    assert!(fixture.reconcile(&engine).await.events.is_empty());
}

#[cfg(unix)]
#[tokio::test]
async fn test_replica_directory_link_is_not_written_through() {
    let fixture = MirrorFixture::new();
    let outside = tempfile::TempDir::new().unwrap();
    fixture.write_source("sub/x.txt", b"inside");
    std::os::unix::fs::symlink(outside.path(), fixture.replica().join("sub")).unwrap();
    std::os::unix::fs::symlink(outside.path(), fixture.replica().join("stray")).unwrap();

    let report = fixture.reconcile(&default_engine()).await;

    let errors: Vec<_> = report.errors().collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].path, RelPath::from("sub"));
    assert_eq!(report.count(EventKind::Deleted), 1);
    assert!(std::fs::symlink_metadata(fixture.replica().join("stray")).is_err());
    assert!(outside.path().exists());
    assert_eq!(std::fs::read_dir(outside.path()).unwrap().count(), 0);
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn test_non_utf8_names_are_mirrored() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let fixture = MirrorFixture::new();
    let names: [&[u8]; 3] = [b"bad\xff.txt", b"x\xfe", b"x\xff"];
    for (index, name) in names.iter().enumerate() {
        let content = vec![b'a' + index as u8; index + 1];
        std::fs::write(fixture.source().join(OsStr::from_bytes(name)), content).unwrap();
    }

    let engine = default_engine();
    let first = fixture.reconcile(&engine).await;
    let second = fixture.reconcile(&engine).await;

    assert!(first.is_clean());
    assert_eq!(first.count(EventKind::Created), 3);
    assert!(fixture.is_mirrored());
    assert_eq!(
        std::fs::read(fixture.replica().join(OsStr::from_bytes(b"x\xff"))).unwrap(),
        b"ccc"
    );
    assert!(second.events.is_empty());
    assert_eq!(second.stats.unchanged, 3);
}

#[rstest]
#[case(HashAlgorithm::Md5)]
#[case(HashAlgorithm::Sha256)]
#[case(HashAlgorithm::Blake3)]
#[case(HashAlgorithm::Xxh3)]
#[tokio::test]
async fn test_every_algorithm_detects_one_byte_change(#[case] algorithm: HashAlgorithm) {
    let fixture = MirrorFixture::new();
    let mut content = generate_test_data(70_000, TestDataPattern::Realistic);
    fixture.write_replica("data.bin", &content);
    content[65_537] ^= 0x01;
    fixture.write_source("data.bin", &content);

    let engine = SyncEngine::new(Arc::new(FileHasher::new(algorithm)));
    let report = fixture.reconcile(&engine).await;

    assert_eq!(report.count(EventKind::Updated), 1);
    assert!(fixture.is_mirrored());
}

#[tokio::test]
async fn test_engine_from_layered_config() {
    let fixture = MirrorFixture::new();
    fixture.write_source("a.txt", b"configured");

    let config = ConfigBuilder::new()
        .add_defaults()
        .set_override("sync.hash_algorithm", "sha256")
        .set_override("sync.dry_run", true)
        .build()
        .unwrap();
    let engine = SyncEngine::from_config(&config.sync);
    let report = fixture.reconcile(&engine).await;

    assert!(report.dry_run);
    assert!(fixture.read_replica("a.txt").is_none());
}

#[tokio::test]
async fn test_prepared_roots_create_replica() {
    let fixture = MirrorFixture::new();
    fixture.write_source("a.txt", b"hello");
    let replica = fixture.replica().join("nested/mirror");

    let roots = SyncRoots::prepare(fixture.source(), &replica).unwrap();
    let report = default_engine()
        .reconcile(&roots.source, &roots.replica)
        .await
        .unwrap();

    assert!(report.is_clean());
    assert!(replica.join("a.txt").is_file());
}

#[tokio::test(start_paused = true)]
async fn test_scheduler_runs_passes_on_interval() {
    let fixture = MirrorFixture::new();
    fixture.write_source("a.txt", b"v1");

    let engine = Arc::new(default_engine());
    let cancel = CancellationToken::new();
    let start = tokio::time::Instant::now();
    let starts = Arc::new(Mutex::new(Vec::new()));

    let scheduler = Scheduler::new(Duration::from_secs(60));
    let source = fixture.source().to_path_buf();
    let replica = fixture.replica().to_path_buf();
    let recorded = starts.clone();
    let stop = cancel.clone();

    let passes = scheduler
        .run(
            move |number| {
                recorded.lock().unwrap().push(start.elapsed());
                if number == 2 {
                    stop.cancel();
                }
                let engine = engine.clone();
                let source = source.clone();
                let replica = replica.clone();
                async move { engine.reconcile(&source, &replica).await }
            },
            cancel,
        )
        .await;

    assert_eq!(passes, 2);
    let starts = starts.lock().unwrap().clone();
    assert_eq!(starts[0], Duration::ZERO);
    assert!(starts[1] >= Duration::from_secs(60));
    assert!(fixture.is_mirrored());
}

const NAMES: [&str; 6] = ["a.txt", "b.txt", "c.txt", "d/e.txt", "d/f.txt", "g/h/i.txt"];

fn tree_strategy() -> impl Strategy<Value = BTreeMap<usize, Vec<u8>>> {
    prop::collection::btree_map(0..NAMES.len(), prop::collection::vec(0u8..4, 0..6), 0..NAMES.len())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_reconcile_converges(source in tree_strategy(), replica in tree_strategy()) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let fixture = MirrorFixture::new();
        for (index, content) in &source {
            fixture.write_source(NAMES[*index], content);
        }
        for (index, content) in &replica {
            fixture.write_replica(NAMES[*index], content);
        }

        let engine = default_engine();
        let first = runtime.block_on(fixture.reconcile(&engine));
        let second = runtime.block_on(fixture.reconcile(&engine));

        prop_assert!(first.is_clean());
        prop_assert!(fixture.is_mirrored());
        prop_assert!(second.events.is_empty());
        prop_assert_eq!(second.stats.unchanged, source.len() as u64);
    }
}
