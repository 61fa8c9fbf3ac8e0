//! Organizer lifecycle integration tests.
//!
//! These tests drive the organizer end to end against temporary folders:
//! - Deduplication and collision-free naming
//! - The counting identity over every candidate
//! - Dry runs, preflight refusal and cancellation
//! - Conversion, including a missing tool
//! - Persisted operation logs

use std::path::Path;
use std::sync::Arc;

use tempfile::TempDir;
use tokio::sync::mpsc;

use mediasort_core::{
    create_audit_system, load_audit_log,
    testing::{fixtures, FixedCapacity, MockConverter},
    AuditEvent, AuditStore, CapacityProbe, Config, ConfigError, EngineError, GrantedFolders,
    Layout, MediaKind, MemoryAuditStore, OperationKind, Organizer, PreflightError,
    ProcessOptions, RunReport, RunStatus, UnrestrictedAccess,
};

/// Test helper owning the folders and mocks of one organizer.
struct TestHarness {
    organizer: Arc<Organizer<MockConverter>>,
    converter: Arc<MockConverter>,
    capacity: Arc<FixedCapacity>,
    source: TempDir,
    destination: TempDir,
    _audit_dir: TempDir,
}

impl TestHarness {
    fn new() -> Self {
        Self::with_config(|_| {})
    }

    fn with_config(customize: impl FnOnce(&mut Config)) -> Self {
        let source = TempDir::new().expect("Failed to create source dir");
        let destination = TempDir::new().expect("Failed to create destination dir");
        let audit_dir = TempDir::new().expect("Failed to create audit dir");

        let mut config = fixtures::config_with_audit_dir(audit_dir.path());
        customize(&mut config);

        let converter = Arc::new(MockConverter::new());
        let capacity = Arc::new(FixedCapacity::unlimited());
        let organizer = Organizer::new(config, Arc::clone(&converter))
            .with_capacity_probe(Arc::clone(&capacity) as Arc<dyn CapacityProbe>);

        Self {
            organizer: Arc::new(organizer),
            converter,
            capacity,
            source,
            destination,
            _audit_dir: audit_dir,
        }
    }

    fn add_source(&self, relative: &str, contents: &[u8]) {
        fixtures::write_file(self.source.path(), relative, contents).expect("write source file");
    }

    fn add_destination(&self, relative: &str, contents: &[u8]) {
        fixtures::write_file(self.destination.path(), relative, contents)
            .expect("write destination file");
    }

    async fn process(&self, options: ProcessOptions) -> Result<RunReport, EngineError> {
        self.organizer
            .process(
                self.source.path(),
                self.destination.path(),
                &UnrestrictedAccess,
                options,
                None,
            )
            .await
    }

    fn destination_files(&self) -> Vec<String> {
        fixtures::list_files(self.destination.path())
    }

    fn read_destination(&self, relative: &str) -> Vec<u8> {
        std::fs::read(self.destination.path().join(relative)).expect("read destination file")
    }
}

fn sequential() -> ProcessOptions {
    ProcessOptions::default().with_max_concurrency(1)
}

fn assert_all_considered(report: &RunReport) {
    let counts = report.counts;
    assert_eq!(
        counts.processed + counts.duplicates + counts.errors + counts.skipped,
        report.total_candidates as u64,
        "every candidate must end in exactly one bucket: {:?}",
        counts
    );
    assert!(counts.processed >= counts.converted);
}

#[tokio::test]
async fn test_duplicate_is_skipped_and_never_logged() {
    let harness = TestHarness::new();
    let photo = fixtures::bytes(1, 1000);
    harness.add_source("a.jpg", &photo);
    harness.add_source("b.jpg", &photo);
    harness.add_source("c.mov", &fixtures::bytes(2, 700));

    let report = harness.process(sequential()).await.unwrap();

    assert_eq!(report.status, RunStatus::Complete);
    assert_eq!(report.counts.processed, 2);
    assert_eq!(report.counts.duplicates, 1);
    assert_eq!(report.counts.errors, 0);
    assert_all_considered(&report);

    assert_eq!(harness.destination_files(), vec!["a.jpg", "c.mov"]);
    assert_eq!(harness.read_destination("a.jpg"), photo);

    let log = harness.organizer.operation_log();
    assert_eq!(log.len(), 2);
    assert!(log
        .iter()
        .all(|r| r.source_path.file_name().unwrap() != "b.jpg"));
    assert!(log.iter().all(|r| r.operation == OperationKind::Copy));

    // Copies leave the source alone.
    assert!(harness.source.path().join("a.jpg").exists());
    assert!(harness.source.path().join("b.jpg").exists());
}

#[tokio::test]
async fn test_existing_destination_file_is_never_overwritten() {
    let harness = TestHarness::new();
    harness.add_destination("a.jpg", b"already here");
    harness.add_source("a.jpg", b"incoming photo");

    let report = harness.process(ProcessOptions::default()).await.unwrap();

    assert_eq!(report.counts.processed, 1);
    assert_eq!(harness.destination_files(), vec!["a.jpg", "a_1.jpg"]);
    assert_eq!(harness.read_destination("a.jpg"), b"already here");
    assert_eq!(harness.read_destination("a_1.jpg"), b"incoming photo");
}

#[tokio::test]
async fn test_identical_content_processed_once_under_concurrency() {
    let harness = TestHarness::new();
    let photo = fixtures::bytes(9, 4096);
    for i in 0..20 {
        harness.add_source(&format!("copies/{i:02}.jpg"), &photo);
    }

    let report = harness
        .process(ProcessOptions::default().with_max_concurrency(8))
        .await
        .unwrap();

    assert_eq!(report.counts.processed, 1);
    assert_eq!(report.counts.duplicates, 19);
    assert_all_considered(&report);
    assert_eq!(harness.destination_files().len(), 1);
    assert_eq!(harness.organizer.operation_log().len(), 1);
}

#[tokio::test]
async fn test_shared_base_names_get_distinct_destinations() {
    let harness = TestHarness::new();
    for i in 0..12u8 {
        harness.add_source(&format!("roll{i:02}/IMG_0001.jpg"), &fixtures::bytes(i, 256));
    }

    let report = harness
        .process(ProcessOptions::default().with_max_concurrency(6))
        .await
        .unwrap();

    assert_eq!(report.counts.processed, 12);
    let files = harness.destination_files();
    assert_eq!(files.len(), 12);
    assert!(files.contains(&"IMG_0001.jpg".to_string()));
    for n in 1..12 {
        assert!(files.contains(&format!("IMG_0001_{n}.jpg")), "missing suffix {n}");
    }
}

#[tokio::test]
async fn test_counting_identity_with_skips_and_failures() {
    let harness = TestHarness::with_config(|config| config.options.convert_enabled = true);
    harness.add_source("keep.jpg", &fixtures::bytes(1, 100));
    harness.add_source("same.jpg", &fixtures::bytes(1, 100));
    harness.add_source("vanishes.png", &fixtures::bytes(2, 100));
    harness.add_source("scan.tiff", &fixtures::bytes(3, 100));
    harness.add_source("notes.txt", b"not media");

    let scan = harness
        .organizer
        .scan(harness.source.path(), &UnrestrictedAccess)
        .await
        .unwrap();
    assert_eq!(scan.scanned, 5);
    assert_eq!(scan.media_found, 4);
    assert_eq!(scan.needing_conversion(), 1);

    // The cached scan still lists this file.
    std::fs::remove_file(harness.source.path().join("vanishes.png")).unwrap();
    harness.converter.set_always_fail(true).await;

    let report = harness
        .process(sequential().with_conversion(true))
        .await
        .unwrap();

    assert_eq!(report.total_candidates, 4);
    assert_eq!(report.counts.scanned, 5);
    assert_eq!(report.counts.processed, 1);
    assert_eq!(report.counts.duplicates, 1);
    assert_eq!(report.counts.skipped, 1);
    assert_eq!(report.counts.errors, 1);
    assert_eq!(report.counts.converted, 0);
    assert_all_considered(&report);
    assert_eq!(harness.destination_files(), vec!["keep.jpg"]);
    assert!(harness.organizer.last_scan().is_none());
}

#[tokio::test]
async fn test_dry_run_writes_nothing_and_counts_like_a_real_run() {
    let harness = TestHarness::new();
    let photo = fixtures::bytes(4, 2048);
    harness.add_source("a.jpg", &photo);
    harness.add_source("b.jpg", &photo);
    harness.add_source("c.mov", &fixtures::bytes(5, 900));
    harness.add_source("nested/d.png", &fixtures::bytes(6, 300));

    let dry = harness
        .process(ProcessOptions::default().with_move().with_dry_run(true))
        .await
        .unwrap();

    assert!(dry.dry_run);
    assert!(harness.destination_files().is_empty());
    assert!(harness.organizer.operation_log().is_empty());
    assert!(dry.audit_log_path.is_none());
    assert_eq!(fixtures::list_files(harness.source.path()).len(), 4);

    let real = harness.process(ProcessOptions::default()).await.unwrap();
    assert_eq!(dry.counts.processed, real.counts.processed);
    assert_eq!(dry.counts.duplicates, real.counts.duplicates);
    assert_eq!(dry.counts.errors, real.counts.errors);
    assert_eq!(dry.counts.skipped, real.counts.skipped);
}

#[tokio::test]
async fn test_preflight_refuses_before_any_write() {
    let harness = TestHarness::new();
    harness.add_source("a.jpg", &fixtures::bytes(1, 1000));
    harness.capacity.set_available(1299);

    let err = harness.process(ProcessOptions::default()).await.unwrap_err();
    match err {
        EngineError::Preflight(PreflightError::InsufficientSpace {
            required_bytes,
            available_bytes,
            ..
        }) => {
            assert_eq!(required_bytes, 1300);
            assert_eq!(available_bytes, 1299);
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert!(harness.destination_files().is_empty());
    assert_eq!(harness.organizer.counts().processed, 0);

    // A dry run only warns.
    let report = harness
        .process(ProcessOptions::default().with_dry_run(true))
        .await
        .unwrap();
    assert!(report.preflight.unwrap().shortfall_ignored);

    harness.capacity.set_available(1300);
    let report = harness.process(ProcessOptions::default()).await.unwrap();
    assert_eq!(report.counts.processed, 1);
}

#[tokio::test]
async fn test_configuration_errors_block_the_run() {
    let harness = TestHarness::new();
    harness.add_source("a.jpg", b"photo");

    let same = harness
        .organizer
        .process(
            harness.source.path(),
            harness.source.path(),
            &UnrestrictedAccess,
            ProcessOptions::default(),
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(same, EngineError::Config(ConfigError::SameFolder(_))));

    let inside = harness.source.path().join("sorted");
    std::fs::create_dir(&inside).unwrap();
    let nested = harness
        .organizer
        .process(
            harness.source.path(),
            &inside,
            &UnrestrictedAccess,
            ProcessOptions::default(),
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(
        nested,
        EngineError::Config(ConfigError::NestedFolders { .. })
    ));

    let missing = harness
        .organizer
        .process(
            &harness.source.path().join("nope"),
            harness.destination.path(),
            &UnrestrictedAccess,
            ProcessOptions::default(),
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(
        missing,
        EngineError::Config(ConfigError::SourceMissing(_))
    ));

    let zero = harness
        .process(ProcessOptions::default().with_max_concurrency(0))
        .await
        .unwrap_err();
    assert!(matches!(zero, EngineError::Config(ConfigError::ValidationError(_))));

    assert!(harness.destination_files().is_empty());
}

#[tokio::test]
async fn test_access_scope_must_cover_both_roots() {
    let harness = TestHarness::new();
    harness.add_source("a.jpg", b"photo");

    let scope = GrantedFolders::new([harness.source.path().to_path_buf()]);
    let err = harness
        .organizer
        .process(
            harness.source.path(),
            harness.destination.path(),
            &scope,
            ProcessOptions::default(),
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::AccessDenied(path) if path == harness.destination.path()));

    let scope = GrantedFolders::new([
        harness.source.path().to_path_buf(),
        harness.destination.path().to_path_buf(),
    ]);
    let report = harness
        .organizer
        .process(
            harness.source.path(),
            harness.destination.path(),
            &scope,
            ProcessOptions::default(),
            None,
        )
        .await
        .unwrap();
    assert_eq!(report.counts.processed, 1);
}

#[tokio::test]
async fn test_cancellation_keeps_finished_files() {
    let harness = TestHarness::new();
    for i in 0..40u8 {
        harness.add_source(&format!("{i:02}.jpg"), &fixtures::bytes(i, 512));
    }

    let (tx, mut rx) = mpsc::channel(64);
    let organizer = Arc::clone(&harness.organizer);
    let run = organizer.process(
        harness.source.path(),
        harness.destination.path(),
        &UnrestrictedAccess,
        ProcessOptions::default().with_max_concurrency(1),
        Some(tx),
    );
    let cancel = async {
        if rx.recv().await.is_some() {
            harness.organizer.cancel();
        }
    };

    let (report, ()) = tokio::join!(run, cancel);
    let report = report.unwrap();

    assert_eq!(report.status, RunStatus::Cancelled);
    assert!(report.counts.processed >= 1);
    assert!(report.counts.processed < 40);
    assert_eq!(report.counts.errors, 0);

    // Whatever finished stays placed and logged.
    let placed = harness.destination_files().len() as u64;
    assert_eq!(placed, report.counts.processed);
    assert_eq!(harness.organizer.operation_log().len() as u64, placed);
}

#[tokio::test]
async fn test_progress_reaches_total() {
    let harness = TestHarness::new();
    for i in 0..5u8 {
        harness.add_source(&format!("{i}.jpg"), &fixtures::bytes(i, 128));
    }

    let (tx, mut rx) = mpsc::channel(64);
    let report = harness
        .organizer
        .process(
            harness.source.path(),
            harness.destination.path(),
            &UnrestrictedAccess,
            ProcessOptions::default(),
            Some(tx),
        )
        .await
        .unwrap();

    let mut last = None;
    while let Some(progress) = rx.recv().await {
        last = Some(progress);
    }
    let last = last.expect("at least one progress update");
    assert_eq!(last.completed, 5);
    assert_eq!(last.total, 5);
    assert_eq!(last.processed, report.counts.processed);
    assert_eq!(last.fraction(), 1.0);
}

#[tokio::test]
async fn test_conversion_uses_target_extensions() {
    let harness = TestHarness::new();
    harness.add_source("scan.tiff", &fixtures::bytes(1, 300));
    harness.add_source("clip.avi", &fixtures::bytes(2, 300));
    harness.add_source("photo.jpg", &fixtures::bytes(3, 300));

    let report = harness
        .process(ProcessOptions::default().with_conversion(true))
        .await
        .unwrap();

    assert_eq!(report.counts.processed, 3);
    assert_eq!(report.counts.converted, 2);
    assert_eq!(
        harness.destination_files(),
        vec!["clip.mp4", "photo.jpg", "scan.jpg"]
    );
    assert_eq!(harness.converter.conversion_count().await, 2);

    let log = harness.organizer.operation_log();
    assert_eq!(
        log.iter()
            .filter(|r| r.operation == OperationKind::Convert)
            .count(),
        2
    );
}

#[tokio::test]
async fn test_missing_video_tool_degrades_to_copy() {
    let harness = TestHarness::new();
    harness.add_source("clip.avi", &fixtures::bytes(2, 300));
    harness.converter.set_missing_tool(MediaKind::Video).await;

    let report = harness
        .process(ProcessOptions::default().with_conversion(true))
        .await
        .unwrap();

    assert_eq!(report.counts.processed, 1);
    assert_eq!(report.counts.converted, 0);
    assert_eq!(report.counts.errors, 0);
    assert_eq!(harness.destination_files(), vec!["clip.avi"]);
    assert_eq!(
        harness.organizer.operation_log()[0].operation,
        OperationKind::Copy
    );
}

#[tokio::test]
async fn test_missing_image_tool_fails_that_file_only() {
    let harness = TestHarness::new();
    harness.add_source("scan.tiff", &fixtures::bytes(1, 300));
    harness.add_source("photo.jpg", &fixtures::bytes(3, 300));
    harness.converter.set_missing_tool(MediaKind::Image).await;

    let report = harness
        .process(ProcessOptions::default().with_conversion(true))
        .await
        .unwrap();

    assert_eq!(report.status, RunStatus::Complete);
    assert_eq!(report.counts.processed, 1);
    assert_eq!(report.counts.errors, 1);
    assert_all_considered(&report);
    assert_eq!(harness.destination_files(), vec!["photo.jpg"]);
}

#[tokio::test]
async fn test_by_date_layout_creates_month_folders() {
    let harness = TestHarness::with_config(|config| config.layout = Layout::ByDate);
    harness.add_source("a.jpg", &fixtures::bytes(1, 64));

    harness.process(ProcessOptions::default()).await.unwrap();

    let files = harness.destination_files();
    assert_eq!(files.len(), 1);
    let parts: Vec<&str> = Path::new(&files[0])
        .iter()
        .map(|p| p.to_str().unwrap())
        .collect();
    assert_eq!(parts.len(), 3);
    assert_eq!(parts[0].len(), 4);
    assert_eq!(parts[1].len(), 2);
    assert_eq!(parts[2], "a.jpg");
}

#[tokio::test]
async fn test_operation_log_is_persisted() {
    let harness = TestHarness::new();
    harness.add_source("a.jpg", &fixtures::bytes(1, 64));
    harness.add_source("b.mov", &fixtures::bytes(2, 64));

    let report = harness.process(ProcessOptions::default()).await.unwrap();
    let path = report.audit_log_path.expect("log should be saved");

    let saved = load_audit_log(&path).unwrap();
    assert_eq!(saved.run_id, report.run_id);
    assert_eq!(saved.counts, report.counts);
    assert_eq!(saved.operations, harness.organizer.operation_log());
    assert_eq!(saved.destination, harness.destination.path().canonicalize().unwrap());
}

#[tokio::test]
async fn test_run_with_nothing_placed_saves_no_log() {
    let harness = TestHarness::new();
    harness.add_source("notes.txt", b"not media");

    let report = harness.process(ProcessOptions::default()).await.unwrap();
    assert_eq!(report.total_candidates, 0);
    assert!(report.audit_log_path.is_none());
}

#[tokio::test]
async fn test_run_log_records_outcomes() {
    let source = TempDir::new().unwrap();
    let destination = TempDir::new().unwrap();
    let audit_dir = TempDir::new().unwrap();
    fixtures::write_file(source.path(), "a.jpg", b"same").unwrap();
    fixtures::write_file(source.path(), "b.jpg", b"same").unwrap();

    let store = Arc::new(MemoryAuditStore::new());
    let (audit, writer) = create_audit_system(Arc::clone(&store) as Arc<dyn AuditStore>, 100);
    let writer_task = tokio::spawn(writer.run());

    let organizer = Organizer::new(
        fixtures::config_with_audit_dir(audit_dir.path()),
        Arc::new(MockConverter::new()),
    )
    .with_capacity_probe(Arc::new(FixedCapacity::unlimited()))
    .with_audit(audit);

    organizer
        .process(
            source.path(),
            destination.path(),
            &UnrestrictedAccess,
            ProcessOptions::default(),
            None,
        )
        .await
        .unwrap();

    drop(organizer);
    writer_task.await.unwrap();

    let types: Vec<String> = store.records().into_iter().map(|r| r.event_type).collect();
    assert_eq!(types.first().map(String::as_str), Some("scan_started"));
    assert!(types.contains(&"preflight_passed".to_string()));
    assert!(types.contains(&"file_processed".to_string()));
    assert!(types.contains(&"duplicate_skipped".to_string()));
    assert_eq!(types.last().map(String::as_str), Some("process_finished"));

    let finished = store.records().pop().unwrap();
    assert!(matches!(
        finished.data,
        AuditEvent::ProcessFinished {
            processed: 1,
            duplicates: 1,
            ..
        }
    ));
}
