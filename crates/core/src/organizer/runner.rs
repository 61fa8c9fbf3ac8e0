//! The scan → preflight → process engine.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use chrono::Utc;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use uuid::Uuid;

use crate::access::AccessScope;
use crate::audit::{AuditEvent, AuditHandle};
use crate::classify::Classifier;
use crate::config::{validate_roots, Config, ConfigError, ProcessOptions, ValidatedRoots};
use crate::converter::Converter;
use crate::error::EngineError;
use crate::oplog::{
    save_audit_log, undo_operations, AuditLogFile, FileOperationRecord, OperationLog,
};
use crate::placer::FsPlacer;
use crate::preflight::{check_capacity, CapacityProbe, PreflightError, SystemCapacity};
use crate::scanner::{ScanStatus, Scanner};
use crate::state::{Counter, RunCounts, SharedState};

use super::phase::{Phase, PhaseTracker};
use super::progress::RunProgress;
use super::types::{RunReport, RunStatus, ScanReport, UndoOutcome};
use super::worker::{FileOutcome, WorkerContext};

/// A cached scan and the conversion switch it was classified with.
struct CachedScan {
    report: ScanReport,
    convert_enabled: bool,
}

/// Drives scan, preflight, process and undo for one source/destination
/// pair at a time.
///
/// Share it behind an `Arc` to call [`cancel`](Self::cancel) from another
/// task while a phase runs.
pub struct Organizer<C>
where
    C: Converter + 'static,
{
    config: Config,
    converter: Arc<C>,
    placer: Arc<FsPlacer>,
    capacity: Arc<dyn CapacityProbe>,
    audit: Option<AuditHandle>,

    state: Arc<SharedState>,
    oplog: Arc<OperationLog>,
    phase: PhaseTracker,
    last_scan: Mutex<Option<CachedScan>>,
    last_destination: Mutex<Option<PathBuf>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<C> Organizer<C>
where
    C: Converter + 'static,
{
    pub fn new(config: Config, converter: Arc<C>) -> Self {
        Self {
            config,
            converter,
            placer: Arc::new(FsPlacer::with_defaults()),
            capacity: Arc::new(SystemCapacity),
            audit: None,
            state: Arc::new(SharedState::new()),
            oplog: Arc::new(OperationLog::new()),
            phase: PhaseTracker::default(),
            last_scan: Mutex::new(None),
            last_destination: Mutex::new(None),
        }
    }

    pub fn with_audit(mut self, audit: AuditHandle) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn with_capacity_probe(mut self, probe: Arc<dyn CapacityProbe>) -> Self {
        self.capacity = probe;
        self
    }

    pub fn with_placer(mut self, placer: FsPlacer) -> Self {
        self.placer = Arc::new(placer);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn phase(&self) -> Phase {
        self.phase.current()
    }

    /// Live counter snapshot.
    pub fn counts(&self) -> RunCounts {
        self.state.counts()
    }

    /// Records of the last process run, oldest first.
    pub fn operation_log(&self) -> Vec<FileOperationRecord> {
        self.oplog.snapshot()
    }

    /// Results of the last standalone scan, if not yet consumed by a process run.
    pub fn last_scan(&self) -> Option<ScanReport> {
        lock(&self.last_scan).as_ref().map(|c| c.report.clone())
    }

    /// Asks the running phase to stop. Finished files stay where they are.
    pub fn cancel(&self) {
        tracing::info!("Cancellation requested");
        self.state.cancel();
    }

    async fn emit(&self, event: AuditEvent) {
        if let Some(audit) = &self.audit {
            audit.emit(event).await;
        }
    }

    fn check_access(scope: &dyn AccessScope, path: &Path) -> Result<(), EngineError> {
        if scope.covers(path) {
            Ok(())
        } else {
            Err(EngineError::AccessDenied(path.to_path_buf()))
        }
    }

    /// Walks `source` and caches the candidates for the next
    /// [`process`](Self::process) call on the same folder.
    pub async fn scan(
        &self,
        source: &Path,
        scope: &dyn AccessScope,
    ) -> Result<ScanReport, EngineError> {
        Self::check_access(scope, source)?;
        let source = match source.canonicalize() {
            Ok(path) if path.is_dir() => path,
            _ => return Err(ConfigError::SourceMissing(source.to_path_buf()).into()),
        };

        let _guard = self.phase.begin(Phase::Scan)?;
        let convert_enabled = self.config.options.convert_enabled;
        let report = self.run_scan(&source, convert_enabled).await?;

        *lock(&self.last_scan) = Some(CachedScan {
            report: report.clone(),
            convert_enabled,
        });
        Ok(report)
    }

    async fn run_scan(&self, source: &Path, convert_enabled: bool) -> Result<ScanReport, EngineError> {
        self.state.reset();
        self.emit(AuditEvent::ScanStarted {
            source: source.to_path_buf(),
        })
        .await;
        tracing::info!(source = %source.display(), "Scanning");

        let scanner = Scanner::new(Classifier::new(&self.config.formats, convert_enabled));
        let state = Arc::clone(&self.state);
        let audit = self.audit.clone();
        let root = source.to_path_buf();

        let outcome =
            tokio::task::spawn_blocking(move || scanner.scan(&root, &state, audit.as_ref()))
                .await
                .map_err(|e| EngineError::Task(e.to_string()))??;

        let cancelled = outcome.status == ScanStatus::Cancelled;
        tracing::info!(
            scanned = outcome.scanned,
            media_found = outcome.media_found,
            cancelled,
            "Scan finished"
        );
        self.emit(AuditEvent::ScanCompleted {
            scanned: outcome.scanned,
            media_found: outcome.media_found,
            cancelled,
        })
        .await;

        Ok(ScanReport {
            source: source.to_path_buf(),
            status: outcome.status,
            candidates: outcome.candidates,
            scanned: outcome.scanned,
            media_found: outcome.media_found,
            unreadable: outcome.unreadable,
        })
    }

    /// Takes the cached scan if it matches this run, otherwise scans afresh.
    async fn candidates_for(
        &self,
        source: &Path,
        convert_enabled: bool,
    ) -> Result<ScanReport, EngineError> {
        let cached = lock(&self.last_scan).take();
        if let Some(cached) = cached {
            if cached.report.source == source
                && cached.convert_enabled == convert_enabled
                && cached.report.status == ScanStatus::Complete
            {
                tracing::debug!(
                    candidates = cached.report.candidates.len(),
                    "Reusing cached scan"
                );
                self.state.reset_for_processing();
                return Ok(cached.report);
            }
        }
        self.run_scan(source, convert_enabled).await
    }

    /// Scans `source` (or reuses the cached scan), checks capacity, then
    /// places every candidate into `destination` with `options`.
    ///
    /// Configuration, access and preflight problems are returned as errors
    /// before anything is written. Per-file failures are only counted.
    pub async fn process(
        &self,
        source: &Path,
        destination: &Path,
        scope: &dyn AccessScope,
        options: ProcessOptions,
        progress_tx: Option<mpsc::Sender<RunProgress>>,
    ) -> Result<RunReport, EngineError> {
        Self::check_access(scope, source)?;
        Self::check_access(scope, destination)?;
        let ValidatedRoots {
            source,
            destination,
        } = validate_roots(source, destination)?;
        if options.max_concurrency == 0 {
            return Err(ConfigError::ValidationError(
                "max_concurrency must be at least 1".to_string(),
            )
            .into());
        }

        let guard = self.phase.begin(Phase::Scan)?;
        let started = Instant::now();
        let started_at = Utc::now();
        let run_id = Uuid::new_v4();

        let scan = self.candidates_for(&source, options.convert_enabled).await?;
        if scan.status == ScanStatus::Cancelled {
            let counts = self.state.counts();
            self.emit(AuditEvent::ProcessFinished {
                status: RunStatus::Cancelled.to_string(),
                processed: 0,
                converted: 0,
                duplicates: 0,
                skipped: 0,
                errors: 0,
                elapsed_secs: started.elapsed().as_secs_f64(),
            })
            .await;
            return Ok(RunReport {
                run_id,
                status: RunStatus::Cancelled,
                counts,
                total_candidates: scan.candidates.len(),
                elapsed: started.elapsed(),
                dry_run: options.dry_run,
                preflight: None,
                audit_log_path: None,
            });
        }

        guard.advance(Phase::Preflight);
        let preflight = match check_capacity(
            self.capacity.as_ref(),
            &destination,
            &scan.candidates,
            self.config.preflight.safety_factor,
            options.dry_run,
        ) {
            Ok(report) => {
                match (report.shortfall_ignored, report.available_bytes) {
                    (true, Some(available)) => {
                        self.emit(AuditEvent::PreflightFailed {
                            required_bytes: report.required_bytes,
                            available_bytes: available,
                            blocking: false,
                        })
                        .await
                    }
                    _ => {
                        self.emit(AuditEvent::PreflightPassed {
                            required_bytes: report.required_bytes,
                            available_bytes: report.available_bytes,
                        })
                        .await
                    }
                }
                report
            }
            Err(e) => {
                let PreflightError::InsufficientSpace {
                    required_bytes,
                    available_bytes,
                    ..
                } = &e;
                tracing::error!(error = %e, "Preflight failed");
                self.emit(AuditEvent::PreflightFailed {
                    required_bytes: *required_bytes,
                    available_bytes: *available_bytes,
                    blocking: true,
                })
                .await;
                return Err(e.into());
            }
        };

        // Runs stopped before this point, and dry runs, keep the previous log.
        if !options.dry_run {
            self.oplog.clear();
            *lock(&self.last_destination) = Some(destination.clone());
        }

        guard.advance(Phase::Process);
        let total = scan.candidates.len();
        tracing::info!(
            total,
            dry_run = options.dry_run,
            copy_not_move = options.copy_not_move,
            convert_enabled = options.convert_enabled,
            skip_duplicates = options.skip_duplicates,
            concurrency = options.max_concurrency,
            "Processing"
        );
        self.emit(AuditEvent::ProcessStarted {
            source: source.clone(),
            destination: destination.clone(),
            total,
            dry_run: options.dry_run,
            copy_not_move: options.copy_not_move,
            convert_enabled: options.convert_enabled,
            skip_duplicates: options.skip_duplicates,
        })
        .await;

        let context = Arc::new(WorkerContext {
            converter: Arc::clone(&self.converter),
            placer: Arc::clone(&self.placer),
            state: Arc::clone(&self.state),
            oplog: Arc::clone(&self.oplog),
            audit: self.audit.clone(),
            options: options.clone(),
            formats: self.config.formats.clone(),
            layout: self.config.layout,
            destination: destination.clone(),
        });
        self.run_workers(context, scan.candidates, started, progress_tx)
            .await;

        let counts = self.state.counts();
        let status = if self.state.is_cancelled() {
            RunStatus::Cancelled
        } else {
            RunStatus::Complete
        };
        let elapsed = started.elapsed();

        tracing::info!(
            %status,
            processed = counts.processed,
            converted = counts.converted,
            duplicates = counts.duplicates,
            skipped = counts.skipped,
            errors = counts.errors,
            elapsed_secs = elapsed.as_secs_f64(),
            "Processing finished"
        );
        self.emit(AuditEvent::ProcessFinished {
            status: status.to_string(),
            processed: counts.processed,
            converted: counts.converted,
            duplicates: counts.duplicates,
            skipped: counts.skipped,
            errors: counts.errors,
            elapsed_secs: elapsed.as_secs_f64(),
        })
        .await;

        let audit_log_path = if options.dry_run || self.oplog.is_empty() {
            None
        } else {
            let log = AuditLogFile {
                run_id,
                started_at,
                finished_at: Utc::now(),
                source,
                destination,
                options: options.clone(),
                counts,
                operations: self.oplog.snapshot(),
            };
            match save_audit_log(&log, &self.config.output.audit_dir) {
                Ok(path) => Some(path),
                Err(e) => {
                    tracing::error!(error = %e, "Failed to save operation log; undo is still available in memory");
                    None
                }
            }
        };

        Ok(RunReport {
            run_id,
            status,
            counts,
            total_candidates: total,
            elapsed,
            dry_run: options.dry_run,
            preflight: Some(preflight),
            audit_log_path,
        })
    }

    /// Fans candidates out over at most `max_concurrency` tasks and waits
    /// for all of them.
    async fn run_workers(
        &self,
        context: Arc<WorkerContext<C>>,
        candidates: Vec<crate::scanner::MediaCandidate>,
        started: Instant,
        progress_tx: Option<mpsc::Sender<RunProgress>>,
    ) {
        let total = candidates.len();
        let semaphore = Arc::new(Semaphore::new(context.options.max_concurrency));
        let mut workers = JoinSet::new();

        for candidate in candidates {
            let context = Arc::clone(&context);
            let semaphore = Arc::clone(&semaphore);
            workers.spawn(async move {
                // The semaphore is never closed.
                let _permit = semaphore.acquire_owned().await.ok();
                let outcome = context.process(&candidate).await;
                (candidate.path, outcome)
            });
        }

        let mut completed = 0usize;
        while let Some(joined) = workers.join_next().await {
            completed += 1;
            let current_file = match joined {
                Ok((path, FileOutcome::Cancelled)) => {
                    tracing::debug!(path = %path.display(), "Not started, run was cancelled");
                    path
                }
                Ok((path, _)) => path,
                Err(e) => {
                    self.state.bump(Counter::Errors);
                    tracing::error!(error = %e, "Worker task failed");
                    PathBuf::new()
                }
            };

            if let Some(tx) = &progress_tx {
                let progress = RunProgress::new(
                    completed,
                    total,
                    self.state.counts(),
                    started.elapsed(),
                    current_file,
                );
                let _ = tx.try_send(progress);
            }
        }
    }

    /// Reverses the last process run.
    ///
    /// Not allowed while another phase runs. The in-memory log is cleared
    /// even when some entries fail.
    pub async fn undo(&self) -> Result<UndoOutcome, EngineError> {
        let _guard = self.phase.begin(Phase::Undo)?;

        let records = self.oplog.take();
        if records.is_empty() {
            tracing::info!("Nothing to undo");
            return Ok(UndoOutcome::NothingToUndo);
        }

        let root = lock(&self.last_destination).clone().unwrap_or_else(|| {
            records
                .iter()
                .filter_map(|r| r.destination_path.parent())
                .min_by_key(|p| p.components().count())
                .map(Path::to_path_buf)
                .unwrap_or_default()
        });

        tracing::info!(entries = records.len(), root = %root.display(), "Undoing last run");
        let report = undo_operations(&records, &root, self.audit.as_ref()).await;
        tracing::info!(
            removed = report.removed,
            missing = report.missing,
            failed = report.failures.len(),
            unrecoverable_moves = report.unrecoverable_moves.len(),
            "Undo finished"
        );
        Ok(UndoOutcome::Completed(report))
    }
}
