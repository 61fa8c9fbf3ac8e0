//! Per-candidate processing.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;

use crate::audit::{AuditEvent, AuditHandle};
use crate::classify::MediaKind;
use crate::config::{FormatConfig, Layout, ProcessOptions};
use crate::converter::{ConversionJob, Converter};
use crate::error::FileError;
use crate::hasher;
use crate::naming;
use crate::oplog::{FileOperationRecord, OperationKind, OperationLog};
use crate::placer::FsPlacer;
use crate::scanner::MediaCandidate;
use crate::state::{Counter, SharedState};

/// How one candidate ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum FileOutcome {
    Processed { converted: bool },
    Duplicate,
    Skipped,
    Failed,
    /// Cancellation was observed before anything was written.
    Cancelled,
}

/// Everything a worker needs, shared read-only across the pool.
pub(crate) struct WorkerContext<C: Converter> {
    pub converter: Arc<C>,
    pub placer: Arc<FsPlacer>,
    pub state: Arc<SharedState>,
    pub oplog: Arc<OperationLog>,
    pub audit: Option<AuditHandle>,
    pub options: ProcessOptions,
    pub formats: FormatConfig,
    pub layout: Layout,
    pub destination: PathBuf,
}

/// A destination file that was produced.
struct Placed {
    destination: PathBuf,
    operation: OperationKind,
    source_retained: bool,
    converted: bool,
}

impl<C: Converter> WorkerContext<C> {
    async fn emit(&self, event: AuditEvent) {
        if let Some(audit) = &self.audit {
            audit.emit(event).await;
        }
    }

    /// Runs one candidate to a terminal outcome and updates the counters.
    pub async fn process(&self, candidate: &MediaCandidate) -> FileOutcome {
        if self.state.is_cancelled() {
            return FileOutcome::Cancelled;
        }

        match fs::symlink_metadata(&candidate.path).await {
            Ok(meta) if meta.is_file() => {}
            Ok(_) => return self.skip(candidate, "no longer a regular file").await,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return self.skip(candidate, "source no longer exists").await;
            }
            Err(e) => {
                return self
                    .fail(candidate, FileError::SourceUnreadable {
                        path: candidate.path.clone(),
                        source: e,
                    })
                    .await;
            }
        }

        if let Err(e) = fs::File::open(&candidate.path).await {
            return self
                .fail(candidate, FileError::SourceUnreadable {
                    path: candidate.path.clone(),
                    source: e,
                })
                .await;
        }

        if self.options.skip_duplicates && self.is_duplicate(candidate).await {
            return FileOutcome::Duplicate;
        }

        if self.state.is_cancelled() {
            return FileOutcome::Cancelled;
        }

        let convert = self.options.convert_enabled && candidate.needs_conversion;
        let folder = self
            .layout
            .folder_for(&self.destination, candidate.kind, candidate.created);
        let extension = if convert {
            self.formats.target_for(candidate.kind).to_string()
        } else {
            candidate.extension.clone()
        };

        if self.options.dry_run {
            let destination = match self.reserve(candidate, &folder, &extension).await {
                Ok(destination) => destination,
                Err(e) => return self.fail(candidate, e).await,
            };
            let operation = self.plain_operation(convert);
            tracing::info!(
                source = %candidate.path.display(),
                destination = %destination.display(),
                %operation,
                "Dry run: would place file"
            );
            self.emit(AuditEvent::DryRunPlanned {
                source: candidate.path.clone(),
                destination,
                operation,
            })
            .await;
            self.state.record_processed(convert);
            return FileOutcome::Processed { converted: convert };
        }

        let result = if convert {
            self.convert(candidate, &folder, &extension).await
        } else {
            self.place(candidate, &folder, &extension).await
        };

        match result {
            Ok(placed) => {
                self.oplog.append(FileOperationRecord::new(
                    candidate.path.clone(),
                    placed.destination.clone(),
                    placed.operation,
                    placed.source_retained,
                ));
                self.state.record_processed(placed.converted);
                tracing::debug!(
                    source = %candidate.path.display(),
                    destination = %placed.destination.display(),
                    operation = %placed.operation,
                    "File placed"
                );
                self.emit(AuditEvent::FileProcessed {
                    source: candidate.path.clone(),
                    destination: placed.destination,
                    operation: placed.operation,
                })
                .await;
                FileOutcome::Processed {
                    converted: placed.converted,
                }
            }
            Err(e) => self.fail(candidate, e).await,
        }
    }

    fn plain_operation(&self, convert: bool) -> OperationKind {
        if convert {
            OperationKind::Convert
        } else if self.options.copy_not_move {
            OperationKind::Copy
        } else {
            OperationKind::Move
        }
    }

    /// Hashes the candidate and claims its content. A hashing failure means
    /// the file is processed without a duplicate check.
    async fn is_duplicate(&self, candidate: &MediaCandidate) -> bool {
        match hasher::digest(&candidate.path).await {
            Ok(hash) => {
                if self.state.insert_hash(hash.clone()) {
                    return false;
                }
                self.state.bump(Counter::Duplicates);
                tracing::info!(
                    source = %candidate.path.display(),
                    hash = hash.short(),
                    "Skipping duplicate"
                );
                self.emit(AuditEvent::DuplicateSkipped {
                    source: candidate.path.clone(),
                    hash: hash.to_string(),
                })
                .await;
                true
            }
            Err(e) => {
                tracing::warn!(
                    source = %candidate.path.display(),
                    error = %e,
                    "Hashing failed, processing without duplicate check"
                );
                self.emit(AuditEvent::HashFallback {
                    source: candidate.path.clone(),
                    error: error_chain(&e),
                })
                .await;
                false
            }
        }
    }

    /// Picks a unique destination name on a blocking thread; reservation
    /// probes the disk for every attempt.
    async fn reserve(
        &self,
        candidate: &MediaCandidate,
        folder: &Path,
        extension: &str,
    ) -> Result<PathBuf, FileError> {
        let state = Arc::clone(&self.state);
        let folder = folder.to_path_buf();
        let base_name = candidate.base_name();
        let extension = extension.to_string();
        tokio::task::spawn_blocking(move || {
            naming::reserve(&state, &folder, &base_name, &extension)
        })
        .await
        .map_err(|e| FileError::Reservation {
            path: candidate.path.clone(),
            reason: e.to_string(),
        })
    }

    /// Copies or moves the candidate into `folder` under a reserved name.
    async fn place(
        &self,
        candidate: &MediaCandidate,
        folder: &Path,
        extension: &str,
    ) -> Result<Placed, FileError> {
        let destination = self.reserve(candidate, folder, extension).await?;
        self.placer.ensure_folder(folder).await?;

        if self.options.copy_not_move {
            let placed = self.placer.copy(&candidate.path, &destination).await?;
            Ok(Placed {
                destination: placed.destination,
                operation: OperationKind::Copy,
                source_retained: true,
                converted: false,
            })
        } else {
            let placed = self.placer.relocate(&candidate.path, &destination).await?;
            Ok(Placed {
                destination: placed.destination,
                operation: OperationKind::Move,
                source_retained: placed.method.source_retained(),
                converted: false,
            })
        }
    }

    /// Converts the candidate into `folder`. A missing video tool degrades
    /// to a plain placement of the original.
    async fn convert(
        &self,
        candidate: &MediaCandidate,
        folder: &Path,
        extension: &str,
    ) -> Result<Placed, FileError> {
        let destination = self.reserve(candidate, folder, extension).await?;
        self.placer.ensure_folder(folder).await?;

        let job = ConversionJob {
            input_path: candidate.path.clone(),
            output_path: destination,
            kind: candidate.kind,
        };

        let result = match self.converter.convert(job).await {
            Ok(result) => result,
            Err(e) if e.is_tool_missing() && candidate.kind == MediaKind::Video => {
                tracing::warn!(
                    source = %candidate.path.display(),
                    error = %e,
                    "No video converter available, placing original instead"
                );
                self.emit(AuditEvent::ConversionDegraded {
                    source: candidate.path.clone(),
                    tool: self.converter.name().to_string(),
                })
                .await;
                return self
                    .place(candidate, folder, &candidate.extension)
                    .await;
            }
            Err(e) => return Err(e.into()),
        };

        let source_retained = if self.options.copy_not_move {
            true
        } else {
            match self.placer.remove_source(&candidate.path).await {
                Ok(()) => false,
                Err(e) => {
                    tracing::warn!(error = %e, "Converted file left its source behind");
                    true
                }
            }
        };

        Ok(Placed {
            destination: result.output_path,
            operation: OperationKind::Convert,
            source_retained,
            converted: true,
        })
    }

    async fn skip(&self, candidate: &MediaCandidate, reason: &str) -> FileOutcome {
        self.state.bump(Counter::Skipped);
        tracing::warn!(source = %candidate.path.display(), reason, "Skipping file");
        self.emit(AuditEvent::FileSkipped {
            source: candidate.path.clone(),
            reason: reason.to_string(),
        })
        .await;
        FileOutcome::Skipped
    }

    async fn fail(&self, candidate: &MediaCandidate, error: FileError) -> FileOutcome {
        self.state.bump(Counter::Errors);
        let message = error_chain(&error);
        tracing::error!(source = %candidate.path.display(), error = %message, "File failed");
        self.emit(AuditEvent::FileFailed {
            source: candidate.path.clone(),
            error: message,
        })
        .await;
        FileOutcome::Failed
    }
}

/// Joins an error with its sources into one line.
fn error_chain(error: &dyn std::error::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(inner) = source {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        source = inner.source();
    }
    message
}
