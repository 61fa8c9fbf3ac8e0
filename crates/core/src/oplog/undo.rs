use std::path::{Path, PathBuf};
use tokio::fs;

use super::FileOperationRecord;
use crate::audit::{AuditEvent, AuditHandle};

/// A destination that could not be removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UndoFailure {
    pub path: PathBuf,
    pub error: String,
}

/// Outcome of replaying an operation log backwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UndoReport {
    /// Destination files deleted.
    pub removed: usize,
    /// Destination files that were already gone.
    pub missing: usize,
    /// Destination files that could not be deleted.
    pub failures: Vec<UndoFailure>,
    /// Sources of moves (or move-mode conversions) that no longer exist.
    pub unrecoverable_moves: Vec<PathBuf>,
}

impl UndoReport {
    /// Every entry was removed or already gone.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Removes `dir` and its ancestors while they are empty, stopping at `root`
/// (which is never removed) or at the first non-empty folder.
async fn prune_empty_parents(mut dir: &Path, root: &Path) {
    while dir != root && dir.starts_with(root) {
        if fs::remove_dir(dir).await.is_err() {
            break;
        }
        tracing::debug!(path = %dir.display(), "Removed empty folder");
        dir = match dir.parent() {
            Some(parent) => parent,
            None => break,
        };
    }
}

/// Reverses `records`, newest first: deletes each destination file and the
/// empty folders left under `destination_root`.
///
/// A destination that is already gone counts as undone. Failures are
/// collected per file and never stop the replay. Entries whose source no
/// longer exists are reported as unrecoverable.
pub async fn undo_operations(
    records: &[FileOperationRecord],
    destination_root: &Path,
    audit: Option<&AuditHandle>,
) -> UndoReport {
    let mut report = UndoReport::default();

    if let Some(audit) = audit {
        audit
            .emit(AuditEvent::UndoStarted {
                entries: records.len(),
            })
            .await;
    }

    for record in records.iter().rev() {
        let destination = &record.destination_path;

        match fs::remove_file(destination).await {
            Ok(()) => {
                report.removed += 1;
                tracing::debug!(path = %destination.display(), "Undo removed file");
                if let Some(audit) = audit {
                    audit
                        .emit(AuditEvent::UndoRemoved {
                            path: destination.clone(),
                        })
                        .await;
                }
                if let Some(parent) = destination.parent() {
                    prune_empty_parents(parent, destination_root).await;
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                report.missing += 1;
                tracing::debug!(path = %destination.display(), "Undo target already gone");
            }
            Err(e) => {
                tracing::error!(path = %destination.display(), error = %e, "Undo failed to remove file");
                if let Some(audit) = audit {
                    audit
                        .emit(AuditEvent::UndoEntryFailed {
                            path: destination.clone(),
                            error: e.to_string(),
                        })
                        .await;
                }
                report.failures.push(UndoFailure {
                    path: destination.clone(),
                    error: e.to_string(),
                });
            }
        }

        if !record.source_retained {
            tracing::warn!(
                source = %record.source_path.display(),
                destination = %destination.display(),
                "Original was moved and cannot be restored"
            );
            if let Some(audit) = audit {
                audit
                    .emit(AuditEvent::UndoMoveWarning {
                        source: record.source_path.clone(),
                        destination: destination.clone(),
                    })
                    .await;
            }
            report.unrecoverable_moves.push(record.source_path.clone());
        }
    }

    if let Some(audit) = audit {
        audit
            .emit(AuditEvent::UndoFinished {
                removed: report.removed,
                missing: report.missing,
                failed: report.failures.len(),
            })
            .await;
    }

    report
}
