use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::oplog::OperationKind;

/// How loudly an event should be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => f.pad("INFO"),
            Self::Warning => f.pad("WARN"),
            Self::Error => f.pad("ERROR"),
        }
    }
}

/// Run log event types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditEvent {
    // Scan phase
    ScanStarted {
        source: PathBuf,
    },
    ScanEntrySkipped {
        path: PathBuf,
        reason: String,
    },
    ScanCompleted {
        scanned: u64,
        media_found: u64,
        cancelled: bool,
    },

    // Preflight
    PreflightPassed {
        required_bytes: u64,
        /// None when capacity could not be determined.
        available_bytes: Option<u64>,
    },
    PreflightFailed {
        required_bytes: u64,
        available_bytes: u64,
        /// False for dry runs, which only warn.
        blocking: bool,
    },

    // Process phase
    ProcessStarted {
        source: PathBuf,
        destination: PathBuf,
        total: usize,
        dry_run: bool,
        copy_not_move: bool,
        convert_enabled: bool,
        skip_duplicates: bool,
    },
    FileProcessed {
        source: PathBuf,
        destination: PathBuf,
        operation: OperationKind,
    },
    DryRunPlanned {
        source: PathBuf,
        destination: PathBuf,
        operation: OperationKind,
    },
    DuplicateSkipped {
        source: PathBuf,
        hash: String,
    },
    FileSkipped {
        source: PathBuf,
        reason: String,
    },
    FileFailed {
        source: PathBuf,
        error: String,
    },
    /// Hashing failed, so the file was processed without a duplicate check.
    HashFallback {
        source: PathBuf,
        error: String,
    },
    /// A video converter was missing, so the original was copied as-is.
    ConversionDegraded {
        source: PathBuf,
        tool: String,
    },
    ProcessFinished {
        status: String,
        processed: u64,
        converted: u64,
        duplicates: u64,
        skipped: u64,
        errors: u64,
        elapsed_secs: f64,
    },

    // Undo
    UndoStarted {
        entries: usize,
    },
    UndoRemoved {
        path: PathBuf,
    },
    /// The original of a move no longer exists and cannot be restored.
    UndoMoveWarning {
        source: PathBuf,
        destination: PathBuf,
    },
    UndoEntryFailed {
        path: PathBuf,
        error: String,
    },
    UndoFinished {
        removed: usize,
        missing: usize,
        failed: usize,
    },
}

impl AuditEvent {
    /// Returns the event type as a string for storage
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::ScanStarted { .. } => "scan_started",
            Self::ScanEntrySkipped { .. } => "scan_entry_skipped",
            Self::ScanCompleted { .. } => "scan_completed",
            Self::PreflightPassed { .. } => "preflight_passed",
            Self::PreflightFailed { .. } => "preflight_failed",
            Self::ProcessStarted { .. } => "process_started",
            Self::FileProcessed { .. } => "file_processed",
            Self::DryRunPlanned { .. } => "dry_run_planned",
            Self::DuplicateSkipped { .. } => "duplicate_skipped",
            Self::FileSkipped { .. } => "file_skipped",
            Self::FileFailed { .. } => "file_failed",
            Self::HashFallback { .. } => "hash_fallback",
            Self::ConversionDegraded { .. } => "conversion_degraded",
            Self::ProcessFinished { .. } => "process_finished",
            Self::UndoStarted { .. } => "undo_started",
            Self::UndoRemoved { .. } => "undo_removed",
            Self::UndoMoveWarning { .. } => "undo_move_warning",
            Self::UndoEntryFailed { .. } => "undo_entry_failed",
            Self::UndoFinished { .. } => "undo_finished",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Self::FileFailed { .. } | Self::UndoEntryFailed { .. } => Severity::Error,
            Self::PreflightFailed { blocking: true, .. } => Severity::Error,
            Self::ScanEntrySkipped { .. }
            | Self::PreflightFailed { .. }
            | Self::HashFallback { .. }
            | Self::ConversionDegraded { .. }
            | Self::UndoMoveWarning { .. } => Severity::Warning,
            _ => Severity::Info,
        }
    }
}

fn mib(bytes: u64) -> f64 {
    bytes as f64 / (1024.0 * 1024.0)
}

impl fmt::Display for AuditEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ScanStarted { source } => write!(f, "Scanning {}", source.display()),
            Self::ScanEntrySkipped { path, reason } => {
                write!(f, "Skipped unreadable entry {}: {}", path.display(), reason)
            }
            Self::ScanCompleted {
                scanned,
                media_found,
                cancelled,
            } => {
                let outcome = if *cancelled { "cancelled" } else { "complete" };
                write!(
                    f,
                    "Scan {outcome}: {scanned} files scanned, {media_found} media files found"
                )
            }
            Self::PreflightPassed {
                required_bytes,
                available_bytes: Some(available),
            } => write!(
                f,
                "Disk space check passed: need {:.1} MiB, {:.1} MiB available",
                mib(*required_bytes),
                mib(*available)
            ),
            Self::PreflightPassed {
                required_bytes,
                available_bytes: None,
            } => write!(
                f,
                "Could not determine free space; proceeding (need {:.1} MiB)",
                mib(*required_bytes)
            ),
            Self::PreflightFailed {
                required_bytes,
                available_bytes,
                blocking,
            } => {
                let suffix = if *blocking {
                    ""
                } else {
                    " (dry run, continuing)"
                };
                write!(
                    f,
                    "Not enough disk space: need {:.1} MiB, {:.1} MiB available{suffix}",
                    mib(*required_bytes),
                    mib(*available_bytes)
                )
            }
            Self::ProcessStarted {
                source,
                destination,
                total,
                dry_run,
                copy_not_move,
                convert_enabled,
                skip_duplicates,
            } => write!(
                f,
                "{}{} {} files from {} to {} (convert: {}, skip duplicates: {})",
                if *dry_run { "[dry run] " } else { "" },
                if *copy_not_move { "Copying" } else { "Moving" },
                total,
                source.display(),
                destination.display(),
                if *convert_enabled { "on" } else { "off" },
                if *skip_duplicates { "on" } else { "off" },
            ),
            Self::FileProcessed {
                source,
                destination,
                operation,
            } => write!(
                f,
                "{}: {} -> {}",
                operation,
                source.display(),
                destination.display()
            ),
            Self::DryRunPlanned {
                source,
                destination,
                operation,
            } => write!(
                f,
                "[dry run] would {}: {} -> {}",
                operation,
                source.display(),
                destination.display()
            ),
            Self::DuplicateSkipped { source, hash } => write!(
                f,
                "Duplicate skipped: {} ({})",
                source.display(),
                &hash[..hash.len().min(12)]
            ),
            Self::FileSkipped { source, reason } => {
                write!(f, "Skipped {}: {}", source.display(), reason)
            }
            Self::FileFailed { source, error } => {
                write!(f, "Failed {}: {}", source.display(), error)
            }
            Self::HashFallback { source, error } => write!(
                f,
                "Could not hash {} ({}); processing without duplicate check",
                source.display(),
                error
            ),
            Self::ConversionDegraded { source, tool } => write!(
                f,
                "{} not available; copying {} without conversion",
                tool,
                source.display()
            ),
            Self::ProcessFinished {
                status,
                processed,
                converted,
                duplicates,
                skipped,
                errors,
                elapsed_secs,
            } => write!(
                f,
                "Processing {status} in {elapsed_secs:.1}s: {processed} processed \
                 ({converted} converted), {duplicates} duplicates, {skipped} skipped, {errors} errors"
            ),
            Self::UndoStarted { entries } => write!(f, "Undoing {entries} operations"),
            Self::UndoRemoved { path } => write!(f, "Removed {}", path.display()),
            Self::UndoMoveWarning {
                source,
                destination,
            } => write!(
                f,
                "{} was moved, not copied; the original at {} cannot be restored",
                destination.display(),
                source.display()
            ),
            Self::UndoEntryFailed { path, error } => {
                write!(f, "Failed to remove {}: {}", path.display(), error)
            }
            Self::UndoFinished {
                removed,
                missing,
                failed,
            } => write!(
                f,
                "Undo finished: {removed} removed, {missing} already gone, {failed} failed"
            ),
        }
    }
}

/// A stored audit record with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub severity: Severity,
    pub data: AuditEvent,
}

impl AuditRecord {
    /// One human-readable run log line.
    pub fn line(&self) -> String {
        format!(
            "[{}] {:<5} {}",
            self.timestamp
                .with_timezone(&chrono::Local)
                .format("%Y-%m-%d %H:%M:%S"),
            self.severity,
            self.data
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_and_severity() {
        let event = AuditEvent::ScanStarted {
            source: PathBuf::from("/photos"),
        };
        assert_eq!(event.event_type(), "scan_started");
        assert_eq!(event.severity(), Severity::Info);

        let event = AuditEvent::FileFailed {
            source: PathBuf::from("/photos/a.jpg"),
            error: "permission denied".to_string(),
        };
        assert_eq!(event.event_type(), "file_failed");
        assert_eq!(event.severity(), Severity::Error);

        let event = AuditEvent::UndoMoveWarning {
            source: PathBuf::from("/photos/a.jpg"),
            destination: PathBuf::from("/sorted/a.jpg"),
        };
        assert_eq!(event.severity(), Severity::Warning);
    }

    #[test]
    fn test_preflight_severity_depends_on_blocking() {
        let blocking = AuditEvent::PreflightFailed {
            required_bytes: 10,
            available_bytes: 1,
            blocking: true,
        };
        let advisory = AuditEvent::PreflightFailed {
            required_bytes: 10,
            available_bytes: 1,
            blocking: false,
        };
        assert_eq!(blocking.severity(), Severity::Error);
        assert_eq!(advisory.severity(), Severity::Warning);
        assert!(advisory.to_string().contains("dry run"));
    }

    #[test]
    fn test_serialization_is_tagged() {
        let event = AuditEvent::FileProcessed {
            source: PathBuf::from("/photos/a.jpg"),
            destination: PathBuf::from("/sorted/a.jpg"),
            operation: OperationKind::Copy,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"file_processed""#));
        assert!(json.contains(r#""operation":"copy""#));

        let parsed: AuditEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, event);
    }

    #[test]
    fn test_display_messages() {
        let event = AuditEvent::ScanCompleted {
            scanned: 10,
            media_found: 3,
            cancelled: false,
        };
        assert_eq!(
            event.to_string(),
            "Scan complete: 10 files scanned, 3 media files found"
        );

        let event = AuditEvent::DuplicateSkipped {
            source: PathBuf::from("/photos/b.jpg"),
            hash: "0123456789abcdef".to_string(),
        };
        assert_eq!(
            event.to_string(),
            "Duplicate skipped: /photos/b.jpg (0123456789ab)"
        );
    }

    #[test]
    fn test_record_line_contains_level_and_message() {
        let record = AuditRecord {
            id: 1,
            timestamp: Utc::now(),
            event_type: "undo_started".to_string(),
            severity: Severity::Info,
            data: AuditEvent::UndoStarted { entries: 2 },
        };
        let line = record.line();
        assert!(line.contains("INFO"));
        assert!(line.ends_with("Undoing 2 operations"));
    }
}
