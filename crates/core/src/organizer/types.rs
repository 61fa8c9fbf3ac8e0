//! Types for the organizer.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use uuid::Uuid;

use crate::classify::MediaKind;
use crate::oplog::UndoReport;
use crate::preflight::PreflightReport;
use crate::scanner::{MediaCandidate, ScanStatus};
use crate::state::RunCounts;

/// Results of a scan, cached by the organizer for the next process call.
#[derive(Debug, Clone)]
pub struct ScanReport {
    pub source: PathBuf,
    pub status: ScanStatus,
    pub candidates: Vec<MediaCandidate>,
    pub scanned: u64,
    pub media_found: u64,
    /// Entries left out because they could not be read.
    pub unreadable: u64,
}

impl ScanReport {
    pub fn images(&self) -> usize {
        self.count_kind(MediaKind::Image)
    }

    pub fn videos(&self) -> usize {
        self.count_kind(MediaKind::Video)
    }

    pub fn needing_conversion(&self) -> usize {
        self.candidates.iter().filter(|c| c.needs_conversion).count()
    }

    pub fn total_bytes(&self) -> u64 {
        self.candidates.iter().map(|c| c.size_bytes).sum()
    }

    fn count_kind(&self, kind: MediaKind) -> usize {
        self.candidates.iter().filter(|c| c.kind == kind).count()
    }
}

/// Terminal status of a process run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Complete,
    Cancelled,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Complete => write!(f, "complete"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Summary of a finished process run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: Uuid,
    pub status: RunStatus,
    pub counts: RunCounts,
    pub total_candidates: usize,
    pub elapsed: Duration,
    pub dry_run: bool,
    /// `None` when the scan was cancelled before preflight.
    pub preflight: Option<PreflightReport>,
    /// Where the operation log was saved, if it was.
    pub audit_log_path: Option<PathBuf>,
}

/// Result of [`Organizer::undo`](super::Organizer::undo).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UndoOutcome {
    /// The operation log was already empty.
    NothingToUndo,
    Completed(UndoReport),
}
