use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::state::RunCounts;

/// Advisory progress snapshot, sent after each finished file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunProgress {
    /// Candidates that reached any outcome so far.
    pub completed: usize,
    pub total: usize,
    pub processed: u64,
    pub duplicates: u64,
    pub errors: u64,
    pub skipped: u64,
    pub elapsed_secs: f64,
    /// Processed files per second since the run started.
    pub files_per_sec: f64,
    /// `None` until throughput can be estimated.
    pub eta_secs: Option<f64>,
    pub current_file: PathBuf,
}

impl RunProgress {
    pub fn new(
        completed: usize,
        total: usize,
        counts: RunCounts,
        elapsed: Duration,
        current_file: PathBuf,
    ) -> Self {
        let elapsed_secs = elapsed.as_secs_f64();
        let files_per_sec = if elapsed_secs > 0.0 {
            counts.processed as f64 / elapsed_secs
        } else {
            0.0
        };
        let remaining = total.saturating_sub(completed);
        let eta_secs = if remaining == 0 {
            Some(0.0)
        } else if files_per_sec > 0.0 {
            Some(remaining as f64 / files_per_sec)
        } else {
            None
        };

        Self {
            completed,
            total,
            processed: counts.processed,
            duplicates: counts.duplicates,
            errors: counts.errors,
            skipped: counts.skipped,
            elapsed_secs,
            files_per_sec,
            eta_secs,
            current_file,
        }
    }

    /// Share of candidates finished, in `0.0..=1.0`.
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.completed as f64 / self.total as f64
        }
    }
}
