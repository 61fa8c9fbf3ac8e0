//! Run-scoped shared state.
//!
//! All counters, the processed-hash set, the reserved-path set and the
//! cancellation flag live in one [`RunState`] behind a single mutex. Worker
//! code only sees the compound operations exposed here, never the fields.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::hasher::ContentHash;

/// Snapshot of the run counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunCounts {
    pub scanned: u64,
    pub media_found: u64,
    pub processed: u64,
    pub converted: u64,
    pub duplicates: u64,
    pub skipped: u64,
    pub errors: u64,
}

impl RunCounts {
    /// Candidates that reached a terminal per-file outcome.
    pub fn considered(&self) -> u64 {
        self.processed + self.duplicates + self.errors + self.skipped
    }
}

/// Individually bumpable counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Counter {
    Scanned,
    MediaFound,
    Duplicates,
    Skipped,
    Errors,
}

/// The mutable record for one run.
#[derive(Debug, Default)]
pub struct RunState {
    counts: RunCounts,
    cancelled: bool,
    processed_hashes: HashSet<ContentHash>,
    reserved_paths: HashSet<PathBuf>,
}

/// Thread-safe owner of the [`RunState`].
#[derive(Debug, Default)]
pub struct SharedState {
    inner: Mutex<RunState>,
}

impl SharedState {
    pub fn new() -> Self {
        Self::default()
    }

    // Every critical section leaves the record consistent, so a panic in
    // another holder doesn't invalidate it.
    fn lock(&self) -> MutexGuard<'_, RunState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Clears everything, including scan tallies. Start of a scan phase.
    pub fn reset(&self) {
        *self.lock() = RunState::default();
    }

    /// Clears the processing counters, hash and reservation sets and the
    /// cancellation flag, keeping the scan tallies. Start of a process phase.
    pub fn reset_for_processing(&self) {
        let mut state = self.lock();
        let scanned = state.counts.scanned;
        let media_found = state.counts.media_found;
        *state = RunState::default();
        state.counts.scanned = scanned;
        state.counts.media_found = media_found;
    }

    pub fn counts(&self) -> RunCounts {
        self.lock().counts
    }

    pub fn bump(&self, counter: Counter) {
        let mut state = self.lock();
        let slot = match counter {
            Counter::Scanned => &mut state.counts.scanned,
            Counter::MediaFound => &mut state.counts.media_found,
            Counter::Duplicates => &mut state.counts.duplicates,
            Counter::Skipped => &mut state.counts.skipped,
            Counter::Errors => &mut state.counts.errors,
        };
        *slot += 1;
    }

    /// Records one scanned entry, and whether it was media, in one step.
    pub fn record_scanned(&self, is_media: bool) {
        let mut state = self.lock();
        state.counts.scanned += 1;
        if is_media {
            state.counts.media_found += 1;
        }
    }

    /// Records a successfully processed candidate. Both counters move under
    /// the same lock so `processed >= converted` holds for every snapshot.
    pub fn record_processed(&self, converted: bool) {
        let mut state = self.lock();
        state.counts.processed += 1;
        if converted {
            state.counts.converted += 1;
        }
    }

    /// Inserts `hash` into the processed set.
    ///
    /// Returns `true` if the hash was new (this caller owns the content),
    /// `false` if another candidate already claimed it.
    pub fn insert_hash(&self, hash: ContentHash) -> bool {
        self.lock().processed_hashes.insert(hash)
    }

    /// Claims `path` if it is neither reserved in this run nor present on
    /// disk.
    ///
    /// The filesystem probe runs before the lock is taken. Every file this
    /// run writes is reserved before it exists, so the set insert alone
    /// decides between concurrent callers.
    pub fn try_reserve(&self, path: &Path) -> bool {
        if self.is_reserved(path) {
            return false;
        }
        // symlink_metadata so a dangling link still counts as occupied.
        if std::fs::symlink_metadata(path).is_ok() {
            return false;
        }
        self.lock().reserved_paths.insert(path.to_path_buf())
    }

    pub fn is_reserved(&self, path: &Path) -> bool {
        self.lock().reserved_paths.contains(path)
    }

    pub fn reserved_count(&self) -> usize {
        self.lock().reserved_paths.len()
    }

    pub fn cancel(&self) {
        self.lock().cancelled = true;
    }

    pub fn is_cancelled(&self) -> bool {
        self.lock().cancelled
    }
}
