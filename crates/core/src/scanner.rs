//! Source tree walk.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::{DirEntry, WalkDir};

use crate::audit::{AuditEvent, AuditHandle};
use crate::classify::{Classification, Classifier, MediaKind};
use crate::state::SharedState;

/// Directory extensions treated as opaque bundles and never descended into.
pub const PACKAGE_EXTENSIONS: &[&str] = &[
    "app",
    "bundle",
    "framework",
    "plugin",
    "kext",
    "pkg",
    "photoslibrary",
    "photolibrary",
    "aplibrary",
    "migratedphotolibrary",
    "imovielibrary",
    "fcpbundle",
    "lrdata",
    "lrlibrary",
    "musiclibrary",
    "tvlibrary",
    "xcodeproj",
];

/// A source file classified as media, queued for processing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaCandidate {
    pub path: PathBuf,
    pub kind: MediaKind,
    /// Original extension, as spelled on disk.
    pub extension: String,
    pub size_bytes: u64,
    pub created: Option<DateTime<Utc>>,
    pub needs_conversion: bool,
}

impl MediaCandidate {
    /// File name without its extension.
    pub fn base_name(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default()
    }
}

/// How a walk ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanStatus {
    Complete,
    /// Cancellation was observed; the candidate list is truncated.
    Cancelled,
}

/// Result of one walk.
#[derive(Debug, Clone)]
pub struct ScanOutcome {
    pub candidates: Vec<MediaCandidate>,
    pub status: ScanStatus,
    pub scanned: u64,
    pub media_found: u64,
    /// Entries that could not be read and were left out.
    pub unreadable: u64,
}

#[derive(Debug, Error)]
pub enum ScanError {
    /// The root itself could not be listed.
    #[error("Cannot read source folder {path}")]
    RootUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

fn is_package(entry: &DirEntry) -> bool {
    entry.file_type().is_dir()
        && entry
            .path()
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| PACKAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
            .unwrap_or(false)
}

/// Walks a source tree and classifies what it finds.
#[derive(Debug, Clone)]
pub struct Scanner {
    classifier: Classifier,
}

impl Scanner {
    pub fn new(classifier: Classifier) -> Self {
        Self { classifier }
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    /// Walks `root`, recording tallies in `state` as it goes.
    ///
    /// Blocking; run it on a blocking thread. Entries are visited in file
    /// name order. Hidden entries, package directories and anything that is
    /// not a regular file are skipped.
    /// Symlinks are not followed. Unreadable entries are logged and
    /// skipped. Cancellation is checked before every entry.
    pub fn scan(
        &self,
        root: &Path,
        state: &SharedState,
        audit: Option<&AuditHandle>,
    ) -> Result<ScanOutcome, ScanError> {
        std::fs::read_dir(root).map_err(|e| ScanError::RootUnreadable {
            path: root.to_path_buf(),
            source: e,
        })?;

        let mut outcome = ScanOutcome {
            candidates: Vec::new(),
            status: ScanStatus::Complete,
            scanned: 0,
            media_found: 0,
            unreadable: 0,
        };

        // The root is exempt from the hidden check; temp folders often start with a dot.
        let walker = WalkDir::new(root)
            .follow_links(false)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !(is_hidden(e) || is_package(e)));

        for entry in walker {
            if state.is_cancelled() {
                tracing::info!(
                    candidates = outcome.candidates.len(),
                    "Scan cancelled, keeping candidates found so far"
                );
                outcome.status = ScanStatus::Cancelled;
                break;
            }

            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e
                        .path()
                        .map(Path::to_path_buf)
                        .unwrap_or_else(|| root.to_path_buf());
                    self.skip_unreadable(&mut outcome, path, e.to_string(), audit);
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let metadata = match entry.metadata() {
                Ok(metadata) => metadata,
                Err(e) => {
                    self.skip_unreadable(&mut outcome, entry.path().to_path_buf(), e.to_string(), audit);
                    continue;
                }
            };

            let classification = self.classifier.classify_path(entry.path(), metadata.len());
            state.record_scanned(classification.is_media());
            outcome.scanned += 1;

            if let Classification::Media {
                kind,
                needs_conversion,
            } = classification
            {
                outcome.media_found += 1;
                let created = metadata
                    .created()
                    .or_else(|_| metadata.modified())
                    .ok()
                    .map(DateTime::<Utc>::from);

                outcome.candidates.push(MediaCandidate {
                    path: entry.path().to_path_buf(),
                    kind,
                    extension: entry
                        .path()
                        .extension()
                        .map(|e| e.to_string_lossy().to_string())
                        .unwrap_or_default(),
                    size_bytes: metadata.len(),
                    created,
                    needs_conversion,
                });
            }
        }

        tracing::debug!(
            root = %root.display(),
            scanned = outcome.scanned,
            media_found = outcome.media_found,
            unreadable = outcome.unreadable,
            "Walk finished"
        );
        Ok(outcome)
    }

    fn skip_unreadable(
        &self,
        outcome: &mut ScanOutcome,
        path: PathBuf,
        reason: String,
        audit: Option<&AuditHandle>,
    ) {
        tracing::warn!(path = %path.display(), error = %reason, "Skipping unreadable entry");
        outcome.unreadable += 1;
        if let Some(audit) = audit {
            audit.emit_blocking(AuditEvent::ScanEntrySkipped { path, reason });
        }
    }
}
