//! Engine-level error types.

use std::path::PathBuf;
use thiserror::Error;

use crate::config::ConfigError;
use crate::converter::ConverterError;
use crate::oplog::OplogError;
use crate::organizer::Phase;
use crate::placer::PlacerError;
use crate::preflight::PreflightError;
use crate::scanner::ScanError;

/// Errors that stop a scan, process or undo call before or during a phase.
///
/// Per-file failures never surface here; see [`FileError`].
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("No access granted for {0}")]
    AccessDenied(PathBuf),

    #[error(transparent)]
    Preflight(#[from] PreflightError),

    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error("Another {0} phase is already running")]
    Busy(Phase),

    #[error("Background task failed: {0}")]
    Task(String),

    #[error(transparent)]
    Oplog(#[from] OplogError),
}

/// A failure confined to one candidate. Logged and counted, never propagated.
#[derive(Debug, Error)]
pub enum FileError {
    #[error("Cannot read {path}")]
    SourceUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Placement(#[from] PlacerError),

    #[error(transparent)]
    Conversion(#[from] ConverterError),

    /// The blocking task picking a destination name did not finish.
    #[error("Could not reserve a destination name for {path}: {reason}")]
    Reservation { path: PathBuf, reason: String },
}
