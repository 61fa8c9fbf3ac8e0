//! Record of destination-producing actions, and their reversal.

mod persist;
mod record;
mod undo;

pub use persist::{load_audit_log, save_audit_log, AuditLogFile};
pub use record::{FileOperationRecord, OperationKind, OperationLog};
pub use undo::{undo_operations, UndoFailure, UndoReport};

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OplogError {
    #[error("I/O error on {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid operation log {path}: {reason}")]
    Format { path: PathBuf, reason: String },

    #[error("Serialization error: {0}")]
    Serialization(String),
}
