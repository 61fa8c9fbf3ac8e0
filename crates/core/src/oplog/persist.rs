use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use super::{FileOperationRecord, OplogError};
use crate::config::ProcessOptions;
use crate::state::RunCounts;

/// The on-disk form of a finished run, readable back for undo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditLogFile {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub source: PathBuf,
    pub destination: PathBuf,
    pub options: ProcessOptions,
    pub counts: RunCounts,
    pub operations: Vec<FileOperationRecord>,
}

/// Writes `log` as pretty JSON to `<dir>/mediasort-YYYYMMDD-HHMMSS.json`.
///
/// Never overwrites an earlier log; a numeric suffix is added instead.
pub fn save_audit_log(log: &AuditLogFile, dir: &Path) -> Result<PathBuf, OplogError> {
    let io_err = |path: &Path, source| OplogError::Io {
        path: path.to_path_buf(),
        source,
    };

    std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
    let json =
        serde_json::to_string_pretty(log).map_err(|e| OplogError::Serialization(e.to_string()))?;

    let stamp = log
        .finished_at
        .with_timezone(&Local)
        .format("%Y%m%d-%H%M%S")
        .to_string();

    let mut attempt = 0u32;
    loop {
        let name = if attempt == 0 {
            format!("mediasort-{stamp}.json")
        } else {
            format!("mediasort-{stamp}_{attempt}.json")
        };
        let path = dir.join(name);

        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
        {
            Ok(mut file) => {
                file.write_all(json.as_bytes())
                    .map_err(|e| io_err(&path, e))?;
                tracing::info!(path = %path.display(), operations = log.operations.len(), "Saved operation log");
                return Ok(path);
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => attempt += 1,
            Err(e) => return Err(io_err(&path, e)),
        }
    }
}

/// Reads a log written by [`save_audit_log`].
pub fn load_audit_log(path: &Path) -> Result<AuditLogFile, OplogError> {
    let contents = std::fs::read_to_string(path).map_err(|e| OplogError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    serde_json::from_str(&contents).map_err(|e| OplogError::Format {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}
