use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// What produced a destination file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Copy,
    Move,
    Convert,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Copy => write!(f, "copy"),
            Self::Move => write!(f, "move"),
            Self::Convert => write!(f, "convert"),
        }
    }
}

/// One successful destination-producing action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileOperationRecord {
    pub source_path: PathBuf,
    pub destination_path: PathBuf,
    pub operation: OperationKind,
    /// Whether the source file still existed after the action.
    pub source_retained: bool,
    pub timestamp: DateTime<Utc>,
}

impl FileOperationRecord {
    pub fn new(
        source_path: PathBuf,
        destination_path: PathBuf,
        operation: OperationKind,
        source_retained: bool,
    ) -> Self {
        Self {
            source_path,
            destination_path,
            operation,
            source_retained,
            timestamp: Utc::now(),
        }
    }
}

/// Append-only, thread-safe list of [`FileOperationRecord`]s for one run.
#[derive(Debug, Default)]
pub struct OperationLog {
    records: Mutex<Vec<FileOperationRecord>>,
}

impl OperationLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<FileOperationRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn append(&self, record: FileOperationRecord) {
        self.lock().push(record);
    }

    /// Copy of the records in append order.
    pub fn snapshot(&self) -> Vec<FileOperationRecord> {
        self.lock().clone()
    }

    /// Removes and returns every record, leaving the log empty.
    pub fn take(&self) -> Vec<FileOperationRecord> {
        std::mem::take(&mut *self.lock())
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str) -> FileOperationRecord {
        FileOperationRecord::new(
            PathBuf::from(format!("/src/{name}")),
            PathBuf::from(format!("/dst/{name}")),
            OperationKind::Copy,
            true,
        )
    }

    #[test]
    fn test_append_snapshot_take() {
        let log = OperationLog::new();
        assert!(log.is_empty());

        log.append(record("a.jpg"));
        log.append(record("b.jpg"));
        assert_eq!(log.len(), 2);

        let snapshot = log.snapshot();
        assert_eq!(snapshot[0].destination_path, PathBuf::from("/dst/a.jpg"));
        assert_eq!(log.len(), 2);

        let taken = log.take();
        assert_eq!(taken.len(), 2);
        assert!(log.is_empty());
    }

    #[test]
    fn test_concurrent_appends() {
        let log = OperationLog::new();
        std::thread::scope(|scope| {
            for i in 0..8 {
                let log = &log;
                scope.spawn(move || {
                    for j in 0..25 {
                        log.append(record(&format!("{i}-{j}.jpg")));
                    }
                });
            }
        });
        assert_eq!(log.len(), 200);
        log.clear();
        assert!(log.is_empty());
    }

    #[test]
    fn test_operation_kind_serialization() {
        assert_eq!(
            serde_json::to_string(&OperationKind::Convert).unwrap(),
            r#""convert""#
        );
        assert_eq!(OperationKind::Move.to_string(), "move");
    }
}
