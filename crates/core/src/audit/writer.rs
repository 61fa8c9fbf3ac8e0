use std::sync::Arc;

use tokio::sync::mpsc;

use super::{AuditEventEnvelope, AuditHandle, AuditRecord, AuditStore, Severity};

/// What the writer did before its channel closed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriterSummary {
    pub written: u64,
    /// Events the store refused.
    pub failed: u64,
    /// Events that arrived with a lower sequence than one already written.
    pub reordered: u64,
}

/// Drains run log events into an [`AuditStore`], mirroring each to `tracing`
/// at its severity under the `mediasort::run` target.
pub struct AuditWriter {
    rx: mpsc::Receiver<AuditEventEnvelope>,
    store: Arc<dyn AuditStore>,
}

impl AuditWriter {
    pub fn new(rx: mpsc::Receiver<AuditEventEnvelope>, store: Arc<dyn AuditStore>) -> Self {
        Self { rx, store }
    }

    /// Runs until every [`AuditHandle`] is dropped.
    pub async fn run(mut self) -> WriterSummary {
        let mut summary = WriterSummary::default();
        let mut last_sequence: Option<u64> = None;

        while let Some(AuditEventEnvelope {
            sequence,
            timestamp,
            event,
        }) = self.rx.recv().await
        {
            if last_sequence.is_some_and(|last| sequence < last) {
                summary.reordered += 1;
            }
            last_sequence = Some(last_sequence.map_or(sequence, |last| last.max(sequence)));

            let severity = event.severity();
            match severity {
                Severity::Info => tracing::info!(target: "mediasort::run", "{}", event),
                Severity::Warning => tracing::warn!(target: "mediasort::run", "{}", event),
                Severity::Error => tracing::error!(target: "mediasort::run", "{}", event),
            }

            let record = AuditRecord {
                id: 0,
                timestamp,
                event_type: event.event_type().to_string(),
                severity,
                data: event,
            };
            match self.store.insert(&record) {
                Ok(_) => summary.written += 1,
                Err(e) => {
                    summary.failed += 1;
                    tracing::error!(sequence, "Run log store rejected event: {}", e);
                }
            }
        }

        tracing::debug!(
            written = summary.written,
            failed = summary.failed,
            "Run log writer finished"
        );
        summary
    }
}

/// Builds a connected handle and writer; spawn `writer.run()` and share the
/// handle. Emitters wait once `buffer_size` events are queued.
pub fn create_audit_system(
    store: Arc<dyn AuditStore>,
    buffer_size: usize,
) -> (AuditHandle, AuditWriter) {
    let (tx, rx) = mpsc::channel(buffer_size);
    (AuditHandle::new(tx), AuditWriter::new(rx, store))
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Mutex;
    use std::time::Duration;

    use super::*;
    use crate::audit::{AuditError, AuditEvent, AuditFilter, MemoryAuditStore};

    /// Store whose inserts always fail
    struct FailingStore {
        attempts: Mutex<usize>,
    }

    impl AuditStore for FailingStore {
        fn insert(&self, _record: &AuditRecord) -> Result<i64, AuditError> {
            *self.attempts.lock().unwrap() += 1;
            Err(AuditError::Storage("Mock failure".to_string()))
        }

        fn query(&self, _filter: &AuditFilter) -> Result<Vec<AuditRecord>, AuditError> {
            Ok(Vec::new())
        }

        fn count(&self, _filter: &AuditFilter) -> Result<i64, AuditError> {
            Ok(0)
        }
    }

    #[tokio::test]
    async fn test_writer_stores_events_in_order() {
        let store = Arc::new(MemoryAuditStore::new());
        let (handle, writer) = create_audit_system(Arc::clone(&store) as Arc<dyn AuditStore>, 10);
        let writer_task = tokio::spawn(writer.run());

        handle
            .emit(AuditEvent::ScanStarted {
                source: PathBuf::from("/photos"),
            })
            .await;
        handle
            .emit(AuditEvent::FileFailed {
                source: PathBuf::from("/photos/a.jpg"),
                error: "unreadable".to_string(),
            })
            .await;
        drop(handle);

        let summary = writer_task.await.unwrap();
        assert_eq!(
            summary,
            WriterSummary {
                written: 2,
                failed: 0,
                reordered: 0
            }
        );

        let records = store.records();
        assert_eq!(records[0].event_type, "scan_started");
        assert_eq!(records[1].event_type, "file_failed");
        assert_eq!(records[1].severity, Severity::Error);
    }

    #[tokio::test]
    async fn test_writer_counts_store_failures() {
        let store = Arc::new(FailingStore {
            attempts: Mutex::new(0),
        });
        let (handle, writer) = create_audit_system(Arc::clone(&store) as Arc<dyn AuditStore>, 10);
        let writer_task = tokio::spawn(writer.run());

        handle.emit(AuditEvent::UndoStarted { entries: 1 }).await;
        handle.emit(AuditEvent::UndoStarted { entries: 2 }).await;
        drop(handle);

        let summary = writer_task.await.unwrap();
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.written, 0);
        assert_eq!(*store.attempts.lock().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_writer_runs_until_last_handle_drops() {
        let store = Arc::new(MemoryAuditStore::new());
        let (main_handle, writer) =
            create_audit_system(Arc::clone(&store) as Arc<dyn AuditStore>, 10);
        let worker_handle = main_handle.clone();
        let writer_task = tokio::spawn(writer.run());

        worker_handle
            .emit(AuditEvent::UndoStarted { entries: 0 })
            .await;
        drop(main_handle);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!writer_task.is_finished());

        drop(worker_handle);
        let summary = tokio::time::timeout(Duration::from_secs(1), writer_task)
            .await
            .expect("writer should exit once every handle is gone")
            .unwrap();
        assert_eq!(summary.written, 1);
    }
}
