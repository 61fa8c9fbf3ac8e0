use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

use super::AuditEvent;

/// A run log event stamped at emission time.
#[derive(Debug, Clone)]
pub struct AuditEventEnvelope {
    /// Emission order across every clone of the handle.
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
    pub event: AuditEvent,
}

#[derive(Debug, Default)]
struct Counters {
    next_sequence: AtomicU64,
    lost: AtomicU64,
}

/// Sending side of the run log.
///
/// Clones share one channel and one sequence, so workers can each hold a
/// handle. Emitting never fails the caller: an event that cannot be
/// delivered is logged and counted in [`AuditHandle::lost_events`].
#[derive(Clone)]
pub struct AuditHandle {
    tx: mpsc::Sender<AuditEventEnvelope>,
    counters: Arc<Counters>,
}

impl AuditHandle {
    pub fn new(tx: mpsc::Sender<AuditEventEnvelope>) -> Self {
        Self {
            tx,
            counters: Arc::new(Counters::default()),
        }
    }

    fn stamp(&self, event: AuditEvent) -> AuditEventEnvelope {
        AuditEventEnvelope {
            sequence: self.counters.next_sequence.fetch_add(1, Ordering::Relaxed),
            timestamp: Utc::now(),
            event,
        }
    }

    fn record_loss(&self, event_type: &str, reason: impl std::fmt::Display) {
        self.counters.lost.fetch_add(1, Ordering::Relaxed);
        tracing::error!(event_type, "Run log event lost: {}", reason);
    }

    /// Sends `event`, waiting while the writer is behind.
    pub async fn emit(&self, event: AuditEvent) {
        let event_type = event.event_type();
        if let Err(e) = self.tx.send(self.stamp(event)).await {
            self.record_loss(event_type, e);
        }
    }

    /// Sends `event` from a blocking thread such as the scanner's walk.
    ///
    /// Panics if called from inside the async runtime, as
    /// [`mpsc::Sender::blocking_send`] does.
    pub fn emit_blocking(&self, event: AuditEvent) {
        let event_type = event.event_type();
        if let Err(e) = self.tx.blocking_send(self.stamp(event)) {
            self.record_loss(event_type, e);
        }
    }

    /// Events that never reached the writer.
    pub fn lost_events(&self) -> u64 {
        self.counters.lost.load(Ordering::Relaxed)
    }
}
