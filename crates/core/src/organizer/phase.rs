use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::EngineError;

/// What the organizer is doing right now.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Phase {
    #[default]
    Idle,
    Scan,
    Preflight,
    Process,
    Undo,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Scan => write!(f, "scan"),
            Self::Preflight => write!(f, "preflight"),
            Self::Process => write!(f, "process"),
            Self::Undo => write!(f, "undo"),
        }
    }
}

/// Admits one phase at a time.
#[derive(Debug, Default)]
pub(crate) struct PhaseTracker {
    current: Mutex<Phase>,
}

impl PhaseTracker {
    fn lock(&self) -> MutexGuard<'_, Phase> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn current(&self) -> Phase {
        *self.lock()
    }

    /// Enters `phase` if idle. The returned guard puts the tracker back to
    /// idle when dropped.
    pub fn begin(&self, phase: Phase) -> Result<PhaseGuard<'_>, EngineError> {
        let mut current = self.lock();
        if *current != Phase::Idle {
            return Err(EngineError::Busy(*current));
        }
        *current = phase;
        tracing::debug!(%phase, "Phase started");
        Ok(PhaseGuard { tracker: self })
    }
}

pub(crate) struct PhaseGuard<'a> {
    tracker: &'a PhaseTracker,
}

impl PhaseGuard<'_> {
    pub fn advance(&self, phase: Phase) {
        *self.tracker.lock() = phase;
        tracing::debug!(%phase, "Phase started");
    }
}

impl Drop for PhaseGuard<'_> {
    fn drop(&mut self) {
        *self.tracker.lock() = Phase::Idle;
    }
}
