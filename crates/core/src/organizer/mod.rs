//! The organizer engine.
//!
//! A process run moves through the phases one at a time:
//! - **Scan**: walk the source once (or reuse a cached scan)
//! - **Preflight**: refuse to start when the destination is too small
//! - **Process**: a bounded pool of workers hashes, dedups, names and
//!   places each candidate, appending to the operation log
//!
//! Undo replays that log backwards and is refused while any phase runs.

mod phase;
mod progress;
mod runner;
mod types;
mod worker;

pub use phase::Phase;
pub use progress::RunProgress;
pub use runner::Organizer;
pub use types::{RunReport, RunStatus, ScanReport, UndoOutcome};
