//! The human-readable run log.
//!
//! Engine code emits [`AuditEvent`]s through an [`AuditHandle`]; an
//! [`AuditWriter`] task drains them into an [`AuditStore`], from which the
//! log can be exported as text.

mod events;
mod export;
mod handle;
mod store;
mod writer;

pub use events::*;
pub use export::*;
pub use handle::*;
pub use store::*;
pub use writer::*;
