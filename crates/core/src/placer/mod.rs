//! Placer module for copying and moving files to their destinations.
//!
//! # Features
//!
//! - Atomic moves when source and destination are on the same filesystem
//! - Automatic fallback to copy + delete when the rename crosses devices
//! - Destinations opened with `create_new`, never overwriting
//! - Partial destinations removed when a copy fails
//! - Access/modification times and permissions carried over
//!
//! # Example
//!
//! ```ignore
//! use mediasort_core::placer::FsPlacer;
//!
//! let placer = FsPlacer::with_defaults();
//! let placed = placer.copy(Path::new("/photos/a.jpg"), Path::new("/sorted/a.jpg")).await?;
//! println!("Placed {} bytes", placed.size_bytes);
//! ```

mod config;
mod error;
mod fs_placer;
mod types;

pub use config::PlacerConfig;
pub use error::PlacerError;
pub use fs_placer::FsPlacer;
pub use types::{PlacedFile, PlacementMethod};
