//! Types for the placer module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// How a file reached its destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlacementMethod {
    /// Byte copy; the source is untouched.
    Copy,
    /// Same-filesystem rename.
    Rename,
    /// Byte copy followed by removal of the source.
    CopyThenDelete,
}

impl PlacementMethod {
    /// Whether the source still exists after placement.
    pub fn source_retained(&self) -> bool {
        matches!(self, Self::Copy)
    }
}

/// Information about a placed file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacedFile {
    /// Final destination path.
    pub destination: PathBuf,
    /// File size in bytes.
    pub size_bytes: u64,
    /// How the file got there.
    pub method: PlacementMethod,
}
