//! Configuration for the placer module.

use serde::{Deserialize, Serialize};

/// Configuration for the file system placer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacerConfig {
    /// Buffer size for file copies in bytes.
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,

    /// Whether moves try a rename before falling back to copy + delete.
    #[serde(default = "default_true")]
    pub prefer_atomic_moves: bool,

    /// Whether access/modification times and permissions are carried over.
    #[serde(default = "default_true")]
    pub preserve_metadata: bool,
}

fn default_buffer_size() -> usize {
    1024 * 1024 // 1 MB
}

fn default_true() -> bool {
    true
}

impl Default for PlacerConfig {
    fn default() -> Self {
        Self {
            buffer_size: default_buffer_size(),
            prefer_atomic_moves: true,
            preserve_metadata: true,
        }
    }
}

impl PlacerConfig {
    /// Enables or disables rename-first moves.
    pub fn with_atomic_moves(mut self, enabled: bool) -> Self {
        self.prefer_atomic_moves = enabled;
        self
    }

    /// Sets the buffer size for copies.
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }

    /// Enables or disables metadata preservation.
    pub fn with_preserve_metadata(mut self, enabled: bool) -> Self {
        self.preserve_metadata = enabled;
        self
    }
}
