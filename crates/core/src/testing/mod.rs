//! Testing utilities and mock implementations for end-to-end tests.
//!
//! This module provides stand-ins for the engine's external collaborators
//! (conversion tools, disk capacity), so the organizer can be driven end to
//! end against temporary folders.
//!
//! # Example
//!
//! ```rust,ignore
//! use mediasort_core::testing::{FixedCapacity, MockConverter};
//!
//! let organizer = Organizer::new(config, Arc::new(MockConverter::new()))
//!     .with_capacity_probe(Arc::new(FixedCapacity::unlimited()));
//! ```

mod mock_converter;

pub use mock_converter::{MockConverter, RecordedConversion};

use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::preflight::CapacityProbe;

/// Capacity probe reporting a settable number of free bytes.
#[derive(Debug)]
pub struct FixedCapacity {
    available: AtomicU64,
}

impl FixedCapacity {
    pub fn new(available: u64) -> Self {
        Self {
            available: AtomicU64::new(available),
        }
    }

    pub fn unlimited() -> Self {
        Self::new(u64::MAX)
    }

    pub fn set_available(&self, available: u64) {
        self.available.store(available, Ordering::Relaxed);
    }
}

impl CapacityProbe for FixedCapacity {
    fn available_bytes(&self, _path: &Path) -> io::Result<u64> {
        Ok(self.available.load(Ordering::Relaxed))
    }
}

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::path::{Path, PathBuf};

    use crate::config::Config;

    /// Writes `contents` to `dir/relative`, creating parent folders.
    pub fn write_file(dir: &Path, relative: &str, contents: &[u8]) -> std::io::Result<PathBuf> {
        let path = dir.join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, contents)?;
        Ok(path)
    }

    /// `len` bytes derived from `seed`, distinct for distinct seeds.
    pub fn bytes(seed: u8, len: usize) -> Vec<u8> {
        (0..len)
            .map(|i| seed.wrapping_add((i % 251) as u8))
            .collect()
    }

    /// Default config whose operation logs go to `audit_dir`.
    pub fn config_with_audit_dir(audit_dir: &Path) -> Config {
        let mut config = Config::default();
        config.output.audit_dir = audit_dir.to_path_buf();
        config.output.log_dir = audit_dir.to_path_buf();
        config
    }

    /// Relative file names below `dir`, sorted. Recurses into folders.
    pub fn list_files(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = walkdir::WalkDir::new(dir)
            .min_depth(1)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
            .filter_map(|e| {
                e.path()
                    .strip_prefix(dir)
                    .ok()
                    .map(|p| p.to_string_lossy().to_string())
            })
            .collect();
        names.sort();
        names
    }
}
