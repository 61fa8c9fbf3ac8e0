//! Destination capacity check run before any file is touched.

use std::io;
use std::path::{Path, PathBuf};
use sysinfo::Disks;
use thiserror::Error;

use crate::scanner::MediaCandidate;

/// Reports free space for the volume holding a path.
pub trait CapacityProbe: Send + Sync {
    fn available_bytes(&self, path: &Path) -> io::Result<u64>;
}

/// Reads free space from the host's mounted disks.
///
/// The disk whose mount point is the longest prefix of the (canonical)
/// path wins.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCapacity;

impl CapacityProbe for SystemCapacity {
    fn available_bytes(&self, path: &Path) -> io::Result<u64> {
        let path = path.canonicalize()?;
        let disks = Disks::new_with_refreshed_list();

        disks
            .list()
            .iter()
            .filter(|disk| path.starts_with(disk.mount_point()))
            .max_by_key(|disk| disk.mount_point().as_os_str().len())
            .map(|disk| disk.available_space())
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("no mounted disk holds {}", path.display()),
                )
            })
    }
}

#[derive(Debug, Error)]
pub enum PreflightError {
    #[error(
        "Not enough space on {destination}: {required_bytes} bytes needed, {available_bytes} available"
    )]
    InsufficientSpace {
        destination: PathBuf,
        required_bytes: u64,
        available_bytes: u64,
    },
}

/// Result of a capacity check that did not block the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreflightReport {
    pub required_bytes: u64,
    /// `None` when the probe could not answer.
    pub available_bytes: Option<u64>,
    /// Space was short but the run is a dry run, so it only warned.
    pub shortfall_ignored: bool,
}

/// Summed candidate sizes scaled by `safety_factor`, rounded up.
pub fn required_bytes(candidates: &[MediaCandidate], safety_factor: f64) -> u64 {
    let total: u64 = candidates.iter().map(|c| c.size_bytes).sum();
    (total as f64 * safety_factor).ceil() as u64
}

/// Compares what the candidates need against what `destination` offers.
///
/// A probe failure is logged and the run proceeds. A shortfall fails the
/// check unless `dry_run`, which writes nothing.
pub fn check_capacity(
    probe: &dyn CapacityProbe,
    destination: &Path,
    candidates: &[MediaCandidate],
    safety_factor: f64,
    dry_run: bool,
) -> Result<PreflightReport, PreflightError> {
    let required = required_bytes(candidates, safety_factor);

    let available = match probe.available_bytes(destination) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(
                destination = %destination.display(),
                error = %e,
                "Could not determine free space, skipping capacity check"
            );
            return Ok(PreflightReport {
                required_bytes: required,
                available_bytes: None,
                shortfall_ignored: false,
            });
        }
    };

    if available >= required {
        tracing::debug!(required, available, "Capacity check passed");
        return Ok(PreflightReport {
            required_bytes: required,
            available_bytes: Some(available),
            shortfall_ignored: false,
        });
    }

    if dry_run {
        tracing::warn!(
            required,
            available,
            "Destination would run out of space; continuing because this is a dry run"
        );
        return Ok(PreflightReport {
            required_bytes: required,
            available_bytes: Some(available),
            shortfall_ignored: true,
        });
    }

    Err(PreflightError::InsufficientSpace {
        destination: destination.to_path_buf(),
        required_bytes: required,
        available_bytes: available,
    })
}
