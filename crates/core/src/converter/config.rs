//! Configuration for the converter module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the external-tool converter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConverterConfig {
    /// Directories probed for tools, in order, before falling back to `PATH`.
    #[serde(default = "default_search_dirs")]
    pub search_dirs: Vec<PathBuf>,

    /// Timeout for a single conversion in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Outputs smaller than this are treated as failed conversions.
    #[serde(default = "default_min_output_bytes")]
    pub min_output_bytes: u64,

    /// x264 constant rate factor for video conversion.
    #[serde(default = "default_video_crf")]
    pub video_crf: u8,

    /// JPEG quality for image conversion.
    #[serde(default = "default_image_quality")]
    pub image_quality: u8,
}

fn default_search_dirs() -> Vec<PathBuf> {
    ["/opt/homebrew/bin", "/usr/local/bin", "/usr/bin"]
        .into_iter()
        .map(PathBuf::from)
        .collect()
}

fn default_timeout() -> u64 {
    3600 // 1 hour
}

fn default_min_output_bytes() -> u64 {
    512
}

fn default_video_crf() -> u8 {
    23
}

fn default_image_quality() -> u8 {
    92
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            search_dirs: default_search_dirs(),
            timeout_secs: default_timeout(),
            min_output_bytes: default_min_output_bytes(),
            video_crf: default_video_crf(),
            image_quality: default_image_quality(),
        }
    }
}

impl ConverterConfig {
    /// Replaces the probed directories.
    pub fn with_search_dirs(mut self, dirs: Vec<PathBuf>) -> Self {
        self.search_dirs = dirs;
        self
    }

    /// Sets the timeout in seconds.
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Sets the minimum plausible output size.
    pub fn with_min_output_bytes(mut self, min: u64) -> Self {
        self.min_output_bytes = min;
        self
    }
}
