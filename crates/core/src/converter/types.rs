//! Types for the converter module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::classify::MediaKind;

/// A single conversion request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionJob {
    /// Input file path.
    pub input_path: PathBuf,
    /// Output file path. Its extension selects the target format.
    pub output_path: PathBuf,
    /// Kind of media being converted.
    pub kind: MediaKind,
}

impl ConversionJob {
    /// Lowercased extension of the output path, if any.
    pub fn target_extension(&self) -> Option<String> {
        self.output_path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
    }
}

/// Outcome of a successful conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionResult {
    /// Where the converted file was written.
    pub output_path: PathBuf,
    /// Size of the converted file.
    pub output_size_bytes: u64,
    /// Wall-clock time spent in the tool.
    pub duration_ms: u64,
    /// Name of the tool that did the work.
    pub tool: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_extension_is_lowercased() {
        let job = ConversionJob {
            input_path: PathBuf::from("/in/clip.AVI"),
            output_path: PathBuf::from("/out/clip.MP4"),
            kind: MediaKind::Video,
        };
        assert_eq!(job.target_extension().as_deref(), Some("mp4"));
    }

    #[test]
    fn test_job_serialization() {
        let job = ConversionJob {
            input_path: PathBuf::from("/in/scan.tiff"),
            output_path: PathBuf::from("/out/scan.jpg"),
            kind: MediaKind::Image,
        };
        let json = serde_json::to_string(&job).unwrap();
        assert!(json.contains("\"kind\":\"image\""));
        let parsed: ConversionJob = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, job);
    }
}
