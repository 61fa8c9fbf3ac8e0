//! Error types for the converter module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during conversion.
#[derive(Debug, Error)]
pub enum ConverterError {
    /// No usable executable was found for the job.
    #[error("Conversion tool not found: {tool}")]
    ToolNotFound { tool: String },

    /// Input file not found.
    #[error("Input file not found: {path}")]
    InputNotFound { path: PathBuf },

    /// Output directory does not exist and could not be created.
    #[error("Failed to create output directory: {path}")]
    OutputDirectoryFailed { path: PathBuf },

    /// The tool exited unsuccessfully.
    #[error("Conversion failed: {reason}")]
    ConversionFailed {
        reason: String,
        stderr: Option<String>,
    },

    /// The tool reported success but left no output behind.
    #[error("Conversion produced no output at {path}")]
    OutputMissing { path: PathBuf },

    /// The output is too small to be a plausible media file.
    #[error("Conversion output {path} is only {size_bytes} bytes (minimum {min_bytes})")]
    OutputTooSmall {
        path: PathBuf,
        size_bytes: u64,
        min_bytes: u64,
    },

    /// Conversion timed out.
    #[error("Conversion timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    /// I/O error during conversion.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConverterError {
    /// Creates a new conversion failed error with stderr output.
    pub fn conversion_failed(reason: impl Into<String>, stderr: Option<String>) -> Self {
        Self::ConversionFailed {
            reason: reason.into(),
            stderr,
        }
    }

    /// Creates a tool-not-found error.
    pub fn tool_not_found(tool: impl Into<String>) -> Self {
        Self::ToolNotFound { tool: tool.into() }
    }

    /// Whether the failure is the tool being absent rather than the tool
    /// failing on this input.
    pub fn is_tool_missing(&self) -> bool {
        matches!(self, Self::ToolNotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = ConverterError::tool_not_found("ffmpeg");
        assert_eq!(err.to_string(), "Conversion tool not found: ffmpeg");
        assert!(err.is_tool_missing());

        let err = ConverterError::conversion_failed("exit code 1", Some("bad input".into()));
        assert_eq!(err.to_string(), "Conversion failed: exit code 1");
        assert!(!err.is_tool_missing());
    }
}
