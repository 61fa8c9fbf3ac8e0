//! Trait definitions for the converter module.

use async_trait::async_trait;

use super::error::ConverterError;
use super::types::{ConversionJob, ConversionResult};
use crate::classify::MediaKind;

/// A converter that can transcode media files.
#[async_trait]
pub trait Converter: Send + Sync {
    /// Returns the name of this converter implementation.
    fn name(&self) -> &str;

    /// Converts `job.input_path` into `job.output_path`.
    ///
    /// On failure no partial output is left at `job.output_path`.
    async fn convert(&self, job: ConversionJob) -> Result<ConversionResult, ConverterError>;

    /// Whether a tool for `kind` is currently available.
    fn supports(&self, kind: MediaKind) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    struct VideoOnly;

    #[async_trait]
    impl Converter for VideoOnly {
        fn name(&self) -> &str {
            "video-only"
        }

        async fn convert(&self, job: ConversionJob) -> Result<ConversionResult, ConverterError> {
            if !self.supports(job.kind) {
                return Err(ConverterError::tool_not_found("image tool"));
            }
            Ok(ConversionResult {
                output_path: job.output_path,
                output_size_bytes: 2048,
                duration_ms: 5,
                tool: "fake".to_string(),
            })
        }

        fn supports(&self, kind: MediaKind) -> bool {
            kind == MediaKind::Video
        }
    }

    #[tokio::test]
    async fn test_trait_object_dispatch() {
        let converter: Box<dyn Converter> = Box::new(VideoOnly);
        let job = ConversionJob {
            input_path: PathBuf::from("/in/a.avi"),
            output_path: PathBuf::from("/out/a.mp4"),
            kind: MediaKind::Video,
        };
        let result = converter.convert(job).await.unwrap();
        assert_eq!(result.output_path, PathBuf::from("/out/a.mp4"));

        let job = ConversionJob {
            input_path: PathBuf::from("/in/a.tiff"),
            output_path: PathBuf::from("/out/a.jpg"),
            kind: MediaKind::Image,
        };
        let err = converter.convert(job).await.unwrap_err();
        assert!(err.is_tool_missing());
    }
}
