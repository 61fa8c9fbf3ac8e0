//! Mock converter for testing.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::classify::MediaKind;
use crate::converter::{ConversionJob, ConversionResult, Converter, ConverterError};

/// A recorded conversion job for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedConversion {
    /// The job that was submitted.
    pub job: ConversionJob,
    /// Whether the conversion succeeded.
    pub success: bool,
}

/// Mock implementation of the Converter trait.
///
/// "Converts" by copying the input bytes to the output path, so the
/// organizer sees a real destination file. Provides controllable behavior
/// for testing:
/// - Track conversion jobs for assertions
/// - Simulate a missing tool per media kind
/// - Simulate one-off or permanent failures
///
/// # Example
///
/// ```rust,ignore
/// use mediasort_core::testing::MockConverter;
///
/// let converter = MockConverter::new();
/// converter.set_missing_tool(MediaKind::Video).await;
///
/// // Run the organizer...
///
/// let conversions = converter.recorded_conversions().await;
/// assert!(conversions.iter().all(|c| !c.success));
/// ```
#[derive(Debug, Default)]
pub struct MockConverter {
    /// Recorded conversions.
    conversions: Arc<RwLock<Vec<RecordedConversion>>>,
    /// Kinds whose tool is reported missing.
    missing_tools: Arc<RwLock<HashSet<MediaKind>>>,
    /// If set, the next conversion will fail with this error.
    next_error: Arc<RwLock<Option<ConverterError>>>,
    /// Every conversion fails when set.
    always_fail: Arc<RwLock<bool>>,
    /// Simulated conversion time.
    delay: Arc<RwLock<Duration>>,
}

impl MockConverter {
    /// Create a new mock converter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all recorded conversions.
    pub async fn recorded_conversions(&self) -> Vec<RecordedConversion> {
        self.conversions.read().await.clone()
    }

    /// Get the number of conversions attempted.
    pub async fn conversion_count(&self) -> usize {
        self.conversions.read().await.len()
    }

    /// Report the tool for `kind` as not installed.
    pub async fn set_missing_tool(&self, kind: MediaKind) {
        self.missing_tools.write().await.insert(kind);
    }

    /// Configure the next conversion to fail with the given error.
    pub async fn set_next_error(&self, error: ConverterError) {
        *self.next_error.write().await = Some(error);
    }

    /// Make every conversion fail with a non-zero exit.
    pub async fn set_always_fail(&self, fail: bool) {
        *self.always_fail.write().await = fail;
    }

    /// Set the simulated conversion time.
    pub async fn set_delay(&self, delay: Duration) {
        *self.delay.write().await = delay;
    }

    async fn failure_for(&self, job: &ConversionJob) -> Option<ConverterError> {
        if self.missing_tools.read().await.contains(&job.kind) {
            let tool = match job.kind {
                MediaKind::Image => "magick",
                MediaKind::Video => "ffmpeg",
            };
            return Some(ConverterError::tool_not_found(tool));
        }
        if let Some(err) = self.next_error.write().await.take() {
            return Some(err);
        }
        if *self.always_fail.read().await {
            return Some(ConverterError::conversion_failed(
                "mock tool exited with status 1",
                Some("mock failure".to_string()),
            ));
        }
        None
    }
}

#[async_trait]
impl Converter for MockConverter {
    fn name(&self) -> &str {
        "mock"
    }

    async fn convert(&self, job: ConversionJob) -> Result<ConversionResult, ConverterError> {
        if let Some(err) = self.failure_for(&job).await {
            self.conversions.write().await.push(RecordedConversion {
                job,
                success: false,
            });
            return Err(err);
        }

        let started = Instant::now();
        let delay = *self.delay.read().await;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if !job.input_path.exists() {
            return Err(ConverterError::InputNotFound {
                path: job.input_path.clone(),
            });
        }
        let output_size_bytes = tokio::fs::copy(&job.input_path, &job.output_path).await?;

        self.conversions.write().await.push(RecordedConversion {
            job: job.clone(),
            success: true,
        });

        Ok(ConversionResult {
            output_path: job.output_path,
            output_size_bytes,
            duration_ms: started.elapsed().as_millis() as u64,
            tool: "mock".to_string(),
        })
    }

    fn supports(&self, _kind: MediaKind) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tempfile::TempDir;

    fn job(dir: &Path, kind: MediaKind) -> ConversionJob {
        let input = dir.join("in.avi");
        std::fs::write(&input, b"frames").unwrap();
        ConversionJob {
            input_path: input,
            output_path: dir.join("out.mp4"),
            kind,
        }
    }

    #[tokio::test]
    async fn test_conversion_copies_bytes() {
        let temp = TempDir::new().unwrap();
        let converter = MockConverter::new();

        let result = converter
            .convert(job(temp.path(), MediaKind::Video))
            .await
            .unwrap();

        assert_eq!(result.output_size_bytes, 6);
        assert_eq!(std::fs::read(temp.path().join("out.mp4")).unwrap(), b"frames");
        assert_eq!(converter.conversion_count().await, 1);
    }

    #[tokio::test]
    async fn test_missing_tool_per_kind() {
        let temp = TempDir::new().unwrap();
        let converter = MockConverter::new();
        converter.set_missing_tool(MediaKind::Video).await;

        let err = converter
            .convert(job(temp.path(), MediaKind::Video))
            .await
            .unwrap_err();
        assert!(err.is_tool_missing());
        assert!(converter
            .convert(job(temp.path(), MediaKind::Image))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_error_injection() {
        let temp = TempDir::new().unwrap();
        let converter = MockConverter::new();
        converter
            .set_next_error(ConverterError::conversion_failed("test error", None))
            .await;

        assert!(converter
            .convert(job(temp.path(), MediaKind::Image))
            .await
            .is_err());

        // Error should be consumed, conversion recorded as failed
        let conversions = converter.recorded_conversions().await;
        assert_eq!(conversions.len(), 1);
        assert!(!conversions[0].success);
    }
}
