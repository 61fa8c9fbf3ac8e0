//! Converter backed by external command-line tools.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Instant;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio::time::{timeout, Duration};

use super::config::ConverterConfig;
use super::error::ConverterError;
use super::locator::{ToolLocator, WellKnownLocator};
use super::traits::Converter;
use super::types::{ConversionJob, ConversionResult};
use crate::classify::MediaKind;

/// Longest stderr excerpt carried in a failure, in bytes.
const MAX_STDERR_LEN: usize = 2000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tool {
    Ffmpeg,
    Magick,
    LegacyConvert,
    Sips,
}

impl Tool {
    fn binary(&self) -> &'static str {
        match self {
            Self::Ffmpeg => "ffmpeg",
            Self::Magick => "magick",
            Self::LegacyConvert => "convert",
            Self::Sips => "sips",
        }
    }

    fn candidates(kind: MediaKind) -> &'static [Tool] {
        match kind {
            MediaKind::Video => &[Tool::Ffmpeg],
            MediaKind::Image => &[Tool::Magick, Tool::LegacyConvert, Tool::Sips],
        }
    }
}

/// Format name `sips` expects for a target extension.
fn sips_format(extension: &str) -> &str {
    match extension {
        "jpg" | "jpeg" => "jpeg",
        "tif" | "tiff" => "tiff",
        other => other,
    }
}

/// Keeps the tail of a tool's stderr, where the actual error usually is.
fn trim_stderr(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.len() <= MAX_STDERR_LEN {
        return Some(trimmed.to_string());
    }
    let start = (trimmed.len() - MAX_STDERR_LEN..trimmed.len())
        .find(|i| trimmed.is_char_boundary(*i))
        .unwrap_or(trimmed.len());
    Some(trimmed[start..].to_string())
}

/// Converter that runs `ffmpeg`, ImageMagick or `sips` as subprocesses.
pub struct ExternalConverter {
    config: ConverterConfig,
    locator: Arc<dyn ToolLocator>,
}

impl ExternalConverter {
    /// Creates a converter that probes the configured search directories.
    pub fn new(config: ConverterConfig) -> Self {
        let locator = WellKnownLocator::new(config.search_dirs.clone());
        Self::with_locator(config, Arc::new(locator))
    }

    /// Creates a converter with a custom tool locator.
    pub fn with_locator(config: ConverterConfig, locator: Arc<dyn ToolLocator>) -> Self {
        Self { config, locator }
    }

    /// Creates a converter with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(ConverterConfig::default())
    }

    /// First available tool for `kind`.
    fn resolve(&self, kind: MediaKind) -> Result<(Tool, PathBuf), ConverterError> {
        Tool::candidates(kind)
            .iter()
            .find_map(|tool| self.locator.locate(tool.binary()).map(|path| (*tool, path)))
            .ok_or_else(|| {
                let names: Vec<&str> = Tool::candidates(kind).iter().map(Tool::binary).collect();
                ConverterError::tool_not_found(names.join(" or "))
            })
    }

    /// Builds the argument list for `tool`.
    fn build_args(&self, tool: Tool, input: &Path, output: &Path) -> Vec<String> {
        let input = input.to_string_lossy().to_string();
        let output_str = output.to_string_lossy().to_string();

        match tool {
            Tool::Ffmpeg => vec![
                "-y".to_string(),
                "-i".to_string(),
                input,
                "-c:v".to_string(),
                "libx264".to_string(),
                "-preset".to_string(),
                "medium".to_string(),
                "-crf".to_string(),
                self.config.video_crf.to_string(),
                "-pix_fmt".to_string(),
                "yuv420p".to_string(),
                "-c:a".to_string(),
                "aac".to_string(),
                "-b:a".to_string(),
                "192k".to_string(),
                "-movflags".to_string(),
                "+faststart".to_string(),
                "-loglevel".to_string(),
                "error".to_string(),
                output_str,
            ],
            Tool::Magick | Tool::LegacyConvert => vec![
                input,
                "-auto-orient".to_string(),
                "-quality".to_string(),
                self.config.image_quality.to_string(),
                output_str,
            ],
            Tool::Sips => {
                let extension = output
                    .extension()
                    .and_then(|e| e.to_str())
                    .map(|e| e.to_ascii_lowercase())
                    .unwrap_or_else(|| "jpeg".to_string());
                vec![
                    "-s".to_string(),
                    "format".to_string(),
                    sips_format(&extension).to_string(),
                    "-s".to_string(),
                    "formatOptions".to_string(),
                    self.config.image_quality.to_string(),
                    input,
                    "--out".to_string(),
                    output_str,
                ]
            }
        }
    }

    /// Best-effort removal of whatever the tool left behind.
    async fn discard_partial(path: &Path) {
        match tokio::fs::remove_file(path).await {
            Ok(()) => tracing::debug!(path = %path.display(), "Removed partial conversion output"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                path = %path.display(),
                error = %e,
                "Failed to remove partial conversion output"
            ),
        }
    }

    async fn run_conversion(&self, job: &ConversionJob) -> Result<ConversionResult, ConverterError> {
        let start = Instant::now();

        match tokio::fs::metadata(&job.input_path).await {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ConverterError::InputNotFound {
                    path: job.input_path.clone(),
                });
            }
            Err(e) => return Err(ConverterError::Io(e)),
        }

        let (tool, program) = self.resolve(job.kind)?;

        if let Some(parent) = job.output_path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|_| {
                ConverterError::OutputDirectoryFailed {
                    path: parent.to_path_buf(),
                }
            })?;
        }

        let args = self.build_args(tool, &job.input_path, &job.output_path);
        tracing::debug!(
            tool = tool.binary(),
            program = %program.display(),
            input = %job.input_path.display(),
            output = %job.output_path.display(),
            "Starting conversion"
        );

        let mut child = Command::new(&program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ConverterError::tool_not_found(tool.binary())
                } else {
                    ConverterError::Io(e)
                }
            })?;

        // Drain stderr concurrently so a chatty tool can't fill the pipe and stall.
        let stderr_task = child.stderr.take().map(|mut stderr| {
            tokio::spawn(async move {
                let mut buf = String::new();
                let _ = stderr.read_to_string(&mut buf).await;
                buf
            })
        });

        let timeout_duration = Duration::from_secs(self.config.timeout_secs);
        let status = match timeout(timeout_duration, child.wait()).await {
            Ok(Ok(status)) => status,
            Ok(Err(e)) => {
                Self::discard_partial(&job.output_path).await;
                return Err(ConverterError::Io(e));
            }
            Err(_) => {
                // Kill the process on timeout
                let _ = child.kill().await;
                Self::discard_partial(&job.output_path).await;
                return Err(ConverterError::Timeout {
                    timeout_secs: self.config.timeout_secs,
                });
            }
        };

        let stderr = match stderr_task {
            Some(task) => task.await.unwrap_or_default(),
            None => String::new(),
        };

        if !status.success() {
            Self::discard_partial(&job.output_path).await;
            return Err(ConverterError::conversion_failed(
                format!("{} exited with code: {:?}", tool.binary(), status.code()),
                trim_stderr(&stderr),
            ));
        }

        let output_meta = match tokio::fs::metadata(&job.output_path).await {
            Ok(meta) => meta,
            Err(_) => {
                return Err(ConverterError::OutputMissing {
                    path: job.output_path.clone(),
                });
            }
        };

        if output_meta.len() < self.config.min_output_bytes {
            Self::discard_partial(&job.output_path).await;
            return Err(ConverterError::OutputTooSmall {
                path: job.output_path.clone(),
                size_bytes: output_meta.len(),
                min_bytes: self.config.min_output_bytes,
            });
        }

        Ok(ConversionResult {
            output_path: job.output_path.clone(),
            output_size_bytes: output_meta.len(),
            duration_ms: start.elapsed().as_millis() as u64,
            tool: tool.binary().to_string(),
        })
    }
}

#[async_trait]
impl Converter for ExternalConverter {
    fn name(&self) -> &str {
        "external"
    }

    async fn convert(&self, job: ConversionJob) -> Result<ConversionResult, ConverterError> {
        self.run_conversion(&job).await
    }

    fn supports(&self, kind: MediaKind) -> bool {
        self.resolve(kind).is_ok()
    }
}
