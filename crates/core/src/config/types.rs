use chrono::{DateTime, Datelike, Utc};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::classify::MediaKind;
use crate::converter::ConverterConfig;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub options: ProcessOptions,
    #[serde(default)]
    pub formats: FormatConfig,
    #[serde(default)]
    pub layout: Layout,
    #[serde(default)]
    pub preflight: PreflightConfig,
    #[serde(default)]
    pub converter: ConverterConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Per-run processing switches.
///
/// A copy is taken when a process run starts; changing the original
/// afterwards has no effect on the run in flight.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ProcessOptions {
    /// Copy files into the destination. When false, files are moved.
    #[serde(default = "default_true")]
    pub copy_not_move: bool,
    /// Convert formats outside the natively supported sets.
    #[serde(default)]
    pub convert_enabled: bool,
    /// Skip candidates whose content was already processed in this run.
    #[serde(default = "default_true")]
    pub skip_duplicates: bool,
    /// Log intended actions without touching the filesystem.
    #[serde(default)]
    pub dry_run: bool,
    /// Upper bound on concurrently processed files.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
}

fn default_true() -> bool {
    true
}

fn default_max_concurrency() -> usize {
    4
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self {
            copy_not_move: true,
            convert_enabled: false,
            skip_duplicates: true,
            dry_run: false,
            max_concurrency: default_max_concurrency(),
        }
    }
}

impl ProcessOptions {
    pub fn with_move(mut self) -> Self {
        self.copy_not_move = false;
        self
    }

    pub fn with_conversion(mut self, enabled: bool) -> Self {
        self.convert_enabled = enabled;
        self
    }

    pub fn with_dedup(mut self, enabled: bool) -> Self {
        self.skip_duplicates = enabled;
        self
    }

    pub fn with_dry_run(mut self, enabled: bool) -> Self {
        self.dry_run = enabled;
        self
    }

    pub fn with_max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = max;
        self
    }
}

/// Extension sets used for classification and conversion targets.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct FormatConfig {
    /// Every extension recognized as an image.
    #[serde(default = "default_image_extensions")]
    pub image_extensions: Vec<String>,
    /// Every extension recognized as a video.
    #[serde(default = "default_video_extensions")]
    pub video_extensions: Vec<String>,
    /// Image extensions kept as-is when conversion is enabled.
    #[serde(default = "default_native_image_extensions")]
    pub native_image_extensions: Vec<String>,
    /// Video extensions kept as-is when conversion is enabled.
    #[serde(default = "default_native_video_extensions")]
    pub native_video_extensions: Vec<String>,
    /// Extension produced by image conversion.
    #[serde(default = "default_image_target")]
    pub image_target: String,
    /// Extension produced by video conversion.
    #[serde(default = "default_video_target")]
    pub video_target: String,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn default_image_extensions() -> Vec<String> {
    strings(&[
        "jpg", "jpeg", "png", "gif", "heic", "heif", "tif", "tiff", "bmp", "webp", "raw", "cr2",
        "cr3", "nef", "arw", "dng", "orf", "rw2",
    ])
}

fn default_video_extensions() -> Vec<String> {
    strings(&[
        "mp4", "mov", "m4v", "avi", "mkv", "wmv", "flv", "webm", "mpg", "mpeg", "3gp", "mts",
        "m2ts",
    ])
}

fn default_native_image_extensions() -> Vec<String> {
    strings(&["jpg", "jpeg", "png", "gif", "heic", "heif"])
}

fn default_native_video_extensions() -> Vec<String> {
    strings(&["mp4", "mov", "m4v"])
}

fn default_image_target() -> String {
    "jpg".to_string()
}

fn default_video_target() -> String {
    "mp4".to_string()
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self {
            image_extensions: default_image_extensions(),
            video_extensions: default_video_extensions(),
            native_image_extensions: default_native_image_extensions(),
            native_video_extensions: default_native_video_extensions(),
            image_target: default_image_target(),
            video_target: default_video_target(),
        }
    }
}

impl FormatConfig {
    /// Extension a converted file of `kind` ends up with.
    pub fn target_for(&self, kind: MediaKind) -> &str {
        match kind {
            MediaKind::Image => &self.image_target,
            MediaKind::Video => &self.video_target,
        }
    }
}

/// How files are arranged below the destination root.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Layout {
    /// Everything directly in the destination root.
    #[default]
    Flat,
    /// `Images/` and `Videos/` subfolders.
    ByKind,
    /// `YYYY/MM` subfolders from the file's creation time.
    ByDate,
}

/// Folder used by the `by_date` layout when no creation time is known.
pub const UNKNOWN_DATE_FOLDER: &str = "Unknown Date";

impl Layout {
    /// Target folder below `root` for a file of `kind` created at `created`.
    pub fn folder_for(
        &self,
        root: &Path,
        kind: MediaKind,
        created: Option<DateTime<Utc>>,
    ) -> PathBuf {
        match self {
            Self::Flat => root.to_path_buf(),
            Self::ByKind => root.join(kind.folder_name()),
            Self::ByDate => match created {
                Some(at) => root
                    .join(format!("{:04}", at.year()))
                    .join(format!("{:02}", at.month())),
                None => root.join(UNKNOWN_DATE_FOLDER),
            },
        }
    }
}

/// Capacity check settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PreflightConfig {
    /// Multiplier applied to the summed candidate sizes.
    #[serde(default = "default_safety_factor")]
    pub safety_factor: f64,
}

fn default_safety_factor() -> f64 {
    1.3
}

impl Default for PreflightConfig {
    fn default() -> Self {
        Self {
            safety_factor: default_safety_factor(),
        }
    }
}

/// Where persisted audit logs and exported run logs are written.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct OutputConfig {
    #[serde(default = "default_audit_dir")]
    pub audit_dir: PathBuf,
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
}

fn data_dir() -> PathBuf {
    ProjectDirs::from("", "", "mediasort")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| std::env::temp_dir().join("mediasort"))
}

fn default_audit_dir() -> PathBuf {
    data_dir().join("audit")
}

fn default_log_dir() -> PathBuf {
    data_dir().join("logs")
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            audit_dir: default_audit_dir(),
            log_dir: default_log_dir(),
        }
    }
}
