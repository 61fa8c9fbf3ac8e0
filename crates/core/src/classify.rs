//! Extension-based media classification.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use crate::config::FormatConfig;

/// The kind of media a file holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Folder name used by the `by_kind` layout.
    pub fn folder_name(&self) -> &'static str {
        match self {
            Self::Image => "Images",
            Self::Video => "Videos",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Image => write!(f, "image"),
            Self::Video => write!(f, "video"),
        }
    }
}

/// Result of classifying a single file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Not a media file, or an empty placeholder.
    NotMedia,
    /// A media file of the given kind.
    Media {
        kind: MediaKind,
        needs_conversion: bool,
    },
}

impl Classification {
    pub fn is_media(&self) -> bool {
        matches!(self, Self::Media { .. })
    }
}

/// Maps extensions to media kinds and decides whether conversion is required.
///
/// Lookups are case-insensitive. The sets are normalized once on
/// construction so classification is a pair of hash lookups.
#[derive(Debug, Clone)]
pub struct Classifier {
    images: HashSet<String>,
    videos: HashSet<String>,
    native_images: HashSet<String>,
    native_videos: HashSet<String>,
    convert_enabled: bool,
}

fn normalize(exts: &[String]) -> HashSet<String> {
    exts.iter()
        .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
        .filter(|e| !e.is_empty())
        .collect()
}

impl Classifier {
    /// Builds a classifier from the configured extension sets.
    pub fn new(formats: &FormatConfig, convert_enabled: bool) -> Self {
        Self {
            images: normalize(&formats.image_extensions),
            videos: normalize(&formats.video_extensions),
            native_images: normalize(&formats.native_image_extensions),
            native_videos: normalize(&formats.native_video_extensions),
            convert_enabled,
        }
    }

    /// Whether this classifier flags unsupported formats for conversion.
    pub fn convert_enabled(&self) -> bool {
        self.convert_enabled
    }

    /// Classifies an extension (without the leading dot) and a byte size.
    ///
    /// Zero-byte files are never media, whatever their extension.
    pub fn classify(&self, extension: &str, size_bytes: u64) -> Classification {
        if size_bytes == 0 {
            return Classification::NotMedia;
        }

        let ext = extension.trim_start_matches('.').to_ascii_lowercase();
        let (kind, native) = if self.images.contains(&ext) {
            (MediaKind::Image, &self.native_images)
        } else if self.videos.contains(&ext) {
            (MediaKind::Video, &self.native_videos)
        } else {
            return Classification::NotMedia;
        };

        Classification::Media {
            kind,
            needs_conversion: self.convert_enabled && !native.contains(&ext),
        }
    }

    /// Classifies a path by its extension. Paths without one are not media.
    pub fn classify_path(&self, path: &Path, size_bytes: u64) -> Classification {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) => self.classify(ext, size_bytes),
            None => Classification::NotMedia,
        }
    }
}
