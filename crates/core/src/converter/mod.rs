//! Converter module for transcoding media files.
//!
//! This module provides the `Converter` trait and an implementation that
//! shells out to external tools with a path-in/path-out contract.
//!
//! # Tools
//!
//! - Videos: `ffmpeg`, producing H.264/AAC MP4
//! - Images: ImageMagick (`magick`, or the legacy `convert`), falling back to
//!   macOS `sips`
//!
//! Tools are found through a [`ToolLocator`], so the engine never depends on
//! how the host discovers executables.
//!
//! # Example
//!
//! ```ignore
//! use mediasort_core::converter::{ExternalConverter, Converter, ConversionJob};
//! use mediasort_core::MediaKind;
//!
//! let converter = ExternalConverter::with_defaults();
//!
//! let job = ConversionJob {
//!     input_path: PathBuf::from("/photos/scan.tiff"),
//!     output_path: PathBuf::from("/sorted/scan.jpg"),
//!     kind: MediaKind::Image,
//! };
//!
//! let result = converter.convert(job).await?;
//! println!("Converted with {} in {} ms", result.tool, result.duration_ms);
//! ```

mod config;
mod error;
mod external;
mod locator;
mod traits;
mod types;

pub use config::ConverterConfig;
pub use error::ConverterError;
pub use external::ExternalConverter;
pub use locator::{ToolLocator, WellKnownLocator};
pub use traits::Converter;
pub use types::{ConversionJob, ConversionResult};
