mod loader;
mod types;
mod validate;

pub use loader::{load_config, load_config_from_env, load_config_from_str};
pub use types::*;
pub use validate::{validate_config, validate_roots, ValidatedRoots};

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),

    #[error("Source folder is missing or not a directory: {0}")]
    SourceMissing(PathBuf),

    #[error("Destination folder is missing or not a directory: {0}")]
    DestinationMissing(PathBuf),

    #[error("Source and destination are the same folder: {0}")]
    SameFolder(PathBuf),

    #[error("Source {source_dir} and destination {destination} are nested inside one another")]
    NestedFolders {
        source_dir: PathBuf,
        destination: PathBuf,
    },
}
