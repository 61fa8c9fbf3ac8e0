use std::path::{Path, PathBuf};

use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - max_concurrency is not 0
/// - safety_factor is at least 1.0
/// - extension sets are non-empty and native sets are subsets
/// - conversion targets are set
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.options.max_concurrency == 0 {
        return Err(ConfigError::ValidationError(
            "options.max_concurrency cannot be 0".to_string(),
        ));
    }

    let factor = config.preflight.safety_factor;
    if !factor.is_finite() || factor < 1.0 {
        return Err(ConfigError::ValidationError(format!(
            "preflight.safety_factor must be at least 1.0, got {factor}"
        )));
    }

    let formats = &config.formats;
    if formats.image_extensions.is_empty() {
        return Err(ConfigError::ValidationError(
            "formats.image_extensions cannot be empty".to_string(),
        ));
    }
    if formats.video_extensions.is_empty() {
        return Err(ConfigError::ValidationError(
            "formats.video_extensions cannot be empty".to_string(),
        ));
    }

    check_subset(
        "formats.native_image_extensions",
        &formats.native_image_extensions,
        &formats.image_extensions,
    )?;
    check_subset(
        "formats.native_video_extensions",
        &formats.native_video_extensions,
        &formats.video_extensions,
    )?;

    if formats.image_target.trim().is_empty() || formats.video_target.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "formats.image_target and formats.video_target cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn check_subset(field: &str, native: &[String], known: &[String]) -> Result<(), ConfigError> {
    let known: Vec<String> = known.iter().map(|e| e.to_ascii_lowercase()).collect();
    for ext in native {
        if !known.contains(&ext.to_ascii_lowercase()) {
            return Err(ConfigError::ValidationError(format!(
                "{field} contains '{ext}' which is not a known extension"
            )));
        }
    }
    Ok(())
}

/// Canonical source and destination roots that passed [`validate_roots`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedRoots {
    pub source: PathBuf,
    pub destination: PathBuf,
}

/// Checks that both roots exist as directories, differ, and do not contain
/// one another. Returns their canonical forms.
pub fn validate_roots(source: &Path, destination: &Path) -> Result<ValidatedRoots, ConfigError> {
    let source = canonical_dir(source).ok_or_else(|| ConfigError::SourceMissing(source.into()))?;
    let destination = canonical_dir(destination)
        .ok_or_else(|| ConfigError::DestinationMissing(destination.into()))?;

    if source == destination {
        return Err(ConfigError::SameFolder(source));
    }
    if source.starts_with(&destination) || destination.starts_with(&source) {
        return Err(ConfigError::NestedFolders {
            source_dir: source,
            destination,
        });
    }

    Ok(ValidatedRoots {
        source,
        destination,
    })
}

fn canonical_dir(path: &Path) -> Option<PathBuf> {
    let canonical = std::fs::canonicalize(path).ok()?;
    canonical.is_dir().then_some(canonical)
}
