use std::path::{Path, PathBuf};
use thiserror::Error;

/// Ways writing one media file into the destination can fail.
#[derive(Debug, Error)]
pub enum PlacerError {
    /// The source vanished between scan and placement.
    #[error("Media file disappeared before placement: {path}")]
    SourceNotFound { path: PathBuf },

    /// Something appeared at a reserved destination name.
    #[error("Reserved destination is already taken on disk: {path}")]
    DestinationExists { path: PathBuf },

    #[error("Cannot create destination folder {path}")]
    DirectoryCreationFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Copy {source} -> {destination} failed")]
    CopyFailed {
        source: PathBuf,
        destination: PathBuf,
        #[source]
        error: std::io::Error,
    },

    #[error("Move {source} -> {destination} failed")]
    MoveFailed {
        source: PathBuf,
        destination: PathBuf,
        #[source]
        error: std::io::Error,
    },

    /// The copy landed but the original could not be deleted afterwards.
    #[error("Placed, but the original could not be removed: {path}")]
    CleanupFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl PlacerError {
    pub fn copy_failed(source: PathBuf, destination: PathBuf, error: std::io::Error) -> Self {
        Self::CopyFailed {
            source,
            destination,
            error,
        }
    }

    pub fn move_failed(source: PathBuf, destination: PathBuf, error: std::io::Error) -> Self {
        Self::MoveFailed {
            source,
            destination,
            error,
        }
    }

    /// The file the error is about, when it names one.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::SourceNotFound { path }
            | Self::DestinationExists { path }
            | Self::DirectoryCreationFailed { path, .. }
            | Self::CleanupFailed { path, .. } => Some(path),
            Self::CopyFailed { source, .. } | Self::MoveFailed { source, .. } => Some(source),
            Self::Io(_) => None,
        }
    }

    /// The destination ended up holding a complete file despite the error.
    pub fn destination_written(&self) -> bool {
        matches!(self, Self::CleanupFailed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Error, ErrorKind};

    #[test]
    fn test_path_prefers_source_for_transfers() {
        let err = PlacerError::copy_failed(
            PathBuf::from("/in/a.jpg"),
            PathBuf::from("/out/a.jpg"),
            Error::new(ErrorKind::Other, "disk full"),
        );
        assert_eq!(err.path(), Some(Path::new("/in/a.jpg")));
        assert!(err.to_string().contains("/out/a.jpg"));
        assert!(!err.destination_written());
    }

    #[test]
    fn test_cleanup_failure_keeps_destination() {
        let err = PlacerError::CleanupFailed {
            path: PathBuf::from("/in/a.jpg"),
            source: Error::new(ErrorKind::PermissionDenied, "read-only"),
        };
        assert!(err.destination_written());
        assert!(PlacerError::from(Error::new(ErrorKind::Other, "x")).path().is_none());
    }
}
