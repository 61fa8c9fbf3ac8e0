//! File system placer implementation.

use filetime::FileTime;
use std::path::Path;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader, BufWriter};

use super::config::PlacerConfig;
use super::error::PlacerError;
use super::types::{PlacedFile, PlacementMethod};

/// File system based placer implementation.
#[derive(Debug, Clone, Default)]
pub struct FsPlacer {
    config: PlacerConfig,
}

impl FsPlacer {
    /// Creates a new file system placer with the given configuration.
    pub fn new(config: PlacerConfig) -> Self {
        Self { config }
    }

    /// Creates a placer with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(PlacerConfig::default())
    }

    /// Attempts to move a file atomically (rename).
    async fn try_atomic_move(source: &Path, destination: &Path) -> Result<bool, std::io::Error> {
        match fs::rename(source, destination).await {
            Ok(()) => Ok(true),
            Err(e) => {
                // Cross-filesystem moves fail with EXDEV (18 on Linux)
                // We check for CrossesDevices error kind or the raw EXDEV code
                if e.kind() == std::io::ErrorKind::CrossesDevices || e.raw_os_error() == Some(18) {
                    Ok(false)
                } else {
                    Err(e)
                }
            }
        }
    }

    async fn source_metadata(source: &Path) -> Result<std::fs::Metadata, PlacerError> {
        fs::metadata(source).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                PlacerError::SourceNotFound {
                    path: source.to_path_buf(),
                }
            } else {
                PlacerError::Io(e)
            }
        })
    }

    /// Creates `folder` and any missing parents.
    pub async fn ensure_folder(&self, folder: &Path) -> Result<(), PlacerError> {
        fs::create_dir_all(folder)
            .await
            .map_err(|e| PlacerError::DirectoryCreationFailed {
                path: folder.to_path_buf(),
                source: e,
            })
    }

    /// Streams `source` into a newly created `destination`.
    ///
    /// The destination must not exist. A failed copy leaves nothing behind.
    async fn copy_file(&self, source: &Path, destination: &Path) -> Result<u64, PlacerError> {
        let source_file = File::open(source).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                PlacerError::SourceNotFound {
                    path: source.to_path_buf(),
                }
            } else {
                PlacerError::Io(e)
            }
        })?;

        let dest_file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(destination)
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::AlreadyExists {
                    PlacerError::DestinationExists {
                        path: destination.to_path_buf(),
                    }
                } else {
                    PlacerError::copy_failed(source.to_path_buf(), destination.to_path_buf(), e)
                }
            })?;

        match self.stream(source_file, dest_file).await {
            Ok(total) => Ok(total),
            Err(e) => {
                if let Err(cleanup) = fs::remove_file(destination).await {
                    tracing::warn!(
                        path = %destination.display(),
                        error = %cleanup,
                        "Failed to remove partial copy"
                    );
                }
                Err(PlacerError::copy_failed(
                    source.to_path_buf(),
                    destination.to_path_buf(),
                    e,
                ))
            }
        }
    }

    async fn stream(&self, source: File, destination: File) -> Result<u64, std::io::Error> {
        let mut reader = BufReader::with_capacity(self.config.buffer_size, source);
        let mut writer = BufWriter::with_capacity(self.config.buffer_size, destination);

        let mut total_bytes = 0u64;
        let mut buffer = vec![0u8; self.config.buffer_size.max(1)];

        loop {
            let bytes_read = reader.read(&mut buffer).await?;
            if bytes_read == 0 {
                break;
            }
            writer.write_all(&buffer[..bytes_read]).await?;
            total_bytes += bytes_read as u64;
        }

        writer.flush().await?;
        writer.into_inner().sync_all().await?;
        Ok(total_bytes)
    }

    /// Carries timestamps and permissions from `source_meta` over to
    /// `destination`. Failures are logged, not returned: the file itself
    /// is already in place.
    async fn preserve_metadata(&self, source_meta: &std::fs::Metadata, destination: &Path) {
        if !self.config.preserve_metadata {
            return;
        }

        let atime = FileTime::from_last_access_time(source_meta);
        let mtime = FileTime::from_last_modification_time(source_meta);
        if let Err(e) = filetime::set_file_times(destination, atime, mtime) {
            tracing::warn!(
                path = %destination.display(),
                error = %e,
                "Failed to preserve timestamps"
            );
        }

        if let Err(e) = fs::set_permissions(destination, source_meta.permissions()).await {
            tracing::warn!(
                path = %destination.display(),
                error = %e,
                "Failed to preserve permissions"
            );
        }
    }

    /// Copies `source` to `destination`, leaving the source untouched.
    pub async fn copy(&self, source: &Path, destination: &Path) -> Result<PlacedFile, PlacerError> {
        let meta = Self::source_metadata(source).await?;
        let size_bytes = self.copy_file(source, destination).await?;
        self.preserve_metadata(&meta, destination).await;

        Ok(PlacedFile {
            destination: destination.to_path_buf(),
            size_bytes,
            method: PlacementMethod::Copy,
        })
    }

    /// Moves `source` to `destination`.
    ///
    /// Tries a rename first; across filesystems it copies and then deletes
    /// the source. If that delete fails the placement is still reported,
    /// as a plain copy.
    pub async fn relocate(
        &self,
        source: &Path,
        destination: &Path,
    ) -> Result<PlacedFile, PlacerError> {
        let meta = Self::source_metadata(source).await?;

        // rename(2) replaces an existing target, so check first.
        if fs::symlink_metadata(destination).await.is_ok() {
            return Err(PlacerError::DestinationExists {
                path: destination.to_path_buf(),
            });
        }

        if self.config.prefer_atomic_moves {
            let renamed = Self::try_atomic_move(source, destination)
                .await
                .map_err(|e| {
                    PlacerError::move_failed(source.to_path_buf(), destination.to_path_buf(), e)
                })?;
            if renamed {
                return Ok(PlacedFile {
                    destination: destination.to_path_buf(),
                    size_bytes: meta.len(),
                    method: PlacementMethod::Rename,
                });
            }
            tracing::debug!(
                source = %source.display(),
                destination = %destination.display(),
                "Rename crossed devices, falling back to copy"
            );
        }

        let size_bytes = self.copy_file(source, destination).await?;
        self.preserve_metadata(&meta, destination).await;

        let method = match self.remove_source(source).await {
            Ok(()) => PlacementMethod::CopyThenDelete,
            Err(e) => {
                tracing::warn!(error = %e, "Moved file left its source behind");
                PlacementMethod::Copy
            }
        };

        Ok(PlacedFile {
            destination: destination.to_path_buf(),
            size_bytes,
            method,
        })
    }

    /// Deletes a source file after its content has been placed elsewhere.
    pub async fn remove_source(&self, source: &Path) -> Result<(), PlacerError> {
        fs::remove_file(source)
            .await
            .map_err(|e| PlacerError::CleanupFailed {
                path: source.to_path_buf(),
                source: e,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_copy_keeps_source() {
        let temp = TempDir::new().unwrap();
        let source_path = temp.path().join("source.jpg");
        let dest_path = temp.path().join("dest").join("output.jpg");

        fs::write(&source_path, "test content").await.unwrap();

        let placer = FsPlacer::with_defaults();
        placer
            .ensure_folder(dest_path.parent().unwrap())
            .await
            .unwrap();
        let placed = placer.copy(&source_path, &dest_path).await.unwrap();

        assert_eq!(placed.size_bytes, 12);
        assert_eq!(placed.method, PlacementMethod::Copy);
        assert!(placed.method.source_retained());
        assert!(source_path.exists());
        assert_eq!(fs::read_to_string(&dest_path).await.unwrap(), "test content");
    }

    #[tokio::test]
    async fn test_copy_preserves_modification_time() {
        let temp = TempDir::new().unwrap();
        let source_path = temp.path().join("old.jpg");
        let dest_path = temp.path().join("copy.jpg");
        fs::write(&source_path, "pixels").await.unwrap();

        let past = FileTime::from_unix_time(1_500_000_000, 0);
        filetime::set_file_times(&source_path, past, past).unwrap();

        FsPlacer::with_defaults()
            .copy(&source_path, &dest_path)
            .await
            .unwrap();

        let meta = std::fs::metadata(&dest_path).unwrap();
        assert_eq!(FileTime::from_last_modification_time(&meta), past);
    }

    #[tokio::test]
    async fn test_copy_never_overwrites() {
        let temp = TempDir::new().unwrap();
        let source_path = temp.path().join("source.jpg");
        let dest_path = temp.path().join("output.jpg");

        fs::write(&source_path, "source content").await.unwrap();
        fs::write(&dest_path, "existing content").await.unwrap();

        let result = FsPlacer::with_defaults().copy(&source_path, &dest_path).await;
        assert!(matches!(result, Err(PlacerError::DestinationExists { .. })));
        assert_eq!(
            fs::read_to_string(&dest_path).await.unwrap(),
            "existing content"
        );
    }

    #[tokio::test]
    async fn test_copy_missing_source() {
        let temp = TempDir::new().unwrap();
        let result = FsPlacer::with_defaults()
            .copy(&temp.path().join("gone.jpg"), &temp.path().join("out.jpg"))
            .await;
        assert!(matches!(result, Err(PlacerError::SourceNotFound { .. })));
        assert!(!temp.path().join("out.jpg").exists());
    }

    #[tokio::test]
    async fn test_relocate_renames() {
        let temp = TempDir::new().unwrap();
        let source_path = temp.path().join("source.mov");
        let dest_path = temp.path().join("moved.mov");
        fs::write(&source_path, "frames").await.unwrap();

        let placed = FsPlacer::with_defaults()
            .relocate(&source_path, &dest_path)
            .await
            .unwrap();

        assert_eq!(placed.method, PlacementMethod::Rename);
        assert!(!placed.method.source_retained());
        assert!(!source_path.exists());
        assert!(dest_path.exists());
    }

    #[tokio::test]
    async fn test_relocate_without_rename_copies_then_deletes() {
        let temp = TempDir::new().unwrap();
        let source_path = temp.path().join("source.mov");
        let dest_path = temp.path().join("moved.mov");
        fs::write(&source_path, "frames").await.unwrap();

        let placer = FsPlacer::new(PlacerConfig::default().with_atomic_moves(false));
        let placed = placer.relocate(&source_path, &dest_path).await.unwrap();

        assert_eq!(placed.method, PlacementMethod::CopyThenDelete);
        assert!(!source_path.exists());
        assert_eq!(fs::read_to_string(&dest_path).await.unwrap(), "frames");
    }

    #[tokio::test]
    async fn test_relocate_refuses_existing_destination() {
        let temp = TempDir::new().unwrap();
        let source_path = temp.path().join("source.mov");
        let dest_path = temp.path().join("taken.mov");
        fs::write(&source_path, "new").await.unwrap();
        fs::write(&dest_path, "old").await.unwrap();

        let result = FsPlacer::with_defaults()
            .relocate(&source_path, &dest_path)
            .await;
        assert!(matches!(result, Err(PlacerError::DestinationExists { .. })));
        assert!(source_path.exists());
        assert_eq!(fs::read_to_string(&dest_path).await.unwrap(), "old");
    }
}
