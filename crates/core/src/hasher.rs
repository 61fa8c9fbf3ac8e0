//! Streaming content digests for deduplication.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs::File;
use tokio::io::AsyncReadExt;

/// Read size used when hashing.
pub const HASH_CHUNK_SIZE: usize = 1024 * 1024;

/// Hex-encoded SHA-256 digest of a file's contents.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHash(String);

impl ContentHash {
    /// Wraps an already hex-encoded digest.
    pub fn new(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short form for log lines.
    pub fn short(&self) -> &str {
        match self.0.char_indices().nth(12) {
            Some((end, _)) => &self.0[..end],
            None => &self.0,
        }
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Hashing failed part-way through a file.
#[derive(Debug, Error)]
#[error("Failed to hash {path}")]
pub struct HashError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// Computes the SHA-256 digest of the file at `path` in fixed-size chunks.
pub async fn digest(path: &Path) -> Result<ContentHash, HashError> {
    digest_with_chunk_size(path, HASH_CHUNK_SIZE).await
}

/// Like [`digest`], with an explicit chunk size.
pub async fn digest_with_chunk_size(
    path: &Path,
    chunk_size: usize,
) -> Result<ContentHash, HashError> {
    let wrap = |source| HashError {
        path: path.to_path_buf(),
        source,
    };

    let mut file = File::open(path).await.map_err(wrap)?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; chunk_size.max(1)];

    loop {
        let bytes_read = file.read(&mut buffer).await.map_err(wrap)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(ContentHash(format!("{:x}", hasher.finalize())))
}
