//! Whole-file content digest
//!
//! SHA-256 over the file bytes, streamed in 1MB chunks so memory stays
//! bounded whatever the exposure size. The digest is the identity used for
//! dedup by downstream sync; it is computed once at registration.

use sha2::{Digest, Sha256};
use starvault_common::{Error, Result};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

const CHUNK_SIZE: usize = 1024 * 1024;

/// Hash a file synchronously; hex-encoded lowercase digest
pub fn hash_file_blocking(path: &Path) -> Result<String> {
    let mut file = File::open(path).map_err(|e| {
        Error::Io(std::io::Error::new(
            e.kind(),
            format!("Failed to open file for hashing: {}", e),
        ))
    })?;

    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; CHUNK_SIZE];

    loop {
        let bytes_read = file.read(&mut buffer).map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to read file for hashing: {}", e),
            ))
        })?;

        if bytes_read == 0 {
            break;
        }

        hasher.update(&buffer[..bytes_read]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

/// Hash a file on the blocking pool
pub async fn hash_file(path: &Path) -> Result<String> {
    let path_buf: PathBuf = path.to_path_buf();
    tracing::debug!(file = %path_buf.display(), "Calculating SHA-256 hash");

    let task_path = path_buf.clone();
    let hash = tokio::task::spawn_blocking(move || hash_file_blocking(&task_path))
        .await
        .map_err(|e| Error::Internal(format!("Hash calculation task failed: {}", e)))??;

    tracing::debug!(file = %path_buf.display(), hash = %hash, "Calculated hash");
    Ok(hash)
}
