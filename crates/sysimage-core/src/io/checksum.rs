//! File digests for artifact verification.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::planner::{Checksum, ChecksumAlgorithm};

/// Buffer size for reading files during checksum calculation (64KB).
const BUFFER_SIZE: usize = 64 * 1024;

/// Compute the lowercase hex digest of the file at `path`.
///
/// Hashing runs on the blocking pool.
///
/// # Errors
///
/// Returns an error if the file cannot be read.
pub async fn file_digest(path: &Path, algorithm: ChecksumAlgorithm) -> io::Result<String> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || match algorithm {
        ChecksumAlgorithm::Sha256 => sha256_file(&path),
    })
    .await
    .map_err(io::Error::other)?
}

/// Returns `true` if `path` is a regular file whose digest equals `expected`
/// (hex comparison ignores case). Unreadable files do not match.
pub async fn file_matches(path: &Path, expected: &Checksum) -> bool {
    match file_digest(path, expected.algorithm).await {
        Ok(actual) => actual.eq_ignore_ascii_case(&expected.sum),
        Err(_) => false,
    }
}

fn sha256_file(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; BUFFER_SIZE];

    loop {
        let count = file.read(&mut buffer)?;
        if count == 0 {
            break;
        }
        hasher.update(&buffer[..count]);
    }

    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const HELLO_WORLD_SHA256: &str =
        "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9";

    #[tokio::test]
    async fn test_file_digest() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("hello.txt");
        std::fs::write(&path, b"hello world").unwrap();

        let digest = file_digest(&path, ChecksumAlgorithm::Sha256).await.unwrap();
        assert_eq!(digest, HELLO_WORLD_SHA256);
    }

    #[tokio::test]
    async fn test_digest_of_file_larger_than_buffer() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("large.bin");
        std::fs::write(&path, vec![0xABu8; BUFFER_SIZE * 2 + 17]).unwrap();

        let first = file_digest(&path, ChecksumAlgorithm::Sha256).await.unwrap();
        let second = file_digest(&path, ChecksumAlgorithm::Sha256).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 64);
    }

    #[tokio::test]
    async fn test_file_matches_ignores_case() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("hello.txt");
        std::fs::write(&path, b"hello world").unwrap();

        let upper = Checksum {
            algorithm: ChecksumAlgorithm::Sha256,
            sum: HELLO_WORLD_SHA256.to_uppercase(),
        };
        assert!(file_matches(&path, &upper).await);

        let wrong = Checksum {
            algorithm: ChecksumAlgorithm::Sha256,
            sum: "00".repeat(32),
        };
        assert!(!file_matches(&path, &wrong).await);
    }

    #[tokio::test]
    async fn test_missing_file() {
        let result = file_digest(Path::new("/nonexistent/file.bin"), ChecksumAlgorithm::Sha256).await;
        assert!(result.is_err());
    }
}
