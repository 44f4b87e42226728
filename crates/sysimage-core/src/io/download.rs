//! Single-artifact transfer over HTTP.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use thiserror::Error;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio::sync::Semaphore;

use super::progress::ProgressCounters;

/// Reasons a single transfer can fail.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server responded with status {status}")]
    Status { status: u16 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("transfer interrupted: {0}")]
    Interrupted(String),
}

/// Fetches one URL into one local file.
///
/// Implementations add the announced size to
/// [`ProgressCounters::add_expected`] once known and every received chunk to
/// [`ProgressCounters::add_downloaded`]. Checksum verification is not their
/// concern.
#[async_trait]
pub trait Downloader: Send + Sync + fmt::Debug {
    /// Write the body of `url` to `dest`, replacing any existing file.
    /// `dest` must not hold a partial body after a failed transfer.
    /// Returns the number of bytes written.
    async fn fetch(
        &self,
        url: &str,
        dest: &Path,
        progress: &ProgressCounters,
    ) -> Result<u64, FetchError>;
}

/// [`Downloader`] backed by a shared `reqwest` client.
///
/// At most `max_parallel` transfers run at once; callers beyond that wait for
/// a slot.
#[derive(Debug, Clone)]
pub struct HttpDownloader {
    client: Client,
    permits: Arc<Semaphore>,
}

impl HttpDownloader {
    pub fn new(client: Client, max_parallel: usize) -> Self {
        Self {
            client,
            permits: Arc::new(Semaphore::new(max_parallel.max(1))),
        }
    }
}

#[async_trait]
impl Downloader for HttpDownloader {
    async fn fetch(
        &self,
        url: &str,
        dest: &Path,
        progress: &ProgressCounters,
    ) -> Result<u64, FetchError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| FetchError::Interrupted(e.to_string()))?;

        let response = self
            .client
            .get(url)
            .header(reqwest::header::USER_AGENT, crate::USER_AGENT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }

        if let Some(len) = response.content_length() {
            progress.add_expected(len);
        }

        let part = part_path(dest);
        match stream_to_file(response, &part, progress).await {
            Ok(written) => {
                tokio::fs::rename(&part, dest).await?;
                tracing::debug!("wrote {written} bytes to {}", dest.display());
                Ok(written)
            }
            Err(e) => {
                let _ = tokio::fs::remove_file(&part).await;
                Err(e)
            }
        }
    }
}

/// Sibling of `dest` that receives the body until the transfer completes.
fn part_path(dest: &Path) -> PathBuf {
    let mut name = dest.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

async fn stream_to_file(
    response: reqwest::Response,
    path: &Path,
    progress: &ProgressCounters,
) -> Result<u64, FetchError> {
    let mut file = File::create(path).await?;
    let mut stream = response.bytes_stream();
    let mut written = 0u64;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        let len = chunk.len() as u64;
        written += len;
        progress.add_downloaded(len);
    }

    file.flush().await?;
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;
    use std::io::Write;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_fetch_writes_file_and_counts_bytes() {
        let mut server = Server::new_async().await;
        let body = vec![7u8; 4096];
        let _m = server
            .mock("GET", "/pool/rootfs.tar.xz")
            .with_status(200)
            .with_body(body.clone())
            .create_async()
            .await;

        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("rootfs.tar.xz");
        let counters = ProgressCounters::new();
        let downloader = HttpDownloader::new(Client::new(), 2);

        let url = format!("{}/pool/rootfs.tar.xz", server.url());
        let written = downloader.fetch(&url, &dest, &counters).await.unwrap();

        assert_eq!(written, 4096);
        assert_eq!(std::fs::read(&dest).unwrap(), body);
        assert_eq!(counters.downloaded(), 4096);
        assert_eq!(counters.expected(), 4096);
    }

    #[tokio::test]
    async fn test_fetch_overwrites_existing_file() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/gpg/image-master.tar.xz")
            .with_status(200)
            .with_body("new")
            .create_async()
            .await;

        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("image-master.tar.xz");
        std::fs::write(&dest, "old contents that are longer").unwrap();

        let url = format!("{}/gpg/image-master.tar.xz", server.url());
        HttpDownloader::new(Client::new(), 1)
            .fetch(&url, &dest, &ProgressCounters::new())
            .await
            .unwrap();

        assert_eq!(std::fs::read_to_string(&dest).unwrap(), "new");
    }

    #[tokio::test]
    async fn test_fetch_rejects_error_status() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/pool/missing.tar.xz")
            .with_status(404)
            .create_async()
            .await;

        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("missing.tar.xz");
        let url = format!("{}/pool/missing.tar.xz", server.url());

        let err = HttpDownloader::new(Client::new(), 1)
            .fetch(&url, &dest, &ProgressCounters::new())
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Status { status: 404 }));
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn test_interrupted_transfer_leaves_no_file() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/gpg/image-master.tar.xz.asc")
            .with_status(200)
            .with_chunked_body(|w| {
                w.write_all(&[1u8; 4096])?;
                Err(std::io::Error::other("connection reset"))
            })
            .create_async()
            .await;

        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("image-master.tar.xz.asc");
        let url = format!("{}/gpg/image-master.tar.xz.asc", server.url());

        let result = HttpDownloader::new(Client::new(), 1)
            .fetch(&url, &dest, &ProgressCounters::new())
            .await;

        assert!(result.is_err());
        assert!(!dest.exists());
        assert!(!part_path(&dest).exists());
    }

    #[test]
    fn test_part_path_is_sibling() {
        let dest = Path::new("/root/gpg/image-master.tar.xz");
        assert_eq!(
            part_path(dest),
            PathBuf::from("/root/gpg/image-master.tar.xz.part")
        );
    }
}
