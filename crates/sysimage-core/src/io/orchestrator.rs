//! Concurrent fetch-and-verify of a planned artifact list.
//!
//! Every artifact is satisfied by its own task: an existing file whose
//! checksum matches (or that has no checksum) is kept, anything else is
//! fetched and verified. The first failure aborts the remaining tasks.
//! Files that failed verification are left on disk and re-fetched on the
//! next run.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::{self, JoinSet};

use super::checksum::{file_digest, file_matches};
use super::download::{Downloader, FetchError};
use super::progress::{ProgressCounters, ProgressTicker};
use crate::config::DEFAULT_PROGRESS_INTERVAL;
use crate::error::{Error, Result};
use crate::events::{Activity, DownloadEvent, EventSink};
use crate::planner::Artifact;

/// Drives a [`Downloader`] over a list of artifacts.
#[derive(Debug, Clone)]
pub struct DownloadOrchestrator {
    downloader: Arc<dyn Downloader>,
    progress_interval: Duration,
}

impl DownloadOrchestrator {
    pub fn new(downloader: Arc<dyn Downloader>) -> Self {
        Self {
            downloader,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }

    /// Set how often aggregate progress is sampled.
    pub fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval;
        self
    }

    /// Ensure every artifact exists locally and passes verification.
    ///
    /// Emits [`Activity::Downloading`], periodic progress samples, one
    /// [`DownloadEvent::ArtifactDone`] per artifact and, on success only, a
    /// single terminal `Progress { fraction: 1.0, rate_mbps: 0.0 }`.
    ///
    /// Returns the artifacts in input order.
    ///
    /// # Errors
    ///
    /// Returns the first failure observed:
    /// - [`Error::Download`] if a transfer fails
    /// - [`Error::ChecksumMismatch`] if a fetched file does not verify
    /// - [`Error::FileSystem`] if a directory cannot be created or a file read
    pub async fn download(&self, artifacts: Vec<Artifact>, events: &EventSink) -> Result<Vec<Artifact>> {
        let total = artifacts.len();
        events.activity(Activity::Downloading);
        tracing::info!("ensuring {total} artifacts");

        let counters = Arc::new(ProgressCounters::new());
        let ticker = ProgressTicker::start(
            Arc::clone(&counters),
            events.clone(),
            self.progress_interval,
        );

        let mut set = JoinSet::new();
        let mut urls: HashMap<task::Id, String> = HashMap::with_capacity(total);

        for artifact in &artifacts {
            let artifact = artifact.clone();
            let url = artifact.url().to_string();
            let downloader = Arc::clone(&self.downloader);
            let counters = Arc::clone(&counters);

            let handle = set.spawn(async move {
                ensure_artifact(downloader.as_ref(), &artifact, &counters).await
            });
            urls.insert(handle.id(), url);
        }

        while let Some(joined) = set.join_next_with_id().await {
            let result = match joined {
                Ok((_, result)) => result,
                Err(e) => Err(Error::Download {
                    url: urls.get(&e.id()).cloned().unwrap_or_default(),
                    source: FetchError::Interrupted(e.to_string()),
                }),
            };

            if let Err(e) = result {
                tracing::warn!("artifact failed, aborting remaining downloads: {e}");
                set.abort_all();
                ticker.stop().await;
                return Err(e);
            }

            let completed = counters.mark_completed();
            events.emit(DownloadEvent::ArtifactDone { completed, total });
        }

        ticker.stop().await;
        events.emit(DownloadEvent::Progress {
            fraction: 1.0,
            rate_mbps: 0.0,
        });
        tracing::info!(
            "{total} artifacts ready ({} bytes transferred)",
            counters.downloaded()
        );

        Ok(artifacts)
    }
}

async fn ensure_artifact(
    downloader: &dyn Downloader,
    artifact: &Artifact,
    counters: &ProgressCounters,
) -> Result<()> {
    let path = artifact.local_path();

    if is_satisfied(artifact).await {
        tracing::debug!("{} already present", path.display());
        return Ok(());
    }

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| Error::fs(parent, e))?;
    }

    tracing::debug!("fetching {}", artifact.url());
    downloader
        .fetch(artifact.url(), path, counters)
        .await
        .map_err(|source| Error::Download {
            url: artifact.url().to_string(),
            source,
        })?;

    let Some(checksum) = artifact.checksum() else {
        return Ok(());
    };

    let actual = file_digest(path, checksum.algorithm)
        .await
        .map_err(|e| Error::fs(path, e))?;

    if !actual.eq_ignore_ascii_case(&checksum.sum) {
        return Err(Error::ChecksumMismatch {
            path: path.to_path_buf(),
            expected: checksum.sum.clone(),
            actual,
        });
    }

    Ok(())
}

/// A regular file at the artifact's path that either has no checksum to
/// meet or meets it.
async fn is_satisfied(artifact: &Artifact) -> bool {
    if !is_file(artifact.local_path()).await {
        return false;
    }
    match artifact.checksum() {
        Some(checksum) => file_matches(artifact.local_path(), checksum).await,
        None => true,
    }
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|meta| meta.is_file())
        .unwrap_or(false)
}
