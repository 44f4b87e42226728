//! End-to-end workflow: resolve, plan, download, stage.

use std::sync::Arc;

use sysimage_schema::Image;

use crate::cache::IndexCache;
use crate::commands::{InstallFile, InstallOptions, build_install_commands};
use crate::config::{ClientConfig, Host};
use crate::error::{Error, Result};
use crate::events::{Activity, EventSink};
use crate::io::download::{Downloader, HttpDownloader};
use crate::io::orchestrator::DownloadOrchestrator;
use crate::planner::ArtifactPlanner;
use crate::resolver::VersionResolver;
use crate::stager::{PushEntry, build_push_manifest, write_command_file};

/// What to install and how.
#[derive(Debug, Clone, Default)]
pub struct InstallRequest {
    pub device: String,
    pub channel: String,
    pub options: InstallOptions,
}

impl InstallRequest {
    pub fn new(device: impl Into<String>, channel: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            channel: channel.into(),
            options: InstallOptions::default(),
        }
    }

    pub fn with_options(mut self, options: InstallOptions) -> Self {
        self.options = options;
        self
    }
}

/// Owns the index cache and the downloader for one server.
#[derive(Debug, Clone)]
pub struct Client {
    config: ClientConfig,
    host: Host,
    cache: Arc<IndexCache>,
    resolver: VersionResolver,
    planner: ArtifactPlanner,
    orchestrator: DownloadOrchestrator,
}

impl Client {
    /// Build a client from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the host is invalid or insecure,
    /// or the HTTP client cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let host = config.validated_host()?;

        let http = reqwest::Client::builder()
            .user_agent(crate::USER_AGENT)
            .build()
            .map_err(|e| Error::Configuration(format!("failed to build HTTP client: {e}")))?;

        let cache = Arc::new(
            IndexCache::new(http.clone(), host.clone(), config.cache_ttl)
                .serve_stale_on_error(config.serve_stale_on_error),
        );
        let downloader = Arc::new(HttpDownloader::new(http, config.max_parallel_downloads));

        Ok(Self {
            resolver: VersionResolver::new(Arc::clone(&cache)),
            planner: ArtifactPlanner::new(host.clone(), config.root.clone()),
            orchestrator: DownloadOrchestrator::new(downloader)
                .with_progress_interval(config.progress_interval),
            cache,
            host,
            config,
        })
    }

    /// Replace the artifact downloader. Index fetches are unaffected.
    pub fn with_downloader(mut self, downloader: Arc<dyn Downloader>) -> Self {
        self.orchestrator = DownloadOrchestrator::new(downloader)
            .with_progress_interval(self.config.progress_interval);
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn host(&self) -> &Host {
        &self.host
    }

    pub fn cache(&self) -> &IndexCache {
        &self.cache
    }

    /// Listed channel names. See [`IndexCache::channels`].
    ///
    /// # Errors
    ///
    /// Propagates index fetch failures.
    pub async fn channels(&self) -> Result<Vec<String>> {
        self.cache.channels().await
    }

    /// Listed channels carrying `device`. See [`IndexCache::device_channels`].
    ///
    /// # Errors
    ///
    /// Propagates index fetch failures.
    pub async fn device_channels(&self, device: &str) -> Result<Vec<String>> {
        self.cache.device_channels(device).await
    }

    /// Generation stamp of the device index.
    ///
    /// # Errors
    ///
    /// Propagates index fetch failures.
    pub async fn release_date(&self, device: &str, channel: &str) -> Result<String> {
        self.cache.release_date(device, channel).await
    }

    /// Latest full image of `device` on `channel`.
    ///
    /// # Errors
    ///
    /// See [`VersionResolver::latest_version`].
    pub async fn latest_version(&self, device: &str, channel: &str) -> Result<Image> {
        self.resolver.latest_version(device, channel).await
    }

    /// Resolve the latest full image, make all of its artifacts present and
    /// verified under the root, write the command file and return the push
    /// manifest.
    ///
    /// # Errors
    ///
    /// Returns the first failure of any stage. [`Error::InvalidInput`] is
    /// raised before any artifact is fetched. Files already fetched stay on
    /// disk, so calling again resumes.
    pub async fn download_latest_version(
        &self,
        request: &InstallRequest,
        events: &EventSink,
    ) -> Result<Vec<PushEntry>> {
        events.activity(Activity::Resolving);
        let image = self
            .resolver
            .latest_version(&request.device, &request.channel)
            .await?;

        // Reject a script the updater could not parse before fetching anything.
        let files: Vec<InstallFile> = image.files.iter().map(InstallFile::from).collect();
        let script = build_install_commands(&files, &request.options)?;

        let artifacts = self.planner.plan(&image);
        let artifacts = self.orchestrator.download(artifacts, events).await?;

        events.activity(Activity::Staging);
        let command_file = write_command_file(&script, self.planner.root()).await?;
        let manifest = build_push_manifest(&artifacts, &command_file);

        tracing::info!(
            "version {} of {} staged, {} files to push",
            image.version,
            request.device,
            manifest.len()
        );
        events.activity(Activity::Finished);
        Ok(manifest)
    }
}
