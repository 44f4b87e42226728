//! Time-bounded cache over the remote channel and device indices.
//!
//! Entries are replaced wholesale on refresh and never mutated in place. A
//! failed refresh leaves the previous entry untouched; whether that stale
//! entry is served instead of the error is controlled by
//! [`IndexCache::serve_stale_on_error`].
//!
//! Concurrent callers racing on an expired entry may both fetch; the last
//! write wins.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use serde::de::DeserializeOwned;
use sysimage_schema::{ChannelIndex, DeviceIndex};
use tokio::sync::RwLock;

use crate::config::Host;
use crate::error::{Error, Result};
use crate::paths::join_url;

/// Time source for cache expiry.
pub trait Clock: Send + Sync + fmt::Debug {
    /// Current instant.
    fn now(&self) -> Instant;
}

/// Wall clock backed by [`Instant::now`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to. Used to test expiry without sleeping.
#[derive(Debug)]
pub struct ManualClock {
    start: Instant,
    offset_nanos: AtomicU64,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            offset_nanos: AtomicU64::new(0),
        }
    }

    /// Move the clock forward by `by`.
    pub fn advance(&self, by: Duration) {
        let nanos = u64::try_from(by.as_nanos()).unwrap_or(u64::MAX);
        self.offset_nanos.fetch_add(nanos, Ordering::SeqCst);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.start + Duration::from_nanos(self.offset_nanos.load(Ordering::SeqCst))
    }
}

/// A cached value and the instant it stops being fresh.
#[derive(Debug)]
pub struct CacheEntry<T> {
    data: Arc<T>,
    expires_at: Instant,
}

impl<T> CacheEntry<T> {
    fn new(data: Arc<T>, expires_at: Instant) -> Self {
        Self { data, expires_at }
    }

    /// Returns `true` while `now` is before the expiry instant.
    pub fn is_valid(&self, now: Instant) -> bool {
        now < self.expires_at
    }

    pub fn data(&self) -> &Arc<T> {
        &self.data
    }

    pub fn expires_at(&self) -> Instant {
        self.expires_at
    }
}

/// Cache key for device indices: `(device, channel)`.
type DeviceKey = (String, String);

/// TTL cache for `channels.json` and per-device `index.json` documents.
#[derive(Debug)]
pub struct IndexCache {
    client: reqwest::Client,
    host: Host,
    ttl: Duration,
    serve_stale_on_error: bool,
    clock: Arc<dyn Clock>,
    channels: RwLock<Option<CacheEntry<ChannelIndex>>>,
    devices: RwLock<HashMap<DeviceKey, CacheEntry<DeviceIndex>>>,
}

impl IndexCache {
    /// Create an empty cache for `host` whose entries live for `ttl`.
    pub fn new(client: reqwest::Client, host: Host, ttl: Duration) -> Self {
        Self {
            client,
            host,
            ttl,
            serve_stale_on_error: false,
            clock: Arc::new(SystemClock),
            channels: RwLock::new(None),
            devices: RwLock::new(HashMap::new()),
        }
    }

    /// Replace the time source.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// When set, a failed refresh of an expired entry returns the expired
    /// data (with a warning) instead of the error.
    pub fn serve_stale_on_error(mut self, enabled: bool) -> Self {
        self.serve_stale_on_error = enabled;
        self
    }

    pub fn host(&self) -> &Host {
        &self.host
    }

    /// Return the channel index, fetching `{host}channels.json` if the
    /// cached copy is missing or expired.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Network`] or [`Error::MalformedIndex`] if a needed
    /// refresh fails.
    pub async fn channels_index(&self) -> Result<Arc<ChannelIndex>> {
        let now = self.clock.now();
        let stale = {
            let guard = self.channels.read().await;
            match guard.as_ref() {
                Some(entry) if entry.is_valid(now) => {
                    tracing::debug!("channels index cache hit");
                    return Ok(Arc::clone(entry.data()));
                }
                other => other.map(|entry| Arc::clone(entry.data())),
            }
        };

        let url = join_url(self.host.as_str(), "channels.json");
        match self.fetch::<ChannelIndex>(&url).await {
            Ok(index) => {
                let index = Arc::new(index);
                let expires_at = self.clock.now() + self.ttl;
                *self.channels.write().await =
                    Some(CacheEntry::new(Arc::clone(&index), expires_at));
                Ok(index)
            }
            Err(e) => self.fallback(stale, e),
        }
    }

    /// Return the index of `device` in `channel`, fetching
    /// `{host}{channel}/{device}/index.json` if the cached copy is missing or
    /// expired.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Network`] or [`Error::MalformedIndex`] if a needed
    /// refresh fails.
    pub async fn device_index(&self, device: &str, channel: &str) -> Result<Arc<DeviceIndex>> {
        let key: DeviceKey = (device.to_string(), channel.to_string());
        let now = self.clock.now();
        let stale = {
            let guard = self.devices.read().await;
            match guard.get(&key) {
                Some(entry) if entry.is_valid(now) => {
                    tracing::debug!("device index cache hit for {device} on {channel}");
                    return Ok(Arc::clone(entry.data()));
                }
                other => other.map(|entry| Arc::clone(entry.data())),
            }
        };

        let url = join_url(self.host.as_str(), &format!("{channel}/{device}/index.json"));
        match self.fetch::<DeviceIndex>(&url).await {
            Ok(index) => {
                let index = Arc::new(index);
                let expires_at = self.clock.now() + self.ttl;
                self.devices
                    .write()
                    .await
                    .insert(key, CacheEntry::new(Arc::clone(&index), expires_at));
                Ok(index)
            }
            Err(e) => self.fallback(stale, e),
        }
    }

    /// List channels that are neither hidden nor redirects, sorted by name.
    ///
    /// # Errors
    ///
    /// Propagates failures of [`channels_index`](Self::channels_index).
    pub async fn channels(&self) -> Result<Vec<String>> {
        let index = self.channels_index().await?;
        Ok(index
            .iter()
            .filter(|(_, info)| info.is_listed())
            .map(|(name, _)| name.clone())
            .collect())
    }

    /// List the listed channels that carry `device`.
    ///
    /// # Errors
    ///
    /// Propagates failures of [`channels_index`](Self::channels_index).
    pub async fn device_channels(&self, device: &str) -> Result<Vec<String>> {
        let index = self.channels_index().await?;
        Ok(index
            .iter()
            .filter(|(_, info)| info.is_listed() && info.has_device(device))
            .map(|(name, _)| name.clone())
            .collect())
    }

    /// Return the `generated_at` stamp of the device index.
    ///
    /// # Errors
    ///
    /// Propagates failures of [`device_index`](Self::device_index).
    pub async fn release_date(&self, device: &str, channel: &str) -> Result<String> {
        let index = self.device_index(device, channel).await?;
        Ok(index.global.generated_at.clone())
    }

    async fn fetch<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        tracing::debug!("fetching index {url}");

        let response = self
            .client
            .get(url)
            .header(reqwest::header::USER_AGENT, crate::USER_AGENT)
            .send()
            .await
            .map_err(|e| Error::network(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::network(url, format!("HTTP {status}")));
        }

        let body = response.bytes().await.map_err(|e| Error::network(url, e))?;
        serde_json::from_slice(&body).map_err(|source| Error::MalformedIndex {
            url: url.to_string(),
            source,
        })
    }

    fn fallback<T>(&self, stale: Option<Arc<T>>, err: Error) -> Result<Arc<T>> {
        match stale {
            Some(data) if self.serve_stale_on_error => {
                tracing::warn!("index refresh failed, serving stale copy: {err}");
                Ok(data)
            }
            _ => Err(err),
        }
    }
}
