//! Client configuration and host validation.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Error, Result};

/// Default system-image server.
pub const DEFAULT_HOST: &str = "https://system-image.ubports.com/";

/// Default index cache lifetime (3 minutes).
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(180);

/// Default interval between progress samples.
pub const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_secs(1);

/// Default number of simultaneous artifact transfers.
pub const DEFAULT_MAX_PARALLEL_DOWNLOADS: usize = 4;

/// A validated system-image server base URL, always ending in `/`.
///
/// # Example
///
/// ```
/// use sysimage_core::config::Host;
///
/// let host = Host::parse("https://example.com", false).unwrap();
/// assert_eq!(host.as_str(), "https://example.com/");
/// assert!(Host::parse("http://example.com", false).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Host(String);

impl Host {
    /// Validate `raw` and normalize it to end with `/`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if `raw` is not an absolute `http(s)`
    /// URL with a host, or if it is `http://` and `allow_insecure` is unset.
    pub fn parse(raw: &str, allow_insecure: bool) -> Result<Self> {
        let url = reqwest::Url::parse(raw)
            .map_err(|e| Error::Configuration(format!("host is not a valid URL: {e}")))?;

        match url.scheme() {
            "https" => {}
            "http" if allow_insecure => {}
            "http" => {
                return Err(Error::Configuration(
                    "insecure URL, set allow_insecure to use an http:// host".to_string(),
                ));
            }
            other => {
                return Err(Error::Configuration(format!(
                    "host is not a valid URL: unsupported scheme '{other}'"
                )));
            }
        }

        if url.host_str().is_none_or(str::is_empty) {
            return Err(Error::Configuration(
                "host is not a valid URL: missing host".to_string(),
            ));
        }

        if raw.ends_with('/') {
            Ok(Self(raw.to_string()))
        } else {
            Ok(Self(format!("{raw}/")))
        }
    }

    /// Return the normalized host URL.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Host {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Settings for a [`Client`](crate::Client).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server base URL, validated when the client is built.
    pub host: String,
    /// Accept `http://` hosts.
    pub allow_insecure: bool,
    /// Local download root (`pool/`, `gpg/` and `commandfile/` live below it).
    pub root: PathBuf,
    /// How long a fetched index stays fresh.
    pub cache_ttl: Duration,
    /// Return an expired index when its refresh fails instead of the error.
    pub serve_stale_on_error: bool,
    /// How often aggregate download progress is sampled.
    pub progress_interval: Duration,
    /// Upper bound on simultaneous artifact transfers.
    pub max_parallel_downloads: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            allow_insecure: false,
            root: crate::paths::sysimage_home(),
            cache_ttl: DEFAULT_CACHE_TTL,
            serve_stale_on_error: false,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            max_parallel_downloads: DEFAULT_MAX_PARALLEL_DOWNLOADS,
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables on top of the defaults.
    ///
    /// Reads `SYSIMAGE_HOST`, `SYSIMAGE_HOME`, `SYSIMAGE_CACHE_TTL` (seconds)
    /// and `SYSIMAGE_ALLOW_INSECURE` (`1` or `true`).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if `SYSIMAGE_CACHE_TTL` is not a
    /// whole number of seconds.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(host) = std::env::var("SYSIMAGE_HOST") {
            config.host = host;
        }
        if let Ok(ttl) = std::env::var("SYSIMAGE_CACHE_TTL") {
            let secs = ttl.parse::<u64>().map_err(|_| {
                Error::Configuration(format!("SYSIMAGE_CACHE_TTL must be seconds, got '{ttl}'"))
            })?;
            config.cache_ttl = Duration::from_secs(secs);
        }
        config.allow_insecure = std::env::var("SYSIMAGE_ALLOW_INSECURE")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        Ok(config)
    }

    /// Validate the configured host.
    ///
    /// # Errors
    ///
    /// See [`Host::parse`].
    pub fn validated_host(&self) -> Result<Host> {
        Host::parse(&self.host, self.allow_insecure)
    }
}
