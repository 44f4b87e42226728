//! Error types for engine operations.

use std::path::PathBuf;
use std::sync::Arc;

use sysimage_schema::DeviceIndex;
use thiserror::Error;

use crate::commands::CommandError;
use crate::io::download::FetchError;

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Invalid or insecure configuration, raised before any work starts.
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Failed to fetch {url}: {reason}")]
    Network { url: String, reason: String },

    #[error("Malformed index at {url}: {source}")]
    MalformedIndex {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    /// The device index has no installable image. Carries the index as it
    /// was fetched, if there was one.
    #[error("No full images available for device '{device}' on channel '{channel}'")]
    NoImages {
        device: String,
        channel: String,
        index: Option<Arc<DeviceIndex>>,
    },

    #[error("Checksum mismatch for {}: expected {expected}, got {actual}", path.display())]
    ChecksumMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("Download of {url} failed: {source}")]
    Download {
        url: String,
        #[source]
        source: FetchError,
    },

    #[error("Filesystem error at {}: {source}", path.display())]
    FileSystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(#[from] CommandError),
}

impl Error {
    pub(crate) fn network(url: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::Network {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn fs(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileSystem {
            path: path.into(),
            source,
        }
    }
}
