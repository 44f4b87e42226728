use std::sync::Arc;

use sysimage_schema::Image;

use crate::cache::IndexCache;
use crate::error::{Error, Result};

/// Pick the newest full image, scanning in index order.
///
/// An image replaces the current best only if it is full and its version is
/// strictly greater, so among equal versions the first one listed wins.
/// Delta images are never selected.
pub fn select_latest_full(images: &[Image]) -> Option<&Image> {
    images.iter().fold(None, |best: Option<&Image>, image| {
        if !image.is_full() {
            return best;
        }
        match best {
            Some(current) if image.version <= current.version => Some(current),
            _ => Some(image),
        }
    })
}

/// Resolves the latest full image of a device on a channel.
#[derive(Debug, Clone)]
pub struct VersionResolver {
    cache: Arc<IndexCache>,
}

impl VersionResolver {
    pub fn new(cache: Arc<IndexCache>) -> Self {
        Self { cache }
    }

    /// Fetch the device index and return its latest full image.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoImages`] if the index has no `images` list or no
    /// full image, and propagates index fetch failures.
    pub async fn latest_version(&self, device: &str, channel: &str) -> Result<Image> {
        let index = self.cache.device_index(device, channel).await?;

        let latest = index
            .images
            .as_deref()
            .and_then(select_latest_full)
            .cloned();

        match latest {
            Some(image) => {
                tracing::info!(
                    "latest full image for {device} on {channel} is version {}",
                    image.version
                );
                Ok(image)
            }
            None => Err(Error::NoImages {
                device: device.to_string(),
                channel: channel.to_string(),
                index: Some(index),
            }),
        }
    }
}
