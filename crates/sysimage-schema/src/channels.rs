//! `channels.json` model.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Contents of `channels.json`: channel name to channel description.
///
/// Keys are kept sorted so channel listings are deterministic.
pub type ChannelIndex = BTreeMap<String, ChannelInfo>;

/// A single release channel as published in `channels.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelInfo {
    /// Hidden channels are not offered to users.
    #[serde(default)]
    pub hidden: bool,

    /// Set when the channel is an alias for another channel.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect: Option<Redirect>,

    /// Devices that have an index in this channel.
    #[serde(default)]
    pub devices: BTreeMap<String, DeviceEntry>,
}

impl ChannelInfo {
    /// Returns `true` if the channel redirects elsewhere.
    ///
    /// A `redirect: false` flag does not count as a redirect.
    pub fn is_redirect(&self) -> bool {
        match &self.redirect {
            Some(Redirect::Flag(flag)) => *flag,
            Some(Redirect::Target(target)) => !target.is_empty(),
            None => false,
        }
    }

    /// Returns `true` if the channel should be listed to users.
    pub fn is_listed(&self) -> bool {
        !self.hidden && !self.is_redirect()
    }

    /// Returns `true` if `device` has an index in this channel.
    pub fn has_device(&self, device: &str) -> bool {
        self.devices.contains_key(device)
    }
}

/// The `redirect` field is published either as a flag or as the name of the
/// channel being redirected to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Redirect {
    /// Plain boolean marker.
    Flag(bool),
    /// Name of the target channel.
    Target(String),
}

/// Per-device entry inside a channel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceEntry {
    /// Server-relative location of the device index, when published.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<String>,
}
