//! Per-device index model (`<channel>/<device>/index.json`).

use serde::{Deserialize, Serialize};

/// Contents of `<channel>/<device>/index.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceIndex {
    /// Index-wide metadata.
    #[serde(default)]
    pub global: GlobalInfo,

    /// Published images, in the order the server lists them.
    ///
    /// `None` when the document carries no `images` key at all.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<Image>>,
}

/// The `global` block of a device index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalInfo {
    /// Server-formatted timestamp of when the index was generated.
    #[serde(default)]
    pub generated_at: String,
}

/// One release image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    /// Monotonic build number of the image.
    pub version: u32,

    /// Whether the image is a full payload or a delta.
    #[serde(rename = "type")]
    pub image_type: ImageType,

    /// Files making up the image, in installation order.
    #[serde(default)]
    pub files: Vec<FileDescriptor>,
}

impl Image {
    /// Returns `true` for full (non-delta) images.
    pub fn is_full(&self) -> bool {
        self.image_type == ImageType::Full
    }
}

/// Kind of payload an [`Image`] carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageType {
    /// Complete payload, installable on its own.
    Full,
    /// Incremental payload on top of a base image.
    Delta,
    /// Any type this client does not know about.
    #[serde(other)]
    Other,
}

/// A file of an image together with its detached signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDescriptor {
    /// Server-relative location of the file.
    pub path: String,

    /// Server-relative location of the `.asc` signature.
    pub signature: String,

    /// Lowercase hex SHA-256 of the file, when published.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
}
