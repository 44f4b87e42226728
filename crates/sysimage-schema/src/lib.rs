//! Shared wire types for the system-image server.
//!
//! The server publishes two JSON documents that the engine consumes:
//!
//! - `channels.json`, the [`ChannelIndex`], listing release channels and the
//!   devices each channel carries.
//! - `<channel>/<device>/index.json`, the [`DeviceIndex`], listing the
//!   [`Image`]s published for one device on one channel.
//!
//! This crate performs no I/O; it only describes the documents.

pub mod channels;
pub mod device;

// Re-exports
pub use channels::{ChannelIndex, ChannelInfo, DeviceEntry, Redirect};
pub use device::{DeviceIndex, FileDescriptor, GlobalInfo, Image, ImageType};

/// Names of the keyring archives every installation needs, in download order.
///
/// Each archive is paired with its detached `.asc` signature.
pub const KEYRING_FILES: [&str; 4] = [
    "image-signing.tar.xz",
    "image-signing.tar.xz.asc",
    "image-master.tar.xz",
    "image-master.tar.xz.asc",
];
