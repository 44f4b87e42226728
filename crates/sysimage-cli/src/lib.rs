//! sysimage - system-image release downloader
#![allow(missing_docs)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
//!
//! Resolves the newest full image of a device on a release channel, fetches
//! and verifies every file it needs, and writes the recovery command file.
//!
//! # Directory Layout
//!
//! ```text
//! $SYSIMAGE_HOME/
//! ├── pool/          # Image files and their signatures
//! ├── gpg/           # Keyring archives
//! └── commandfile/   # ubuntu_command
//! ```
//!
//! The `download` subcommand prints the push manifest: every local file and
//! the directory on the device it belongs in.

pub mod cmd;
pub mod ui;

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use sysimage_core::ClientConfig;
use sysimage_core::config::DEFAULT_HOST;

#[derive(Debug, Parser)]
#[command(name = "sysimage")]
#[command(author, version, about = "sysimage - fetch system-image releases for recovery install")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every subcommand.
#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// System-image server base URL
    #[arg(long, global = true, env = "SYSIMAGE_HOST", default_value = DEFAULT_HOST)]
    pub host: String,

    /// Download root (pool/, gpg/ and commandfile/ are created below it)
    #[arg(long, global = true, env = "SYSIMAGE_HOME")]
    pub root: Option<PathBuf>,

    /// Seconds a fetched index stays fresh
    #[arg(long, global = true, value_name = "SECONDS")]
    pub cache_ttl: Option<u64>,

    /// Accept an http:// host
    #[arg(long, global = true)]
    pub allow_insecure: bool,
}

impl GlobalArgs {
    /// Environment defaults overlaid with the command line.
    pub fn config(&self) -> anyhow::Result<ClientConfig> {
        let mut config = ClientConfig::from_env()?;
        config.host.clone_from(&self.host);
        config.allow_insecure |= self.allow_insecure;
        if let Some(root) = &self.root {
            config.root.clone_from(root);
        }
        if let Some(secs) = self.cache_ttl {
            config.cache_ttl = Duration::from_secs(secs);
        }
        Ok(config)
    }
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List public channels
    Channels,
    /// List public channels that carry a device
    #[command(name = "device-channels")]
    DeviceChannels {
        /// Device codename
        device: String,
    },
    /// Show when a device index was generated
    #[command(name = "release-date")]
    ReleaseDate {
        /// Device codename
        device: String,
        /// Channel name
        channel: String,
    },
    /// Show the latest full image of a device
    Latest {
        /// Device codename
        device: String,
        /// Channel name
        channel: String,
        /// Print the image as JSON
        #[arg(long)]
        json: bool,
    },
    /// Download the latest full image and write the command file
    Download {
        /// Device codename
        device: String,
        /// Channel name
        channel: String,
        /// Format the data partition during install
        #[arg(long)]
        wipe: bool,
        /// Run the installer check after install
        #[arg(long)]
        installer_check: bool,
        /// Feature to enable after install (repeatable)
        #[arg(long, value_name = "NAME")]
        enable: Vec<String>,
        /// Print the push manifest as JSON
        #[arg(long)]
        json: bool,
    },
}
