pub mod cache;
pub mod client;
pub mod commands;
pub mod config;
pub mod error;
pub mod events;
pub mod io;
pub mod paths;
pub mod planner;
pub mod resolver;
pub mod stager;

pub use client::{Client, InstallRequest};
pub use commands::{InstallOptions, InstallScript};
pub use config::ClientConfig;
pub use error::{Error, Result};
pub use events::{Activity, DownloadEvent, EventSink};
pub use stager::PushEntry;

/// User Agent string for core operations
pub const USER_AGENT: &str = concat!("sysimage-core/", env!("CARGO_PKG_VERSION"));
