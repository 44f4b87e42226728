//! Subcommand implementations

pub mod channels;
pub mod download;
pub mod release;
