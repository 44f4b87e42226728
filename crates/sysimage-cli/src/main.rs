//! sysimage - system-image release downloader

use anyhow::Result;
use clap::Parser;
use sysimage_core::Client;
use tracing_subscriber::EnvFilter;

use sysimage_cli::cmd;
use sysimage_cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let client = Client::new(cli.global.config()?)?;

    match cli.command {
        Commands::Channels => cmd::channels::channels(&client).await,
        Commands::DeviceChannels { device } => {
            cmd::channels::device_channels(&client, &device).await
        }
        Commands::ReleaseDate { device, channel } => {
            cmd::release::release_date(&client, &device, &channel).await
        }
        Commands::Latest {
            device,
            channel,
            json,
        } => cmd::release::latest(&client, &device, &channel, json).await,
        Commands::Download {
            device,
            channel,
            wipe,
            installer_check,
            enable,
            json,
        } => {
            let request = cmd::download::request(device, channel, wipe, installer_check, enable);
            cmd::download::download(&client, &request, json).await
        }
    }
}
