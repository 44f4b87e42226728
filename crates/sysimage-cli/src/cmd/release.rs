//! Release queries

use anyhow::{Context, Result};
use sysimage_core::Client;

/// Print the generation stamp of a device index.
pub async fn release_date(client: &Client, device: &str, channel: &str) -> Result<()> {
    println!("{}", client.release_date(device, channel).await?);
    Ok(())
}

/// Print the latest full image of a device.
pub async fn latest(client: &Client, device: &str, channel: &str, json: bool) -> Result<()> {
    let image = client.latest_version(device, channel).await?;

    if json {
        let text = serde_json::to_string_pretty(&image).context("Failed to encode image")?;
        println!("{text}");
        return Ok(());
    }

    println!("version {}", image.version);
    for file in &image.files {
        println!("  {}", file.path);
    }
    Ok(())
}
