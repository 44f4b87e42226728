//! Channel listings

use anyhow::Result;
use sysimage_core::Client;

/// Print every public channel, one per line.
pub async fn channels(client: &Client) -> Result<()> {
    for name in client.channels().await? {
        println!("{name}");
    }
    Ok(())
}

/// Print the public channels that carry `device`, one per line.
pub async fn device_channels(client: &Client, device: &str) -> Result<()> {
    let names = client.device_channels(device).await?;
    if names.is_empty() {
        eprintln!("no public channel carries '{device}'");
    }
    for name in names {
        println!("{name}");
    }
    Ok(())
}
