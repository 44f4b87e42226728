//! Download command

use anyhow::{Context, Result};
use sysimage_core::{Client, InstallOptions, InstallRequest, PushEntry};

use crate::ui::EventRenderer;

/// Fetch the latest full image, write the command file and print the push
/// manifest.
pub async fn download(
    client: &Client,
    request: &InstallRequest,
    json: bool,
) -> Result<()> {
    let renderer = EventRenderer::spawn();
    let result = client
        .download_latest_version(request, renderer.sink())
        .await;
    renderer.finish().await;

    let manifest = result.with_context(|| {
        format!(
            "Failed to download {} from {}",
            request.device, request.channel
        )
    })?;

    if json {
        let text = serde_json::to_string_pretty(&manifest).context("Failed to encode manifest")?;
        println!("{text}");
    } else {
        print_manifest(&manifest);
    }
    Ok(())
}

/// Build the request from command line flags.
pub fn request(
    device: String,
    channel: String,
    wipe: bool,
    installer_check: bool,
    enable: Vec<String>,
) -> InstallRequest {
    InstallRequest::new(device, channel).with_options(InstallOptions {
        installer_check,
        wipe,
        enable,
    })
}

fn print_manifest(manifest: &[PushEntry]) {
    for entry in manifest {
        println!("{} -> {}", entry.src.display(), entry.dest);
    }
}
