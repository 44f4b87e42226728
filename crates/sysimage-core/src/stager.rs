//! Command file output and the device push manifest.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::commands::InstallScript;
use crate::error::{Error, Result};
use crate::paths::command_dir;
use crate::planner::Artifact;

/// File name of the generated command file, locally and on the device.
pub const COMMAND_FILE: &str = "ubuntu_command";

/// Directory on the device that receives every pushed file.
pub const DEVICE_PUSH_DIR: &str = "/cache/recovery/";

/// One local file and where it goes on the device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PushEntry {
    pub src: PathBuf,
    pub dest: String,
}

/// Write `script` to `{root}/commandfile/ubuntu_command`, creating the
/// directory if needed, and return the file's path.
///
/// # Errors
///
/// Returns [`Error::FileSystem`] if the directory or the file cannot be
/// written.
pub async fn write_command_file(script: &InstallScript, root: &Path) -> Result<PathBuf> {
    let dir = command_dir(root);
    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(|e| Error::fs(&dir, e))?;

    let path = dir.join(COMMAND_FILE);
    tokio::fs::write(&path, script.to_text())
        .await
        .map_err(|e| Error::fs(&path, e))?;

    tracing::debug!("wrote command file {}", path.display());
    Ok(path)
}

/// One entry per artifact in order, followed by the command file.
pub fn build_push_manifest(artifacts: &[Artifact], command_file: &Path) -> Vec<PushEntry> {
    artifacts
        .iter()
        .map(|artifact| PushEntry {
            src: artifact.local_path().to_path_buf(),
            dest: DEVICE_PUSH_DIR.to_string(),
        })
        .chain(std::iter::once(PushEntry {
            src: command_file.to_path_buf(),
            dest: format!("{DEVICE_PUSH_DIR}{COMMAND_FILE}"),
        }))
        .collect()
}
