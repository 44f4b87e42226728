//! Expands a resolved image into the artifacts that must exist locally.
//!
//! Order is part of the contract: for every file, its content then its
//! signature, followed by the four keyring archives. Local paths depend only
//! on the root, the artifact kind and the basename, so re-planning after a
//! failed run yields the same paths.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use sysimage_schema::{FileDescriptor, Image, KEYRING_FILES};

use crate::config::Host;
use crate::paths::{basename, gpg_path, join_url, pool_path};

/// Supported digest algorithms for artifact verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumAlgorithm {
    Sha256,
}

impl fmt::Display for ChecksumAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sha256 => f.write_str("sha256"),
        }
    }
}

/// Expected digest of an artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Checksum {
    pub algorithm: ChecksumAlgorithm,
    /// Hex digest as published by the server.
    pub sum: String,
}

/// What an artifact is, which decides where it is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    /// An image file (stored in `pool/`).
    Content,
    /// Detached signature of an image file (stored in `pool/`).
    Signature,
    /// Keyring archive or its signature (stored in `gpg/`).
    Keyring,
}

/// A single downloadable unit and where it lands on disk.
///
/// Only [`ArtifactPlanner`] creates artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Artifact {
    kind: ArtifactKind,
    url: String,
    local_path: PathBuf,
    checksum: Option<Checksum>,
}

impl Artifact {
    pub(crate) fn new(
        kind: ArtifactKind,
        url: String,
        local_path: PathBuf,
        checksum: Option<Checksum>,
    ) -> Self {
        Self {
            kind,
            url,
            local_path,
            checksum,
        }
    }

    pub fn kind(&self) -> ArtifactKind {
        self.kind
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn local_path(&self) -> &Path {
        &self.local_path
    }

    pub fn checksum(&self) -> Option<&Checksum> {
        self.checksum.as_ref()
    }

    /// File name of the artifact on disk.
    pub fn file_name(&self) -> &str {
        basename(&self.url)
    }
}

/// Plans artifact lists for a host and a local root.
#[derive(Debug, Clone)]
pub struct ArtifactPlanner {
    host: Host,
    root: PathBuf,
}

impl ArtifactPlanner {
    pub fn new(host: Host, root: impl Into<PathBuf>) -> Self {
        Self {
            host,
            root: root.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Expand `image` into `2 * files + 4` artifacts.
    pub fn plan(&self, image: &Image) -> Vec<Artifact> {
        let mut artifacts = Vec::with_capacity(image.files.len() * 2 + KEYRING_FILES.len());
        for file in &image.files {
            artifacts.extend(self.file_artifacts(file));
        }
        artifacts.extend(self.keyring_artifacts());
        artifacts
    }

    /// Content and signature artifacts for one file descriptor.
    pub fn file_artifacts(&self, file: &FileDescriptor) -> [Artifact; 2] {
        let pool = pool_path(&self.root);

        let checksum = file.checksum.as_ref().map(|sum| Checksum {
            algorithm: ChecksumAlgorithm::Sha256,
            sum: sum.clone(),
        });

        [
            Artifact::new(
                ArtifactKind::Content,
                join_url(self.host.as_str(), &file.path),
                pool.join(basename(&file.path)),
                checksum,
            ),
            Artifact::new(
                ArtifactKind::Signature,
                join_url(self.host.as_str(), &file.signature),
                pool.join(basename(&file.signature)),
                None,
            ),
        ]
    }

    /// The fixed keyring artifacts, in [`KEYRING_FILES`] order.
    pub fn keyring_artifacts(&self) -> Vec<Artifact> {
        let gpg = gpg_path(&self.root);
        KEYRING_FILES
            .iter()
            .map(|name| {
                Artifact::new(
                    ArtifactKind::Keyring,
                    join_url(self.host.as_str(), &format!("gpg/{name}")),
                    gpg.join(name),
                    None,
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sysimage_schema::ImageType;

    fn planner() -> ArtifactPlanner {
        let host = Host::parse("https://system-image.example.com", false).unwrap();
        ArtifactPlanner::new(host, "/tmp/sysimage")
    }

    fn two_file_image() -> Image {
        Image {
            version: 42,
            image_type: ImageType::Full,
            files: vec![
                FileDescriptor {
                    path: "/pool/ubports-abc.tar.xz".into(),
                    signature: "/pool/ubports-abc.tar.xz.asc".into(),
                    checksum: Some("aa11".into()),
                },
                FileDescriptor {
                    path: "/pool/device-def.tar.xz".into(),
                    signature: "/pool/device-def.tar.xz.asc".into(),
                    checksum: None,
                },
            ],
        }
    }

    #[test]
    fn test_plan_order_and_length() {
        let artifacts = planner().plan(&two_file_image());
        assert_eq!(artifacts.len(), 2 * 2 + 4);

        let kinds: Vec<ArtifactKind> = artifacts.iter().map(Artifact::kind).collect();
        assert_eq!(
            kinds,
            vec![
                ArtifactKind::Content,
                ArtifactKind::Signature,
                ArtifactKind::Content,
                ArtifactKind::Signature,
                ArtifactKind::Keyring,
                ArtifactKind::Keyring,
                ArtifactKind::Keyring,
                ArtifactKind::Keyring,
            ]
        );

        let names: Vec<&str> = artifacts.iter().map(Artifact::file_name).collect();
        assert_eq!(
            names,
            vec![
                "ubports-abc.tar.xz",
                "ubports-abc.tar.xz.asc",
                "device-def.tar.xz",
                "device-def.tar.xz.asc",
                "image-signing.tar.xz",
                "image-signing.tar.xz.asc",
                "image-master.tar.xz",
                "image-master.tar.xz.asc",
            ]
        );
    }

    #[test]
    fn test_content_artifact() {
        let artifacts = planner().plan(&two_file_image());
        let content = &artifacts[0];

        assert_eq!(
            content.url(),
            "https://system-image.example.com/pool/ubports-abc.tar.xz"
        );
        assert_eq!(
            content.local_path(),
            Path::new("/tmp/sysimage/pool/ubports-abc.tar.xz")
        );
        let checksum = content.checksum().unwrap();
        assert_eq!(checksum.algorithm, ChecksumAlgorithm::Sha256);
        assert_eq!(checksum.sum, "aa11");

        // Signatures and unchecksummed content carry no checksum.
        assert!(artifacts[1].checksum().is_none());
        assert!(artifacts[2].checksum().is_none());
    }

    #[test]
    fn test_keyring_artifacts() {
        let artifacts = planner().plan(&two_file_image());
        let keyring = &artifacts[6];

        assert_eq!(
            keyring.url(),
            "https://system-image.example.com/gpg/image-master.tar.xz"
        );
        assert_eq!(
            keyring.local_path(),
            Path::new("/tmp/sysimage/gpg/image-master.tar.xz")
        );
    }

    #[test]
    fn test_empty_image_still_gets_keyrings() {
        let image = Image {
            version: 1,
            image_type: ImageType::Full,
            files: vec![],
        };
        let artifacts = planner().plan(&image);
        assert_eq!(artifacts.len(), 4);
        assert!(artifacts.iter().all(|a| a.kind() == ArtifactKind::Keyring));
    }

    #[test]
    fn test_plan_is_deterministic() {
        let image = two_file_image();
        assert_eq!(planner().plan(&image), planner().plan(&image));
    }
}
