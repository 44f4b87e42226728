//! Recovery install script generation.
//!
//! The script is consumed line by line by the device's recovery updater, so
//! every token must be a single whitespace-free word.

use sysimage_schema::FileDescriptor;
use thiserror::Error;

use crate::paths::basename;
use crate::planner::Artifact;

/// Keyring pairs loaded before any update, in load order.
const KEYRINGS: [(&str, &str); 2] = [
    ("image-master.tar.xz", "image-master.tar.xz.asc"),
    ("image-signing.tar.xz", "image-signing.tar.xz.asc"),
];

/// Input that cannot be expressed in the script grammar.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("'{0}' has no file name")]
    MissingBasename(String),

    #[error("'{0}' contains whitespace")]
    Whitespace(String),

    #[error("enable entry is empty")]
    EmptyEnable,
}

/// A file to install, paired with its detached signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallFile {
    pub path: String,
    /// Files without a signature are not installed.
    pub signature: Option<String>,
}

impl From<&FileDescriptor> for InstallFile {
    fn from(file: &FileDescriptor) -> Self {
        Self {
            path: file.path.clone(),
            signature: Some(file.signature.clone()),
        }
    }
}

impl From<&Artifact> for InstallFile {
    fn from(artifact: &Artifact) -> Self {
        Self {
            path: artifact.url().to_string(),
            signature: None,
        }
    }
}

/// Switches that shape the script.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallOptions {
    /// Append `installer_check` after unmounting.
    pub installer_check: bool,
    /// Format the data partition.
    pub wipe: bool,
    /// Names passed to `enable`, in order.
    pub enable: Vec<String>,
}

/// Ordered install command lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallScript {
    lines: Vec<String>,
}

impl InstallScript {
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// The script as written to the command file: one command per line,
    /// newline terminated.
    pub fn to_text(&self) -> String {
        let mut text = self.lines.join("\n");
        text.push('\n');
        text
    }
}

/// Render the install script for `files`.
///
/// # Errors
///
/// Returns [`CommandError`] if a path or signature has no file name, if a
/// file name or enable entry contains whitespace, or if an enable entry is
/// empty.
pub fn build_install_commands(
    files: &[InstallFile],
    options: &InstallOptions,
) -> Result<InstallScript, CommandError> {
    let mut lines = vec!["format system".to_string()];

    for (archive, signature) in KEYRINGS {
        lines.push(format!("load_keyring {archive} {signature}"));
    }
    lines.push("mount system".to_string());

    if options.wipe {
        lines.push("format data".to_string());
    }

    for file in files {
        let Some(signature) = &file.signature else {
            continue;
        };
        let name = word(&file.path)?;
        let sig = word(signature)?;
        lines.push(format!("update {name} {sig}"));
    }

    for name in &options.enable {
        if name.is_empty() {
            return Err(CommandError::EmptyEnable);
        }
        if name.chars().any(char::is_whitespace) {
            return Err(CommandError::Whitespace(name.clone()));
        }
        lines.push(format!("enable {name}"));
    }

    lines.push("unmount system".to_string());

    if options.installer_check {
        lines.push("installer_check".to_string());
    }

    Ok(InstallScript { lines })
}

/// The basename of `path`, checked to be a single word.
fn word(path: &str) -> Result<&str, CommandError> {
    let name = basename(path);
    if name.is_empty() {
        return Err(CommandError::MissingBasename(path.to_string()));
    }
    if name.chars().any(char::is_whitespace) {
        return Err(CommandError::Whitespace(path.to_string()));
    }
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signed(path: &str) -> InstallFile {
        InstallFile {
            path: path.to_string(),
            signature: Some(format!("{path}.asc")),
        }
    }

    const PREAMBLE: [&str; 4] = [
        "format system",
        "load_keyring image-master.tar.xz image-master.tar.xz.asc",
        "load_keyring image-signing.tar.xz image-signing.tar.xz.asc",
        "mount system",
    ];

    #[test]
    fn test_full_script() {
        let options = InstallOptions {
            installer_check: true,
            wipe: true,
            enable: vec!["foo".to_string()],
        };
        let script = build_install_commands(&[signed("/pool/a.tar.xz")], &options).unwrap();

        let mut expected: Vec<&str> = PREAMBLE.to_vec();
        expected.extend([
            "format data",
            "update a.tar.xz a.tar.xz.asc",
            "enable foo",
            "unmount system",
            "installer_check",
        ]);
        assert_eq!(script.lines(), expected.as_slice());
    }

    #[test]
    fn test_minimal_script() {
        let script = build_install_commands(&[], &InstallOptions::default()).unwrap();

        let mut expected: Vec<&str> = PREAMBLE.to_vec();
        expected.push("unmount system");
        assert_eq!(script.lines(), expected.as_slice());
        assert!(!script.lines().iter().any(|l| l == "format data"));
    }

    #[test]
    fn test_updates_keep_input_order_and_skip_unsigned() {
        let files = vec![
            signed("/pool/ubports.tar.xz"),
            InstallFile {
                path: "/pool/unsigned.tar.xz".to_string(),
                signature: None,
            },
            signed("/pool/device.tar.xz"),
            signed("/pool/keyring.tar.xz"),
        ];
        let script = build_install_commands(&files, &InstallOptions::default()).unwrap();

        let updates: Vec<&str> = script
            .lines()
            .iter()
            .filter(|l| l.starts_with("update "))
            .map(String::as_str)
            .collect();
        assert_eq!(
            updates,
            vec![
                "update ubports.tar.xz ubports.tar.xz.asc",
                "update device.tar.xz device.tar.xz.asc",
                "update keyring.tar.xz keyring.tar.xz.asc",
            ]
        );
    }

    #[test]
    fn test_multiple_enables() {
        let options = InstallOptions {
            enable: vec!["developer_mode".to_string(), "adb".to_string()],
            ..InstallOptions::default()
        };
        let script = build_install_commands(&[], &options).unwrap();
        let tail: Vec<&str> = script.lines()[4..].iter().map(String::as_str).collect();
        assert_eq!(tail, vec!["enable developer_mode", "enable adb", "unmount system"]);
    }

    #[test]
    fn test_invalid_input() {
        let trailing_slash = [InstallFile {
            path: "/pool/".to_string(),
            signature: Some("/pool/x.asc".to_string()),
        }];
        assert_eq!(
            build_install_commands(&trailing_slash, &InstallOptions::default()),
            Err(CommandError::MissingBasename("/pool/".to_string()))
        );

        let spaced = [signed("/pool/a b.tar.xz")];
        assert!(matches!(
            build_install_commands(&spaced, &InstallOptions::default()),
            Err(CommandError::Whitespace(_))
        ));

        let bad_enable = InstallOptions {
            enable: vec!["two words".to_string()],
            ..InstallOptions::default()
        };
        assert!(matches!(
            build_install_commands(&[], &bad_enable),
            Err(CommandError::Whitespace(_))
        ));

        let empty_enable = InstallOptions {
            enable: vec![String::new()],
            ..InstallOptions::default()
        };
        assert_eq!(
            build_install_commands(&[], &empty_enable),
            Err(CommandError::EmptyEnable)
        );
    }

    #[test]
    fn test_to_text() {
        let script = build_install_commands(&[], &InstallOptions::default()).unwrap();
        let text = script.to_text();
        assert!(text.starts_with("format system\n"));
        assert!(text.ends_with("unmount system\n"));
        assert_eq!(text.lines().count(), 5);
    }

    #[test]
    fn test_conversions() {
        let descriptor = FileDescriptor {
            path: "/pool/a.tar.xz".to_string(),
            signature: "/pool/a.tar.xz.asc".to_string(),
            checksum: None,
        };
        assert_eq!(InstallFile::from(&descriptor), signed("/pool/a.tar.xz"));
    }

    #[test]
    fn test_planned_artifacts_add_no_updates() {
        use crate::config::Host;
        use crate::planner::ArtifactPlanner;
        use sysimage_schema::{Image, ImageType};

        let host = Host::parse("https://system-image.example.com/", false).unwrap();
        let image = Image {
            version: 3,
            image_type: ImageType::Full,
            files: vec![FileDescriptor {
                path: "/pool/rootfs.tar.xz".to_string(),
                signature: "/pool/rootfs.tar.xz.asc".to_string(),
                checksum: None,
            }],
        };
        let artifacts = ArtifactPlanner::new(host, "/tmp/sysimage").plan(&image);

        let expanded: Vec<InstallFile> = artifacts.iter().map(InstallFile::from).collect();
        assert_eq!(expanded.len(), artifacts.len());
        assert!(expanded.iter().all(|file| file.signature.is_none()));
        assert_eq!(expanded[0].path, artifacts[0].url());

        let script = build_install_commands(&expanded, &InstallOptions::default()).unwrap();
        assert!(!script.lines().iter().any(|line| line.starts_with("update ")));

        // Mixed with the descriptors, only the signed entries are installed.
        let mut files: Vec<InstallFile> = image.files.iter().map(InstallFile::from).collect();
        files.extend(expanded);
        let script = build_install_commands(&files, &InstallOptions::default()).unwrap();
        let updates: Vec<&String> = script
            .lines()
            .iter()
            .filter(|line| line.starts_with("update "))
            .collect();
        assert_eq!(updates, vec!["update rootfs.tar.xz rootfs.tar.xz.asc"]);
    }
}
