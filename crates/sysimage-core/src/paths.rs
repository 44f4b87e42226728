use std::path::{Path, PathBuf};

/// Subdirectory of the root holding image files and their signatures.
pub const POOL_DIR: &str = "pool";

/// Subdirectory of the root holding the keyring archives.
pub const GPG_DIR: &str = "gpg";

/// Subdirectory of the root holding the generated command file.
pub const COMMAND_DIR: &str = "commandfile";

/// Returns the download root, or None if the user's cache directory cannot be resolved.
pub fn try_sysimage_home() -> Option<PathBuf> {
    if let Ok(val) = std::env::var("SYSIMAGE_HOME") {
        return Some(PathBuf::from(val));
    }
    dirs::cache_dir().map(|c| c.join("sysimage"))
}

/// Returns the download root (`$SYSIMAGE_HOME` or `<cache dir>/sysimage`),
/// falling back to `./sysimage` when no cache directory exists.
pub fn sysimage_home() -> PathBuf {
    try_sysimage_home().unwrap_or_else(|| PathBuf::from("sysimage"))
}

/// Pool path: <root>/pool
pub fn pool_path(root: &Path) -> PathBuf {
    root.join(POOL_DIR)
}

/// Keyring path: <root>/gpg
pub fn gpg_path(root: &Path) -> PathBuf {
    root.join(GPG_DIR)
}

/// Command file directory: <root>/commandfile
pub fn command_dir(root: &Path) -> PathBuf {
    root.join(COMMAND_DIR)
}

/// Extract the last path segment of a URL or server-relative path.
///
/// Returns an empty string for paths ending in `/`.
pub fn basename(path: &str) -> &str {
    path.split('/').next_back().unwrap_or("")
}

/// Append a server-relative path to a host that ends in `/`.
///
/// A single leading `/` on `rel` is dropped so the result never contains `//`
/// at the seam.
pub fn join_url(host: &str, rel: &str) -> String {
    let rel = rel.strip_prefix('/').unwrap_or(rel);
    format!("{host}{rel}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basename() {
        assert_eq!(basename("/pool/ubports-abc.tar.xz"), "ubports-abc.tar.xz");
        assert_eq!(basename("keyring.tar.xz"), "keyring.tar.xz");
        assert_eq!(basename("/pool/"), "");
        assert_eq!(basename(""), "");
    }

    #[test]
    fn test_join_url() {
        let host = "https://system-image.example.com/";
        assert_eq!(
            join_url(host, "/pool/a.tar.xz"),
            "https://system-image.example.com/pool/a.tar.xz"
        );
        assert_eq!(
            join_url(host, "gpg/image-master.tar.xz"),
            "https://system-image.example.com/gpg/image-master.tar.xz"
        );
    }

    #[test]
    fn test_layout() {
        let root = Path::new("/tmp/sysimage");
        assert_eq!(pool_path(root), PathBuf::from("/tmp/sysimage/pool"));
        assert_eq!(gpg_path(root), PathBuf::from("/tmp/sysimage/gpg"));
        assert_eq!(command_dir(root), PathBuf::from("/tmp/sysimage/commandfile"));
    }
}
