//! Deterministic on-disk layout of a container filesystem.
//!
//! A container built from image `/images/alpine` with hostname `c1` lives
//! in `<storage>/alpine-c1/`, holding `run/` (mount target), `.diff/`
//! (overlay upper layer) and `.workdir/` (overlay work area).

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use contain_common::config::FilesystemConfig;
use contain_common::constants::{DIFF_DIR_NAME, PATH_MAX, ROOT_DIR_NAME, WORK_DIR_NAME};
use contain_common::error::{ContainError, Result};
use contain_common::types::MountStrategy;

/// Storage artifacts of one container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerFs {
    base: PathBuf,
    root: PathBuf,
    diff: PathBuf,
    workdir: PathBuf,
    pub(crate) strategy: MountStrategy,
    pub(crate) options_max: usize,
}

impl ContainerFs {
    /// Derives the container's paths from its hostname and image.
    ///
    /// Only the last component of `image` is used, so callers may pass
    /// either an image name or a path to the image directory. No I/O is
    /// performed.
    ///
    /// # Errors
    ///
    /// Returns an error if `image` has no final component, if `hostname`
    /// is empty or not a single path component, or if a derived path does
    /// not fit in `PATH_MAX`.
    pub fn configure(hostname: &str, image: &Path, config: &FilesystemConfig) -> Result<Self> {
        validate_hostname(hostname)?;
        let image_name = image.file_name().ok_or_else(|| ContainError::Config {
            message: format!("image path {} has no final component", image.display()),
        })?;

        let mut name = OsString::from(image_name);
        name.push("-");
        name.push(hostname);

        let base = config.storage_dir.join(name);
        let fs = Self {
            root: base.join(ROOT_DIR_NAME),
            diff: base.join(DIFF_DIR_NAME),
            workdir: base.join(WORK_DIR_NAME),
            base,
            strategy: config.strategy,
            options_max: config.mount_options_max,
        };
        for path in fs.dirs_top_down() {
            check_path_len(path)?;
        }
        Ok(fs)
    }

    /// Directory holding the whole scaffold.
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Mount target exposed as the container's root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Overlay upper layer receiving the container's writes.
    pub fn diff(&self) -> &Path {
        &self.diff
    }

    /// Overlay work area.
    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// How the image is exposed at [`ContainerFs::root`].
    pub const fn strategy(&self) -> MountStrategy {
        self.strategy
    }

    /// Scaffold directories in creation order.
    pub(crate) fn dirs_top_down(&self) -> [&Path; 4] {
        [&self.base, &self.root, &self.workdir, &self.diff]
    }
}

fn validate_hostname(hostname: &str) -> Result<()> {
    if hostname.is_empty() || hostname == "." || hostname == ".." || hostname.contains('/') {
        return Err(ContainError::Config {
            message: format!("invalid hostname for a filesystem name: {hostname:?}"),
        });
    }
    Ok(())
}

/// Rejects a path that would not fit, with its NUL byte, in `PATH_MAX`.
pub(crate) fn check_path_len(path: &Path) -> Result<()> {
    let len = path.as_os_str().len();
    if len >= PATH_MAX {
        return Err(ContainError::Config {
            message: format!("path of {len} bytes exceeds PATH_MAX: {}", path.display()),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_in(dir: &str) -> FilesystemConfig {
        FilesystemConfig {
            storage_dir: PathBuf::from(dir),
            ..FilesystemConfig::default()
        }
    }

    #[test]
    fn configure_uses_image_basename() {
        let fs = ContainerFs::configure("c1", Path::new("/images/alpine"), &config_in("/var/c"))
            .unwrap();
        assert_eq!(fs.base(), Path::new("/var/c/alpine-c1"));
        assert_eq!(fs.root(), Path::new("/var/c/alpine-c1/run"));
        assert_eq!(fs.diff(), Path::new("/var/c/alpine-c1/.diff"));
        assert_eq!(fs.workdir(), Path::new("/var/c/alpine-c1/.workdir"));
    }

    #[test]
    fn configure_accepts_bare_image_name_and_trailing_slash() {
        let config = config_in("/s");
        let bare = ContainerFs::configure("h", Path::new("alpine"), &config).unwrap();
        let slashed = ContainerFs::configure("h", Path::new("/img/alpine/"), &config).unwrap();
        assert_eq!(bare, slashed);
    }

    #[test]
    fn configure_is_deterministic_and_prefix_consistent() {
        let config = config_in("/s");
        let a = ContainerFs::configure("web", Path::new("/images/debian"), &config).unwrap();
        let b = ContainerFs::configure("web", Path::new("/images/debian"), &config).unwrap();
        assert_eq!(a, b);
        for dir in a.dirs_top_down() {
            assert!(dir.starts_with(a.base()));
        }
    }

    #[test]
    fn configure_rejects_image_without_name() {
        assert!(ContainerFs::configure("c1", Path::new("/"), &config_in(".")).is_err());
        assert!(ContainerFs::configure("c1", Path::new("/images/.."), &config_in(".")).is_err());
    }

    #[test]
    fn configure_rejects_bad_hostnames() {
        let config = config_in(".");
        for hostname in ["", ".", "..", "a/b"] {
            assert!(
                ContainerFs::configure(hostname, Path::new("alpine"), &config).is_err(),
                "hostname {hostname:?} accepted"
            );
        }
    }

    #[test]
    fn configure_rejects_paths_longer_than_path_max() {
        let storage = format!("/{}", "d".repeat(PATH_MAX));
        let err = ContainerFs::configure("c1", Path::new("alpine"), &config_in(&storage))
            .unwrap_err();
        assert!(matches!(err, ContainError::Config { .. }));
    }
}
