//! Container filesystem construction and teardown.
//!
//! A [`ContainerFs`] is configured from a hostname and an image, built on
//! the host before the container process switches its root, populated with
//! pseudo-filesystems from inside the container's mount namespace, and
//! finally detached and removed once the container exits.

pub mod layout;
pub mod mount;
pub mod overlayfs;
pub mod scaffold;

use std::path::Path;

use contain_common::error::{ContainError, Result};
use contain_common::types::MountStrategy;

pub use layout::ContainerFs;

impl ContainerFs {
    /// Creates the scaffold directories and mounts the image onto the root.
    ///
    /// Directories are created top-down (base, root, work area, upper layer)
    /// and pre-existing ones are reused, so a partially completed setup can
    /// be retried. If a directory or the mount fails, the directories made
    /// by this call are removed before the error is returned.
    ///
    /// # Errors
    ///
    /// Returns the directory or mount failure, wrapped with any cleanup
    /// failures.
    pub fn build(&self, image: &Path) -> Result<()> {
        let created = scaffold::create_dirs(&self.dirs_top_down(), scaffold::SCAFFOLD_MODE)?;

        if let Err(e) = self.mount(image) {
            let cleanup = scaffold::remove_created(&created);
            return Err(ContainError::with_cleanup(e, cleanup));
        }
        tracing::info!(
            base = %self.base().display(),
            strategy = %self.strategy(),
            "container filesystem built"
        );
        Ok(())
    }

    /// Exposes `image` at the root, as an overlay or as a bind mount.
    ///
    /// # Errors
    ///
    /// Returns an error if the overlay options do not fit or the mount fails.
    pub fn mount(&self, image: &Path) -> Result<()> {
        match self.strategy() {
            MountStrategy::Bind => mount::bind_mount(image, self.root()),
            MountStrategy::Overlay => {
                let config = overlayfs::OverlayConfig {
                    lower_dir: image,
                    upper_dir: self.diff(),
                    work_dir: self.workdir(),
                    merged_dir: self.root(),
                };
                overlayfs::mount_overlay(&config, self.options_max)
            }
        }
    }

    /// Lazily detaches the root mount.
    ///
    /// Succeeds without doing anything when the root directory does not
    /// exist, so teardown is safe after a build that failed or never ran.
    ///
    /// # Errors
    ///
    /// Returns an error if the unmount syscall fails.
    pub fn demake(&self) -> Result<()> {
        if !self.root().exists() {
            tracing::debug!(root = %self.root().display(), "no container root, nothing to detach");
            return Ok(());
        }
        overlayfs::detach(self.root())
    }

    /// Removes the upper layer, work area, root and base directories.
    ///
    /// The `work/` and `index/` directories an overlay mount leaves inside
    /// the work area go with it. Stops at the first failure; the caller
    /// decides whether to go on.
    ///
    /// # Errors
    ///
    /// Returns the first directory that could not be removed.
    pub fn rmdirs(&self) -> Result<()> {
        std::fs::remove_dir(self.diff()).map_err(|e| ContainError::Io {
            path: self.diff().to_path_buf(),
            source: e,
        })?;
        overlayfs::clear_workdir(self.workdir())?;
        for dir in [self.workdir(), self.root(), self.base()] {
            std::fs::remove_dir(dir).map_err(|e| ContainError::Io {
                path: dir.to_path_buf(),
                source: e,
            })?;
        }
        tracing::info!(base = %self.base().display(), "container filesystem removed");
        Ok(())
    }

    /// Mounts `/proc`, `/sys` and `/tmp` under the root.
    ///
    /// Must be called by the container process after it has entered its
    /// private mount namespace, never from the host.
    ///
    /// # Errors
    ///
    /// Returns an error if one of the mounts fails.
    pub fn mount_pseudo_filesystems(&self) -> Result<()> {
        mount::mount_pseudo_filesystems(self.root())
    }
}
