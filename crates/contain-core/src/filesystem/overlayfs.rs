//! `OverlayFS` mounts for layered container filesystems.
//!
//! The image directory is the single read-only lower layer; writes of the
//! container land in its private upper layer.

use std::path::Path;

use contain_common::error::{ContainError, Result};

/// Configuration for an `OverlayFS` mount.
#[derive(Debug, Clone, Copy)]
pub struct OverlayConfig<'a> {
    /// Read-only lower layer (the image).
    pub lower_dir: &'a Path,
    /// Writable upper layer directory.
    pub upper_dir: &'a Path,
    /// Work directory required by `OverlayFS`.
    pub work_dir: &'a Path,
    /// Final merged mount point.
    pub merged_dir: &'a Path,
}

impl OverlayConfig<'_> {
    /// Composes `lowerdir=<lower>,upperdir=<upper>,workdir=<work>`.
    ///
    /// `max` bounds the options including a terminating NUL byte, so the
    /// composed string must be strictly shorter than `max`.
    ///
    /// # Errors
    ///
    /// Returns an error if a path is not UTF-8, contains a `,` that would
    /// split the option list, or if the options do not fit in `max`.
    pub fn options(&self, max: usize) -> Result<String> {
        let opts = format!(
            "lowerdir={},upperdir={},workdir={}",
            option_value(self.lower_dir)?,
            option_value(self.upper_dir)?,
            option_value(self.work_dir)?,
        );
        if opts.len() >= max {
            return Err(ContainError::Config {
                message: format!(
                    "overlay options of {} bytes do not fit in {max} bytes",
                    opts.len()
                ),
            });
        }
        Ok(opts)
    }
}

fn option_value(path: &Path) -> Result<&str> {
    let value = path.to_str().ok_or_else(|| ContainError::Config {
        message: format!("overlay layer path is not UTF-8: {}", path.display()),
    })?;
    if value.contains(',') {
        return Err(ContainError::Config {
            message: format!("overlay layer path contains a comma: {value}"),
        });
    }
    Ok(value)
}

/// Directories the overlay driver creates inside its work directory.
pub const WORKDIR_ENTRIES: [&str; 2] = ["work", "index"];

/// Removes what the overlay driver left in `work_dir`, keeping `work_dir`.
///
/// Entries that are absent are skipped.
///
/// # Errors
///
/// Returns the first entry that exists but could not be removed.
pub fn clear_workdir(work_dir: &Path) -> Result<()> {
    for name in WORKDIR_ENTRIES {
        let entry = work_dir.join(name);
        match std::fs::remove_dir_all(&entry) {
            Ok(()) => tracing::debug!(path = %entry.display(), "overlay work entry removed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(ContainError::Io {
                    path: entry,
                    source: e,
                });
            }
        }
    }
    Ok(())
}

/// Mounts an `OverlayFS` with the given configuration.
///
/// The options string is composed and checked before any system call.
///
/// # Errors
///
/// Returns an error if the options are invalid or the mount syscall fails.
#[cfg(target_os = "linux")]
pub fn mount_overlay(config: &OverlayConfig<'_>, options_max: usize) -> Result<()> {
    use nix::mount::{MsFlags, mount};

    let opts = config.options(options_max)?;
    mount(
        Some("overlay"),
        config.merged_dir,
        Some("overlay"),
        MsFlags::empty(),
        Some(opts.as_str()),
    )
    .map_err(|e| ContainError::Syscall {
        call: "mount(overlay)",
        target: config.merged_dir.to_path_buf(),
        source: e.into(),
    })?;

    tracing::info!(merged = %config.merged_dir.display(), "overlayfs mounted");
    Ok(())
}

/// Stub for non-Linux platforms.
///
/// # Errors
///
/// Always returns an error: `OverlayFS` mounting requires Linux.
#[cfg(not(target_os = "linux"))]
pub fn mount_overlay(config: &OverlayConfig<'_>, options_max: usize) -> Result<()> {
    let _ = config.options(options_max)?;
    Err(ContainError::Config {
        message: "Linux required for native container operations".into(),
    })
}

/// Lazily detaches the mount at `target`.
///
/// Uses `MNT_DETACH`: the mount point disappears from the namespace at once
/// while the filesystem stays alive until its last user goes away, so a
/// container process still exiting does not make the call block or fail.
///
/// # Errors
///
/// Returns an error if the unmount syscall fails.
#[cfg(target_os = "linux")]
pub fn detach(target: &Path) -> Result<()> {
    nix::mount::umount2(target, nix::mount::MntFlags::MNT_DETACH).map_err(|e| {
        ContainError::Syscall {
            call: "umount2(MNT_DETACH)",
            target: target.to_path_buf(),
            source: e.into(),
        }
    })?;
    tracing::info!(path = %target.display(), "filesystem detached");
    Ok(())
}

/// Stub for non-Linux platforms.
///
/// # Errors
///
/// Always returns an error: unmounting requires Linux.
#[cfg(not(target_os = "linux"))]
pub fn detach(_target: &Path) -> Result<()> {
    Err(ContainError::Config {
        message: "Linux required for native container operations".into(),
    })
}
