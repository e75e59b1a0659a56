//! Bind mounts and pseudo-filesystems for the container root.

use std::path::{Path, PathBuf};

use contain_common::error::{ContainError, Result};

/// Pseudo-filesystems mounted under the container root, as
/// `(subdirectory, source, filesystem type)`.
pub const PSEUDO_FILESYSTEMS: [(&str, &str, &str); 3] = [
    ("proc", "proc", "proc"),
    ("sys", "sysfs", "sysfs"),
    ("tmp", "tmpfs", "tmpfs"),
];

/// Creates a read-write bind mount from `source` to `target`.
///
/// # Errors
///
/// Returns an error if the `mount(2)` syscall fails.
#[cfg(target_os = "linux")]
pub fn bind_mount(source: &Path, target: &Path) -> Result<()> {
    use nix::mount::{MsFlags, mount};

    mount(
        Some(source),
        target,
        None::<&str>,
        MsFlags::MS_BIND,
        None::<&str>,
    )
    .map_err(|e| ContainError::Syscall {
        call: "mount(MS_BIND)",
        target: target.to_path_buf(),
        source: e.into(),
    })?;
    tracing::info!(
        source = %source.display(),
        target = %target.display(),
        "bind mount created"
    );
    Ok(())
}

/// Stub for non-Linux platforms.
///
/// # Errors
///
/// Always returns an error: bind mounts require Linux.
#[cfg(not(target_os = "linux"))]
pub fn bind_mount(_source: &Path, _target: &Path) -> Result<()> {
    Err(ContainError::Config {
        message: "Linux required for native container operations".into(),
    })
}

/// Mounts `/proc`, `/sys` and `/tmp` under `rootfs`.
///
/// The mount points must already exist in the image. If one mount fails,
/// the ones made by this call are lazily detached again.
///
/// # Errors
///
/// Returns the failing mount's error, wrapped with any detach failures.
#[cfg(target_os = "linux")]
pub fn mount_pseudo_filesystems(rootfs: &Path) -> Result<()> {
    use nix::mount::{MsFlags, mount};

    let mut mounted: Vec<PathBuf> = Vec::with_capacity(PSEUDO_FILESYSTEMS.len());
    for (dir, source, fstype) in PSEUDO_FILESYSTEMS {
        let target = rootfs.join(dir);
        super::layout::check_path_len(&target)?;
        let res = mount(
            Some(source),
            &target,
            Some(fstype),
            MsFlags::empty(),
            None::<&str>,
        );
        if let Err(e) = res {
            let primary = ContainError::Syscall {
                call: "mount",
                target,
                source: e.into(),
            };
            let cleanup = mounted
                .iter()
                .rev()
                .filter_map(|m| super::overlayfs::detach(m).err())
                .inspect(|e| tracing::warn!(error = %e, "failed detaching pseudo-filesystem"))
                .collect();
            return Err(ContainError::with_cleanup(primary, cleanup));
        }
        tracing::debug!(target = %target.display(), fstype, "pseudo-filesystem mounted");
        mounted.push(target);
    }
    Ok(())
}

/// Stub for non-Linux platforms.
///
/// # Errors
///
/// Always returns an error: pseudo-filesystems require Linux.
#[cfg(not(target_os = "linux"))]
pub fn mount_pseudo_filesystems(_rootfs: &Path) -> Result<()> {
    Err(ContainError::Config {
        message: "Linux required for native container operations".into(),
    })
}
