//! All-or-nothing creation of directory scaffolds.

use std::io::ErrorKind;
use std::os::unix::fs::DirBuilderExt;
use std::path::{Path, PathBuf};

use contain_common::error::{ContainError, Result};

/// `rwxr-x---`: owner full access, group read and traverse.
pub const SCAFFOLD_MODE: u32 = 0o750;

/// Creates `dirs` in order with `mode`, returning the ones actually created.
///
/// A directory that already exists counts as success but is not reported
/// as created. On any other failure, every directory created by this call
/// is removed in reverse order before the error is returned; removal
/// failures are attached to the error and logged.
///
/// # Errors
///
/// Returns the first creation failure, wrapped with cleanup failures if any.
pub fn create_dirs(dirs: &[&Path], mode: u32) -> Result<Vec<PathBuf>> {
    let mut builder = std::fs::DirBuilder::new();
    let _ = builder.mode(mode);

    let mut created = Vec::with_capacity(dirs.len());
    for dir in dirs {
        match builder.create(dir) {
            Ok(()) => {
                tracing::debug!(path = %dir.display(), "directory created");
                created.push(dir.to_path_buf());
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists && dir.is_dir() => {
                tracing::debug!(path = %dir.display(), "directory already exists");
            }
            Err(e) => {
                let primary = ContainError::Io {
                    path: dir.to_path_buf(),
                    source: e,
                };
                let cleanup = remove_created(&created);
                return Err(ContainError::with_cleanup(primary, cleanup));
            }
        }
    }
    Ok(created)
}

/// Removes `created` in reverse order, collecting every failure.
///
/// Each failure is also logged as a warning.
pub fn remove_created(created: &[PathBuf]) -> Vec<ContainError> {
    let mut failures = Vec::new();
    for dir in created.iter().rev() {
        if let Err(e) = std::fs::remove_dir(dir) {
            tracing::warn!(path = %dir.display(), error = %e, "failed removing directory");
            failures.push(ContainError::Io {
                path: dir.clone(),
                source: e,
            });
        }
    }
    failures
}
