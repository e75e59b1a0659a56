//! Cgroups v2 resource management.
//!
//! Each container gets one node, `<root>/<hostname>`, holding its memory
//! and CPU limits. The node is kept open for as long as it exists so that a
//! live reference pins it until the container has exited.

pub mod cpu;
pub mod memory;

use std::fs::File;
use std::io::{ErrorKind, Write};
use std::os::unix::fs::{DirBuilderExt, OpenOptionsExt};
use std::path::{Path, PathBuf};

use contain_common::config::CgroupConfig;
use contain_common::error::{ContainError, Result};
use contain_common::types::LimitKind;

/// `rwxr-xr-x`, the usual mode of cgroup directories.
const CGROUP_DIR_MODE: u32 = 0o755;

/// A per-container cgroup node and its lifetime handle.
#[derive(Debug)]
pub struct ResourceGroup {
    path: PathBuf,
    handle: Option<File>,
}

impl ResourceGroup {
    /// Derives the node path `<root>/<hostname>` without touching the system.
    ///
    /// # Errors
    ///
    /// Returns an error if `hostname` is not a single path component.
    pub fn configure(hostname: &str, config: &CgroupConfig) -> Result<Self> {
        if hostname.is_empty() || hostname == "." || hostname == ".." || hostname.contains('/') {
            return Err(ContainError::Config {
                message: format!("invalid hostname for a cgroup name: {hostname:?}"),
            });
        }
        Ok(Self {
            path: config.root.join(hostname),
            handle: None,
        })
    }

    /// Path of the cgroup directory, e.g. to write `cgroup.procs`.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the lifetime handle is currently open.
    pub const fn is_live(&self) -> bool {
        self.handle.is_some()
    }

    /// Creates the node, opens its handle, then applies both limits.
    ///
    /// An existing node is reused. If opening the handle fails, a node made
    /// by this call is removed again. A failing limit leaves the group
    /// allocated: the caller rolls back with [`ResourceGroup::demake`].
    ///
    /// # Errors
    ///
    /// Returns an error if the node cannot be created or opened, or a
    /// [`ContainError::Limit`] naming the limit that could not be applied.
    pub fn build(&mut self, memory_mb: u64, cpu_percent: f64) -> Result<()> {
        self.create()?;
        self.limit_memory(memory_mb)
            .map_err(|e| limit_error(LimitKind::Memory, e))?;
        self.limit_cpu(cpu_percent)
            .map_err(|e| limit_error(LimitKind::Cpu, e))?;
        tracing::info!(
            path = %self.path.display(),
            memory_mb,
            cpu_percent,
            "cgroup created"
        );
        Ok(())
    }

    fn create(&mut self) -> Result<()> {
        let created = match std::fs::DirBuilder::new()
            .mode(CGROUP_DIR_MODE)
            .create(&self.path)
        {
            Ok(()) => true,
            Err(e) if e.kind() == ErrorKind::AlreadyExists && self.path.is_dir() => false,
            Err(e) => {
                return Err(ContainError::Io {
                    path: self.path.clone(),
                    source: e,
                });
            }
        };

        if self.handle.is_none() {
            match open_dir(&self.path) {
                Ok(handle) => self.handle = Some(handle),
                Err(primary) => {
                    let mut cleanup = Vec::new();
                    if created {
                        if let Err(e) = std::fs::remove_dir(&self.path) {
                            tracing::warn!(path = %self.path.display(), error = %e, "failed removing cgroup");
                            cleanup.push(ContainError::Io {
                                path: self.path.clone(),
                                source: e,
                            });
                        }
                    }
                    return Err(ContainError::with_cleanup(primary, cleanup));
                }
            }
        }
        Ok(())
    }

    /// Sets `memory.high` to `memory_mb` megabytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the size overflows or the control file write fails.
    pub fn limit_memory(&self, memory_mb: u64) -> Result<()> {
        memory::set_memory_high(&self.path, memory::megabytes_to_bytes(memory_mb)?)
    }

    /// Caps the group at `cpu_percent` of the current scheduling period.
    ///
    /// # Errors
    ///
    /// Returns an error if `cpu.max` cannot be read or written.
    pub fn limit_cpu(&self, cpu_percent: f64) -> Result<()> {
        let _ = cpu::set_cpu_percent(&self.path, cpu_percent)?;
        Ok(())
    }

    /// Closes the handle, then removes the node.
    ///
    /// The handle is gone even if the removal fails. A node that no longer
    /// exists is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the cgroup directory cannot be removed.
    pub fn demake(&mut self) -> Result<()> {
        drop(self.handle.take());
        match std::fs::remove_dir(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "cgroup already gone");
                return Ok(());
            }
            Err(e) => {
                return Err(ContainError::Io {
                    path: self.path.clone(),
                    source: e,
                });
            }
        }
        tracing::info!(path = %self.path.display(), "cgroup destroyed");
        Ok(())
    }
}

/// Writes `value` to the existing control file at `path`.
///
/// The file is never created: the kernel provides every control file of a
/// node, so a missing one means the controller is not available there.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or written.
pub fn write_control(path: &Path, value: &str) -> Result<()> {
    let io_error = |e| ContainError::Io {
        path: path.to_path_buf(),
        source: e,
    };
    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .truncate(true)
        .open(path)
        .map_err(io_error)?;
    file.write_all(value.as_bytes()).map_err(io_error)
}

fn open_dir(path: &Path) -> Result<File> {
    std::fs::OpenOptions::new()
        .read(true)
        .custom_flags(libc::O_DIRECTORY | libc::O_CLOEXEC)
        .open(path)
        .map_err(|e| ContainError::Io {
            path: path.to_path_buf(),
            source: e,
        })
}

fn limit_error(kind: LimitKind, source: ContainError) -> ContainError {
    tracing::debug!(%kind, error = %source, "limit not applied");
    ContainError::Limit {
        kind,
        source: Box::new(source),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group_in(root: &Path) -> ResourceGroup {
        let config = CgroupConfig {
            root: root.to_path_buf(),
        };
        ResourceGroup::configure("c1", &config).unwrap()
    }

    fn make_node(group: &ResourceGroup, control_files: &[(&str, &str)]) {
        std::fs::create_dir(group.path()).expect("mkdir");
        for (name, content) in control_files {
            std::fs::write(group.path().join(name), content).expect("write");
        }
    }

    fn clear_control_files(group: &ResourceGroup) {
        for name in ["memory.high", "cpu.max"] {
            let _ = std::fs::remove_file(group.path().join(name));
        }
    }

    #[test]
    fn configure_joins_root_and_hostname() {
        let group = group_in(Path::new("/sys/fs/cgroup/contain"));
        assert_eq!(group.path(), Path::new("/sys/fs/cgroup/contain/c1"));
        assert!(!group.is_live());
    }

    #[test]
    fn configure_rejects_path_like_hostnames() {
        let config = CgroupConfig::default();
        assert!(ResourceGroup::configure("../evil", &config).is_err());
        assert!(ResourceGroup::configure("", &config).is_err());
    }

    #[test]
    fn build_applies_both_limits() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let mut group = group_in(tmp.path());
        make_node(&group, &[("memory.high", "max\n"), ("cpu.max", "max 100000\n")]);

        group.build(100, 50.0).unwrap();
        assert!(group.is_live());
        let memory = std::fs::read_to_string(group.path().join("memory.high")).expect("read");
        assert_eq!(memory, "104857600");
        let cpu = std::fs::read_to_string(group.path().join("cpu.max")).expect("read");
        assert_eq!(cpu, "50000 100000");
    }

    #[test]
    fn failed_limit_leaves_group_allocated() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let mut group = group_in(tmp.path());
        make_node(&group, &[("memory.high", "max\n")]);

        // No cpu.max: the CPU limit cannot be read.
        let err = group.build(64, 10.0).unwrap_err();
        assert!(matches!(
            err,
            ContainError::Limit {
                kind: LimitKind::Cpu,
                ..
            }
        ));
        assert!(group.is_live());
        assert!(group.path().is_dir());

        clear_control_files(&group);
        group.demake().unwrap();
        assert!(!group.path().exists());
    }

    #[test]
    fn memory_limit_failure_is_reported_as_memory() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let mut group = group_in(tmp.path());
        make_node(&group, &[("cpu.max", "max 100000\n")]);

        let err = group.build(64, 10.0).unwrap_err();
        assert!(matches!(
            err,
            ContainError::Limit {
                kind: LimitKind::Memory,
                ..
            }
        ));
        // Control files are written in place, never created.
        assert!(!group.path().join("memory.high").exists());
        let cpu = std::fs::read_to_string(group.path().join("cpu.max")).expect("read");
        assert_eq!(cpu, "max 100000\n");
    }

    #[test]
    fn write_control_truncates_existing_content() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let file = tmp.path().join("cpu.max");
        std::fs::write(&file, "max 100000\n").expect("write");

        write_control(&file, "5 10").unwrap();
        assert_eq!(std::fs::read_to_string(&file).expect("read"), "5 10");
    }

    #[test]
    fn build_fails_without_root() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let mut group = group_in(&tmp.path().join("absent"));
        assert!(matches!(group.build(1, 1.0), Err(ContainError::Io { .. })));
        assert!(!group.is_live());
    }

    #[test]
    fn demake_closes_handle_even_when_removal_fails() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let mut group = group_in(tmp.path());
        make_node(&group, &[("memory.high", "max\n"), ("cpu.max", "max 100000\n")]);
        group.build(1, 1.0).unwrap();

        // Regular files keep a plain directory from being removed.
        assert!(group.demake().is_err());
        assert!(!group.is_live());

        clear_control_files(&group);
        group.demake().unwrap();
        assert!(!group.path().exists());
    }

    #[test]
    fn demake_of_missing_group_succeeds() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let mut group = group_in(tmp.path());
        group.demake().unwrap();
    }
}
