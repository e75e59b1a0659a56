//! User namespace identity mapping.
//!
//! Maps root inside the container to the invoking user on the host, which
//! is what makes an unprivileged container's root harmless outside it.

use std::io::Write;
use std::path::{Path, PathBuf};

use contain_common::config::IdentityConfig;
use contain_common::error::{ContainError, Result};

/// Directive written to `setgroups` to forbid `setgroups(2)`.
pub const SETGROUPS_DENY: &str = "deny";

/// Writes the identity files of container processes.
#[derive(Debug, Clone)]
pub struct IdentityMapper {
    proc_root: PathBuf,
}

impl IdentityMapper {
    /// Creates a mapper writing under the configured per-process root.
    #[must_use]
    pub fn new(config: &IdentityConfig) -> Self {
        Self {
            proc_root: config.proc_root.clone(),
        }
    }

    /// Maps container root to the real uid and gid of the calling process.
    ///
    /// # Errors
    ///
    /// See [`IdentityMapper::map_root_user_to`].
    pub fn map_root_user(&self, pid: u32) -> Result<()> {
        let uid = nix::unistd::getuid().as_raw();
        let gid = nix::unistd::getgid().as_raw();
        self.map_root_user_to(pid, uid, gid)
    }

    /// Denies `setgroups`, then maps container uid 0 to `host_uid` and
    /// container gid 0 to `host_gid`, one id each.
    ///
    /// `setgroups` must be denied before an unprivileged process may write
    /// `gid_map`. The kernel accepts a single write per map file, so earlier
    /// writes are not undone when a later one fails.
    ///
    /// # Errors
    ///
    /// Returns an error if any of `/proc/<pid>/setgroups`, `uid_map` or
    /// `gid_map` cannot be opened or written.
    pub fn map_root_user_to(&self, pid: u32, host_uid: u32, host_gid: u32) -> Result<()> {
        let proc_dir = self.proc_root.join(pid.to_string());

        write_once(&proc_dir.join("setgroups"), SETGROUPS_DENY)?;
        write_once(&proc_dir.join("uid_map"), &id_map_line(0, host_uid, 1))?;
        write_once(&proc_dir.join("gid_map"), &id_map_line(0, host_gid, 1))?;

        tracing::debug!(pid, host_uid, host_gid, "mapped container root user");
        Ok(())
    }
}

/// One `<container-id> <host-id> <count>` mapping entry.
pub fn id_map_line(container_id: u32, host_id: u32, count: u32) -> String {
    format!("{container_id} {host_id} {count}")
}

/// Opens an existing control file, writes `content` in a single call and
/// closes it.
fn write_once(path: &Path, content: &str) -> Result<()> {
    let io_err = |e| ContainError::Io {
        path: path.to_path_buf(),
        source: e,
    };
    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .open(path)
        .map_err(io_err)?;
    file.write_all(content.as_bytes()).map_err(io_err)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PID: u32 = 4242;

    fn fake_proc(files: &[&str]) -> (tempfile::TempDir, IdentityMapper) {
        let tmp = tempfile::tempdir().expect("tempdir");
        let proc_dir = tmp.path().join(PID.to_string());
        std::fs::create_dir(&proc_dir).expect("mkdir");
        for name in files {
            std::fs::write(proc_dir.join(name), b"").expect("touch");
        }
        let mapper = IdentityMapper::new(&IdentityConfig {
            proc_root: tmp.path().to_path_buf(),
        });
        (tmp, mapper)
    }

    fn read(tmp: &tempfile::TempDir, name: &str) -> String {
        std::fs::read_to_string(tmp.path().join(PID.to_string()).join(name)).expect("read")
    }

    #[test]
    fn maps_root_to_host_ids() {
        let (tmp, mapper) = fake_proc(&["setgroups", "uid_map", "gid_map"]);
        mapper.map_root_user_to(PID, 1000, 1000).unwrap();

        assert_eq!(read(&tmp, "setgroups"), "deny");
        assert_eq!(read(&tmp, "uid_map"), "0 1000 1");
        assert_eq!(read(&tmp, "gid_map"), "0 1000 1");
    }

    #[test]
    fn uid_and_gid_are_mapped_independently() {
        let (tmp, mapper) = fake_proc(&["setgroups", "uid_map", "gid_map"]);
        mapper.map_root_user_to(PID, 1000, 100).unwrap();

        assert_eq!(read(&tmp, "uid_map"), "0 1000 1");
        assert_eq!(read(&tmp, "gid_map"), "0 100 1");
    }

    #[test]
    fn map_root_user_uses_caller_ids() {
        let (tmp, mapper) = fake_proc(&["setgroups", "uid_map", "gid_map"]);
        mapper.map_root_user(PID).unwrap();

        let uid = nix::unistd::getuid().as_raw();
        assert_eq!(read(&tmp, "uid_map"), format!("0 {uid} 1"));
    }

    #[test]
    fn failure_stops_without_rolling_back() {
        let (tmp, mapper) = fake_proc(&["setgroups", "uid_map"]);
        let err = mapper.map_root_user_to(PID, 1000, 1000).unwrap_err();

        match err {
            ContainError::Io { path, .. } => assert!(path.ends_with("gid_map")),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(read(&tmp, "setgroups"), "deny");
        assert_eq!(read(&tmp, "uid_map"), "0 1000 1");
    }

    #[test]
    fn missing_process_is_an_error() {
        let (_tmp, mapper) = fake_proc(&[]);
        assert!(mapper.map_root_user_to(PID + 1, 0, 0).is_err());
    }
}
