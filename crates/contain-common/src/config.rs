//! Configuration model for the host-side managers.
//!
//! Every constant a manager needs (storage location, cgroup root,
//! interface names, bridge name) lives here instead of in process-wide
//! state, so callers and tests can substitute their own.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants;
use crate::error::{ContainError, Result};
use crate::types::MountStrategy;

/// Maximum interface name length, excluding the terminating NUL byte.
const IFNAME_MAX: usize = 15;

/// Root configuration aggregating every manager's section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Container filesystem scaffolding.
    pub filesystem: FilesystemConfig,
    /// Resource-limit groups.
    pub cgroup: CgroupConfig,
    /// User namespace identity mapping.
    pub identity: IdentityConfig,
    /// Veth pair and bridge attachment.
    pub network: NetworkConfig,
}

impl HostConfig {
    /// Loads and validates a configuration from a JSON file.
    ///
    /// Missing sections and fields fall back to their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid JSON,
    /// or fails [`HostConfig::validate`].
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ContainError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks every section for values the managers cannot work with.
    ///
    /// # Errors
    ///
    /// Returns a [`ContainError::Config`] describing the first invalid value.
    pub fn validate(&self) -> Result<()> {
        self.filesystem.validate()?;
        self.network.validate()
    }
}

/// Where and how container filesystems are built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilesystemConfig {
    /// Directory holding the `<image>-<hostname>` scaffolds.
    ///
    /// Relative paths resolve against the working directory of the caller.
    pub storage_dir: PathBuf,
    /// Overlay or plain bind mount of the image.
    pub strategy: MountStrategy,
    /// Upper bound on the overlay options string, in bytes.
    pub mount_options_max: usize,
}

impl Default for FilesystemConfig {
    fn default() -> Self {
        Self {
            storage_dir: PathBuf::from("."),
            strategy: MountStrategy::default(),
            mount_options_max: constants::MOUNT_OPTIONS_MAX,
        }
    }
}

impl FilesystemConfig {
    fn validate(&self) -> Result<()> {
        if self.mount_options_max == 0 {
            return Err(ContainError::Config {
                message: "mount_options_max must be positive".into(),
            });
        }
        Ok(())
    }
}

/// Location of the per-container cgroup nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CgroupConfig {
    /// Parent node; each container gets `<root>/<hostname>`.
    pub root: PathBuf,
}

impl Default for CgroupConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from(constants::DEFAULT_CGROUP_ROOT),
        }
    }
}

/// Location of the per-process identity files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// Root of the per-process tree, normally `/proc`.
    pub proc_root: PathBuf,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            proc_root: PathBuf::from(constants::DEFAULT_PROC_ROOT),
        }
    }
}

/// Interface names and lookup policy for the veth pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Name of the veth end kept on the host.
    pub host_veth: String,
    /// Name of the veth end moved into the container.
    pub container_veth: String,
    /// Name of the pre-existing host bridge.
    pub bridge: String,
    /// How many times the container side looks for its interface.
    pub lookup_attempts: u32,
    /// Delay between two lookups, in milliseconds.
    pub lookup_interval_ms: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            host_veth: constants::DEFAULT_HOST_VETH.into(),
            container_veth: constants::DEFAULT_CONTAINER_VETH.into(),
            bridge: constants::DEFAULT_BRIDGE.into(),
            lookup_attempts: constants::DEFAULT_LOOKUP_ATTEMPTS,
            lookup_interval_ms: constants::DEFAULT_LOOKUP_INTERVAL_MS,
        }
    }
}

impl NetworkConfig {
    /// Checks interface names and the lookup policy.
    ///
    /// # Errors
    ///
    /// Returns an error if a name is empty, too long for the kernel, or
    /// contains `/` or whitespace, if both veth ends share a name, or if
    /// `lookup_attempts` is zero.
    pub fn validate(&self) -> Result<()> {
        for (field, name) in [
            ("host_veth", &self.host_veth),
            ("container_veth", &self.container_veth),
            ("bridge", &self.bridge),
        ] {
            validate_ifname(field, name)?;
        }
        if self.host_veth == self.container_veth {
            return Err(ContainError::Config {
                message: format!("veth ends must have distinct names, both are {:?}", self.host_veth),
            });
        }
        if self.lookup_attempts == 0 {
            return Err(ContainError::Config {
                message: "lookup_attempts must be positive".into(),
            });
        }
        Ok(())
    }
}

fn validate_ifname(field: &str, name: &str) -> Result<()> {
    if name.is_empty() || name.len() > IFNAME_MAX {
        return Err(ContainError::Config {
            message: format!("{field} must be 1 to {IFNAME_MAX} bytes long, got {name:?}"),
        });
    }
    if name.contains('/') || name.chars().any(char::is_whitespace) {
        return Err(ContainError::Config {
            message: format!("{field} contains forbidden characters: {name:?}"),
        });
    }
    Ok(())
}
