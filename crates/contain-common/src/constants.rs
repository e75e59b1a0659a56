//! System-wide constants and default paths.

/// Cgroups v2 unified hierarchy mount point.
pub const CGROUP_V2_PATH: &str = "/sys/fs/cgroup";

/// Default parent node under which per-container cgroups are created.
pub const DEFAULT_CGROUP_ROOT: &str = "/sys/fs/cgroup/contain";

/// Default root of the per-process information filesystem.
pub const DEFAULT_PROC_ROOT: &str = "/proc";

/// Default name of the host end of the veth pair.
pub const DEFAULT_HOST_VETH: &str = "veth-host";

/// Default name of the container end of the veth pair.
pub const DEFAULT_CONTAINER_VETH: &str = "veth-cont";

/// Default name of the pre-existing host bridge.
pub const DEFAULT_BRIDGE: &str = "contain0";

/// Maximum length of a path, including the terminating NUL byte.
pub const PATH_MAX: usize = 4096;

/// Maximum length of the data argument of `mount(2)`.
///
/// The kernel copies at most one page of mount options.
pub const MOUNT_OPTIONS_MAX: usize = 4096;

/// Default number of attempts when waiting for the container interface.
pub const DEFAULT_LOOKUP_ATTEMPTS: u32 = 10;

/// Default delay between interface lookups, in milliseconds.
pub const DEFAULT_LOOKUP_INTERVAL_MS: u64 = 50;

/// Name of the mount target inside a container scaffold.
pub const ROOT_DIR_NAME: &str = "run";

/// Name of the overlay upper layer inside a container scaffold.
pub const DIFF_DIR_NAME: &str = ".diff";

/// Name of the overlay work area inside a container scaffold.
pub const WORK_DIR_NAME: &str = ".workdir";

/// Cgroup control file holding the memory high watermark.
pub const CGROUP_MEMORY_HIGH: &str = "memory.high";

/// Cgroup control file holding the CPU quota and period.
pub const CGROUP_CPU_MAX: &str = "cpu.max";
