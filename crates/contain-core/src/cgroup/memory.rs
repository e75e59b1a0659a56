//! Memory resource control via cgroups v2.
//!
//! Manages the `memory.high` throttling threshold.

use std::path::Path;

use contain_common::constants::CGROUP_MEMORY_HIGH;
use contain_common::error::{ContainError, Result};

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Converts a size in megabytes (MiB) to bytes.
///
/// # Errors
///
/// Returns an error if the byte count does not fit in a `u64`.
pub fn megabytes_to_bytes(megabytes: u64) -> Result<u64> {
    megabytes
        .checked_mul(BYTES_PER_MB)
        .ok_or_else(|| ContainError::Config {
            message: format!("memory limit of {megabytes} MB overflows"),
        })
}

/// Sets the memory high watermark (throttling threshold).
///
/// Going over `memory.high` puts the group under reclaim pressure instead
/// of invoking the OOM killer.
///
/// # Errors
///
/// Returns an error if writing to `memory.high` fails.
pub fn set_memory_high(cgroup_path: &Path, bytes: u64) -> Result<()> {
    let file = cgroup_path.join(CGROUP_MEMORY_HIGH);
    super::write_control(&file, &bytes.to_string())?;
    tracing::debug!(bytes, "memory high watermark set");
    Ok(())
}
