//! CPU resource control via cgroups v2.
//!
//! Manages `cpu.max`, which holds `<quota> <period>` in microseconds.

use std::path::Path;

use contain_common::constants::CGROUP_CPU_MAX;
use contain_common::error::{ContainError, Result};
use contain_common::types::CpuMax;

/// Reads the current quota and period from `cpu.max`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is malformed.
pub fn read_cpu_max(cgroup_path: &Path) -> Result<CpuMax> {
    let file = cgroup_path.join(CGROUP_CPU_MAX);
    let content = std::fs::read_to_string(&file).map_err(|e| ContainError::Io {
        path: file,
        source: e,
    })?;
    content.parse()
}

/// Writes `quota period` (or `max period`) to `cpu.max`.
///
/// # Errors
///
/// Returns an error if writing to `cpu.max` fails.
pub fn set_cpu_max(cgroup_path: &Path, max: CpuMax) -> Result<()> {
    let file = cgroup_path.join(CGROUP_CPU_MAX);
    super::write_control(&file, &max.to_string())?;
    tracing::debug!(quota_us = ?max.quota, period_us = max.period, "CPU max quota set");
    Ok(())
}

/// Caps the group at `percent` of one CPU.
///
/// The period is read back from the kernel rather than assumed, since it
/// is configurable per hierarchy; the quota becomes `period * percent / 100`.
///
/// # Errors
///
/// Returns an error if `cpu.max` cannot be read, parsed or written, or if
/// `percent` is invalid.
pub fn set_cpu_percent(cgroup_path: &Path, percent: f64) -> Result<CpuMax> {
    let limited = read_cpu_max(cgroup_path)?.with_percent(percent)?;
    set_cpu_max(cgroup_path, limited)?;
    Ok(limited)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_uses_reported_period() {
        let tmp = tempfile::tempdir().expect("tempdir");
        std::fs::write(tmp.path().join("cpu.max"), "max 100000\n").expect("write");

        let limited = set_cpu_percent(tmp.path(), 50.0).unwrap();
        assert_eq!(limited.quota, Some(50_000));
        let written = std::fs::read_to_string(tmp.path().join("cpu.max")).expect("read");
        assert_eq!(written, "50000 100000");
    }

    #[test]
    fn percent_above_one_cpu() {
        let tmp = tempfile::tempdir().expect("tempdir");
        std::fs::write(tmp.path().join("cpu.max"), "max 10000\n").expect("write");

        let limited = set_cpu_percent(tmp.path(), 250.0).unwrap();
        assert_eq!(limited.to_string(), "25000 10000");
    }

    #[test]
    fn unlimited_quota_survives_a_round_trip() {
        let tmp = tempfile::tempdir().expect("tempdir");
        std::fs::write(tmp.path().join("cpu.max"), "max 100000\n").expect("write");

        let max = read_cpu_max(tmp.path()).unwrap();
        set_cpu_max(tmp.path(), max).unwrap();
        let written = std::fs::read_to_string(tmp.path().join("cpu.max")).expect("read");
        assert_eq!(written, "max 100000");
    }

    #[test]
    fn missing_control_file_is_an_error() {
        let tmp = tempfile::tempdir().expect("tempdir");
        assert!(matches!(
            set_cpu_percent(tmp.path(), 10.0),
            Err(ContainError::Io { .. })
        ));
    }

    #[test]
    fn set_cpu_max_does_not_create_the_control_file() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let max: CpuMax = "max 100000".parse().unwrap();
        assert!(set_cpu_max(tmp.path(), max).is_err());
        assert!(!tmp.path().join("cpu.max").exists());
    }

    #[test]
    fn malformed_control_file_is_an_error() {
        let tmp = tempfile::tempdir().expect("tempdir");
        std::fs::write(tmp.path().join("cpu.max"), "garbage").expect("write");
        assert!(matches!(
            set_cpu_percent(tmp.path(), 10.0),
            Err(ContainError::Config { .. })
        ));
    }
}
