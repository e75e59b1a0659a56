//! Domain primitive types used across the contain workspace.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ContainError, Result};

/// Kind of resource limit applied to a cgroup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LimitKind {
    /// Memory high watermark.
    Memory,
    /// CPU bandwidth quota.
    Cpu,
}

impl fmt::Display for LimitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory => write!(f, "memory"),
            Self::Cpu => write!(f, "CPU"),
        }
    }
}

/// How the container root is exposed at its mount target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MountStrategy {
    /// Overlay with the image as lower layer and a private upper layer.
    #[default]
    Overlay,
    /// Read-write bind mount of the image directory itself.
    Bind,
}

impl fmt::Display for MountStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Overlay => write!(f, "overlay"),
            Self::Bind => write!(f, "bind"),
        }
    }
}

/// Contents of a cgroup v2 `cpu.max` file.
///
/// A `quota` of `None` stands for the literal `max` (unlimited).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CpuMax {
    /// Allowed runtime per period in microseconds, `None` when unlimited.
    pub quota: Option<u64>,
    /// Scheduling period in microseconds.
    pub period: u64,
}

impl CpuMax {
    /// Keeps the period and allots `percent` of it as quota.
    ///
    /// # Errors
    ///
    /// Returns an error if `percent` is not a finite, non-negative number
    /// or if the resulting quota does not fit in a `u64`.
    pub fn with_percent(self, percent: f64) -> Result<Self> {
        if !percent.is_finite() || percent < 0.0 {
            return Err(ContainError::Config {
                message: format!("invalid CPU percentage: {percent}"),
            });
        }
        #[allow(clippy::cast_precision_loss)]
        let quota = (self.period as f64 * percent / 100.0).round();
        if quota >= u64::MAX as f64 {
            return Err(ContainError::Config {
                message: format!("CPU quota overflows for {percent}% of {}", self.period),
            });
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let quota = quota as u64;
        Ok(Self {
            quota: Some(quota),
            period: self.period,
        })
    }
}

impl fmt::Display for CpuMax {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.quota {
            Some(quota) => write!(f, "{quota} {}", self.period),
            None => write!(f, "max {}", self.period),
        }
    }
}

impl FromStr for CpuMax {
    type Err = ContainError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || ContainError::Config {
            message: format!("malformed cpu.max contents: {:?}", s.trim()),
        };
        let mut fields = s.split_whitespace();
        let quota = match fields.next().ok_or_else(invalid)? {
            "max" => None,
            q => Some(q.parse::<u64>().map_err(|_| invalid())?),
        };
        let period = fields
            .next()
            .ok_or_else(invalid)?
            .parse::<u64>()
            .map_err(|_| invalid())?;
        if fields.next().is_some() || period == 0 {
            return Err(invalid());
        }
        Ok(Self { quota, period })
    }
}
