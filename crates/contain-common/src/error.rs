//! Unified error type for the contain workspace.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::LimitKind;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum ContainError {
    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A configuration value is invalid, or a bounded value would overflow.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the invalid configuration.
        message: String,
    },

    /// A required external resource was not found.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Type of the missing resource.
        kind: &'static str,
        /// Identifier of the missing resource.
        id: String,
    },

    /// A mount-related system call failed.
    #[error("{call} failed on {target}: {source}")]
    Syscall {
        /// Name of the failing system call.
        call: &'static str,
        /// Path the call operated on.
        target: PathBuf,
        /// Underlying OS error.
        source: std::io::Error,
    },

    /// A netlink request failed at a specific step.
    #[error("netlink error while {step}: {source}")]
    Netlink {
        /// Step of the link setup that failed.
        step: &'static str,
        /// Underlying OS error.
        source: std::io::Error,
    },

    /// Applying a resource limit failed.
    #[error("failed setting {kind} limit: {source}")]
    Limit {
        /// Which limit could not be applied.
        kind: LimitKind,
        /// Underlying failure.
        source: Box<ContainError>,
    },

    /// An operation failed and rolling back its partial state also failed.
    #[error("{source} ({count} cleanup step(s) also failed)", count = .cleanup.len())]
    Cleanup {
        /// The original failure.
        source: Box<ContainError>,
        /// Every failure observed while cleaning up.
        cleanup: Vec<ContainError>,
    },

    /// Serialization or deserialization failed.
    #[error("serialization error: {source}")]
    Serialization {
        /// Underlying serialization error.
        #[from]
        source: serde_json::Error,
    },
}

impl ContainError {
    /// Wraps `primary` with the failures collected during cleanup.
    ///
    /// Returns `primary` untouched when cleanup went through.
    #[must_use]
    pub fn with_cleanup(primary: Self, cleanup: Vec<Self>) -> Self {
        if cleanup.is_empty() {
            primary
        } else {
            Self::Cleanup {
                source: Box::new(primary),
                cleanup,
            }
        }
    }

    /// Returns the original failure, looking through any cleanup wrapper.
    #[must_use]
    pub fn primary(&self) -> &Self {
        match self {
            Self::Cleanup { source, .. } => source.primary(),
            other => other,
        }
    }

    /// Returns the failures collected during cleanup, if any.
    #[must_use]
    pub fn cleanup_failures(&self) -> &[Self] {
        match self {
            Self::Cleanup { cleanup, .. } => cleanup,
            _ => &[],
        }
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, ContainError>;
