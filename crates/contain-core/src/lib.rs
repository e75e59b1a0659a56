//! # contain-core
//!
//! Host-side mechanics that turn a plain process into a container.
//!
//! This crate provides safe abstractions over:
//! - **Filesystem**: per-container scaffolds, `OverlayFS` or bind mounts
//!   of the image, lazy teardown, and in-namespace pseudo-filesystems.
//! - **Cgroups v2**: per-container nodes with memory and CPU limits.
//! - **User namespaces**: mapping the container root to the invoking user.
//! - **Network**: a veth pair bridged on the host and addressed inside the
//!   container's network namespace.
//!
//! Every manager follows the same shape: allocate, configure, and tear
//! down exactly once, cleaning up the partial state of a failed call.
//! Process creation and namespace unsharing are left to the caller.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used, clippy::panic))]

pub mod cgroup;
pub mod filesystem;
pub mod namespace;
pub mod network;
