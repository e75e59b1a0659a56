//! Host-side namespace configuration for a freshly unshared process.
//!
//! Creating the namespaces is the caller's job; this module only fills in
//! what the host must provide once the container process exists.

pub mod user;
