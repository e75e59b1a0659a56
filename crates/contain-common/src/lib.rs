//! # contain-common
//!
//! Shared error definitions, configuration models, and constants
//! used across the contain workspace.
//!
//! This crate is the leaf of the dependency graph: it depends on no other
//! internal crate and holds the vocabulary that `contain-core` speaks.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used, clippy::panic))]

pub mod config;
pub mod constants;
pub mod error;
pub mod types;
