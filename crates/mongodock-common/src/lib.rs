//! # mongodock-common
//!
//! Shared types, error definitions, configuration models, and constants
//! used across the entire mongodock workspace.
//!
//! This crate is the leaf of the dependency graph. It knows nothing about
//! Docker; the runtime crate translates container records into the types
//! defined here.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod config;
pub mod constants;
pub mod error;
pub mod options;
pub mod types;
