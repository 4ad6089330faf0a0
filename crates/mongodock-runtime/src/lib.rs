//! Deployment lifecycle management for mongodock.
//!
//! The [`engine::Engine`] composes a [`gateway::RuntimeGateway`], the
//! [`ports::PortAllocator`] and the [`registry`] projection into race-safe
//! create/list/get/delete operations.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod engine;
pub mod gateway;
pub mod locks;
pub mod ports;
pub mod registry;
pub mod spec;
