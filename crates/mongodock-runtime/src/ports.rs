//! Host port allocation for new deployments.
//!
//! The allocator scans its range lowest-first and hands out the first port
//! that no live deployment has bound and that the host reports free. It
//! keeps no state of its own: the engine passes in the ports of live
//! deployments and serializes allocation with the create call.

use std::collections::BTreeSet;
use std::net::{Ipv4Addr, TcpListener};

use mongodock_common::config::ClientConfig;
use mongodock_common::error::{MongodockError, Result};

/// Reports whether a host port can be bound.
pub type PortProbe = fn(u16) -> bool;

/// Picks free host ports from a fixed range.
#[derive(Debug, Clone, Copy)]
pub struct PortAllocator {
    range_start: u16,
    range_end: u16,
    probe: PortProbe,
}

impl PortAllocator {
    /// Creates an allocator over `range_start..=range_end` that probes the host.
    #[must_use]
    pub const fn new(range_start: u16, range_end: u16) -> Self {
        Self {
            range_start,
            range_end,
            probe: is_host_port_free,
        }
    }

    /// Creates an allocator over the configured range.
    #[must_use]
    pub const fn from_config(config: &ClientConfig) -> Self {
        Self::new(config.port_range_start, config.port_range_end)
    }

    /// Replaces the host probe.
    #[must_use]
    pub const fn with_probe(mut self, probe: PortProbe) -> Self {
        self.probe = probe;
        self
    }

    /// Returns the first port of the range not in `bound` and free on the host.
    ///
    /// # Errors
    ///
    /// Returns `PortsExhausted` if every port in the range is taken.
    pub fn allocate(&self, bound: &BTreeSet<u16>) -> Result<u16> {
        let port = (self.range_start..=self.range_end)
            .filter(|port| !bound.contains(port))
            .find(|&port| (self.probe)(port))
            .ok_or(MongodockError::PortsExhausted {
                start: self.range_start,
                end: self.range_end,
            })?;
        tracing::debug!(port, bound = bound.len(), "allocated host port");
        Ok(port)
    }

    /// Validates a caller-chosen port. It may lie outside the range.
    ///
    /// # Errors
    ///
    /// Returns `PortUnavailable` if a live deployment or another process
    /// holds the port.
    pub fn check(&self, port: u16, bound: &BTreeSet<u16>) -> Result<u16> {
        if port == 0 || bound.contains(&port) || !(self.probe)(port) {
            return Err(MongodockError::PortUnavailable { port });
        }
        Ok(port)
    }
}

/// Tries to bind `port` on loopback and on all interfaces.
///
/// Docker publishes on one of the two, so a port counts as free only when
/// both binds succeed.
#[must_use]
pub fn is_host_port_free(port: u16) -> bool {
    [Ipv4Addr::LOCALHOST, Ipv4Addr::UNSPECIFIED]
        .into_iter()
        .all(|ip| TcpListener::bind((ip, port)).is_ok())
}
