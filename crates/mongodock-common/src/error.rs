//! Unified error types for the mongodock workspace.
//!
//! Callers are expected to branch on [`MongodockError::RuntimeUnavailable`]
//! only; every other variant signals a programming or environment error.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Boxed error used to carry runtime failures without leaking the
/// container client's error type into this crate.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum MongodockError {
    /// The container runtime could not be reached.
    #[error("connect to docker")]
    RuntimeUnavailable {
        /// Underlying connection failure.
        #[source]
        source: BoxError,
    },

    /// A deployment with the requested name is already live.
    #[error("deployment already exists: {name}")]
    NameConflict {
        /// Name that collided.
        name: String,
    },

    /// A required resource was not found.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Type of the missing resource.
        kind: &'static str,
        /// Identifier of the missing resource.
        id: String,
    },

    /// A container runtime call failed.
    #[error("{operation}: {source}")]
    RuntimeOperationFailed {
        /// Runtime operation that failed, e.g. `start container`.
        operation: &'static str,
        /// Error reported by the runtime.
        #[source]
        source: BoxError,
    },

    /// A requested host port is already bound.
    #[error("port {port} is not available")]
    PortUnavailable {
        /// The port that was requested.
        port: u16,
    },

    /// Every port in the allocation range is taken.
    #[error("no free port in range {start}-{end}")]
    PortsExhausted {
        /// First port of the range.
        start: u16,
        /// Last port of the range.
        end: u16,
    },

    /// A configuration value or creation option is invalid.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the invalid value.
        message: String,
    },

    /// An operation exceeded its deadline.
    #[error("{operation} timed out after {after:?}")]
    Timeout {
        /// Operation that timed out.
        operation: &'static str,
        /// Deadline that was exceeded.
        after: Duration,
    },

    /// A deployment's health check reported a failure.
    #[error("deployment {name} is {status}")]
    Unhealthy {
        /// Deployment name.
        name: String,
        /// Last observed health or container status.
        status: String,
    },

    /// A connection string could not be verified.
    #[error("could not reach {address}: {source}")]
    Unreachable {
        /// Address that was probed.
        address: String,
        /// Underlying socket error.
        source: std::io::Error,
    },

    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Serialization or deserialization failed.
    #[error("serialization error: {source}")]
    Serialization {
        /// Underlying serialization error.
        #[from]
        source: serde_json::Error,
    },
}

impl MongodockError {
    /// Wraps a runtime failure for the named operation.
    pub fn runtime(operation: &'static str, source: impl Into<BoxError>) -> Self {
        Self::RuntimeOperationFailed {
            operation,
            source: source.into(),
        }
    }

    /// Builds a `NotFound` error for a deployment name.
    pub fn deployment_not_found(name: impl Into<String>) -> Self {
        Self::NotFound {
            kind: "deployment",
            id: name.into(),
        }
    }

    /// Returns whether this error means the runtime is unreachable.
    #[must_use]
    pub const fn is_runtime_unavailable(&self) -> bool {
        matches!(self, Self::RuntimeUnavailable { .. })
    }

    /// Returns whether this error reports a missing resource.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, MongodockError>;
