//! Container runtime abstraction.
//!
//! The gateway exposes only the container operations the lifecycle engine
//! needs. Implementations propagate runtime failures verbatim and never
//! retry.

pub mod docker;
pub mod memory;

use std::collections::BTreeMap;

use async_trait::async_trait;
use mongodock_common::error::Result;
use mongodock_common::types::{ContainerId, State};

pub use docker::DockerGateway;
pub use memory::MemoryGateway;

/// A container port published on the host.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PublishedPort {
    /// Port inside the container.
    pub container_port: u16,
    /// Host interface, empty for all interfaces.
    pub host_ip: String,
    /// Host TCP port.
    pub host_port: u16,
}

/// Everything needed to create a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSpec {
    /// Container name.
    pub name: String,
    /// Full image reference including tag.
    pub image: String,
    /// Environment variables.
    pub env: Vec<(String, String)>,
    /// Container labels.
    pub labels: BTreeMap<String, String>,
    /// Published ports.
    pub ports: Vec<PublishedPort>,
    /// Bind mounts in `host:container[:mode]` form.
    pub binds: Vec<String>,
}

/// Container as reported by a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSummary {
    /// Container identifier.
    pub id: ContainerId,
}

/// Health check result reported by the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HealthStatus {
    /// The image defines no health check.
    None,
    /// Within the start period.
    Starting,
    /// Last probes succeeded.
    Healthy,
    /// Probes are failing.
    Unhealthy,
}

/// Container as reported by an inspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerDetails {
    /// Container identifier.
    pub id: ContainerId,
    /// Name without the leading `/`.
    pub name: String,
    /// Image reference from the container config.
    pub image: Option<String>,
    /// Container labels.
    pub labels: BTreeMap<String, String>,
    /// Environment variables.
    pub env: Vec<(String, String)>,
    /// Lifecycle state.
    pub state: State,
    /// Health check status.
    pub health: HealthStatus,
    /// Port bindings from the host configuration.
    ///
    /// These are present from creation on, before the container starts.
    pub ports: Vec<PublishedPort>,
    /// Bind mounts.
    pub binds: Vec<String>,
    /// RFC 3339 creation timestamp.
    pub created_at: Option<String>,
}

impl ContainerDetails {
    /// Looks up an environment variable.
    #[must_use]
    pub fn env_var(&self, key: &str) -> Option<&str> {
        self.env
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Container runtime operations used by the lifecycle engine.
#[async_trait]
pub trait RuntimeGateway: Send + Sync {
    /// Checks that the runtime answers.
    ///
    /// # Errors
    ///
    /// Returns `RuntimeUnavailable` if the runtime cannot be reached.
    async fn ping(&self) -> Result<()>;

    /// Pulls an image reference.
    ///
    /// # Errors
    ///
    /// Returns an error if the pull fails.
    async fn pull_image(&self, image: &str) -> Result<()>;

    /// Lists all containers, running or not, that carry `label`.
    ///
    /// # Errors
    ///
    /// Returns an error if the runtime rejects the listing.
    async fn list_containers(&self, label: &str) -> Result<Vec<ContainerSummary>>;

    /// Creates a container without starting it.
    ///
    /// # Errors
    ///
    /// Returns an error if the container cannot be created.
    async fn create_container(&self, spec: &ContainerSpec) -> Result<ContainerId>;

    /// Starts a created container.
    ///
    /// # Errors
    ///
    /// Returns an error if the container cannot be started.
    async fn start_container(&self, id: &ContainerId) -> Result<()>;

    /// Stops a container. Stopping a stopped container succeeds.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the container does not exist.
    async fn stop_container(&self, id: &ContainerId, timeout_secs: u32) -> Result<()>;

    /// Force-removes a container.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the container does not exist.
    async fn remove_container(&self, id: &ContainerId) -> Result<()>;

    /// Inspects a container.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the container does not exist.
    async fn inspect_container(&self, id: &ContainerId) -> Result<ContainerDetails>;
}

/// Splits `KEY=VALUE` environment entries; entries without `=` get an
/// empty value.
pub(crate) fn parse_env(entries: &[String]) -> Vec<(String, String)> {
    entries
        .iter()
        .map(|entry| match entry.split_once('=') {
            Some((key, value)) => (key.to_string(), value.to_string()),
            None => (entry.clone(), String::new()),
        })
        .collect()
}
