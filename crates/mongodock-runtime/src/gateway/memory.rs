//! In-process container runtime.
//!
//! Behaves like a Docker daemon for the operations the engine uses: names
//! are unique, host ports cannot be published twice, and stopped containers
//! stay listed until removed. Failures can be injected to exercise the
//! engine's compensation paths without a daemon.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use mongodock_common::error::{MongodockError, Result};
use mongodock_common::types::{ContainerId, State};

use super::{ContainerDetails, ContainerSpec, ContainerSummary, HealthStatus, RuntimeGateway};

#[derive(Debug, Clone)]
struct MemoryContainer {
    spec: ContainerSpec,
    state: State,
    health: HealthStatus,
    created_at: String,
}

#[derive(Debug, Default)]
struct MemoryState {
    containers: BTreeMap<ContainerId, MemoryContainer>,
    images: BTreeSet<String>,
    next_id: u64,
    operations: Vec<String>,
    unreachable: bool,
    fail_next_create: Option<String>,
    fail_next_start: Option<String>,
    fail_next_inspect: Option<String>,
    start_health: Option<HealthStatus>,
}

/// Container runtime held entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryGateway {
    state: Mutex<MemoryState>,
    latency: Option<Duration>,
}

impl MemoryGateway {
    /// Creates an empty runtime.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a runtime that fails every ping.
    #[must_use]
    pub fn unreachable() -> Self {
        let gateway = Self::default();
        gateway.lock().unreachable = true;
        gateway
    }

    /// Adds a delay to every call so concurrent callers interleave.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Makes the next `create_container` fail with `message`.
    pub fn fail_next_create(&self, message: impl Into<String>) {
        self.lock().fail_next_create = Some(message.into());
    }

    /// Makes the next `start_container` fail with `message`.
    pub fn fail_next_start(&self, message: impl Into<String>) {
        self.lock().fail_next_start = Some(message.into());
    }

    /// Makes the next `inspect_container` fail with `message`.
    pub fn fail_next_inspect(&self, message: impl Into<String>) {
        self.lock().fail_next_inspect = Some(message.into());
    }

    /// Health status reported for containers after they start.
    ///
    /// Defaults to [`HealthStatus::Healthy`].
    pub fn set_start_health(&self, health: HealthStatus) {
        self.lock().start_health = Some(health);
    }

    /// Overrides the health of an existing container.
    pub fn set_health(&self, id: &ContainerId, health: HealthStatus) {
        if let Some(container) = self.lock().containers.get_mut(id) {
            container.health = health;
        }
    }

    /// Marks a container as exited, as if `mongod` crashed.
    pub fn exit(&self, id: &ContainerId) {
        if let Some(container) = self.lock().containers.get_mut(id) {
            container.state = State::Exited;
        }
    }

    /// Inserts a container directly, bypassing the create call.
    pub fn insert(&self, spec: ContainerSpec, state: State) -> ContainerId {
        let mut inner = self.lock();
        let id = next_id(&mut inner);
        let _ = inner.containers.insert(
            id.clone(),
            MemoryContainer {
                spec,
                state,
                health: HealthStatus::None,
                created_at: chrono::Utc::now().to_rfc3339(),
            },
        );
        id
    }

    /// Returns every call made so far, e.g. `create:test_deployment`.
    #[must_use]
    pub fn operations(&self) -> Vec<String> {
        self.lock().operations.clone()
    }

    /// Returns how many containers exist, managed or not.
    #[must_use]
    pub fn container_count(&self) -> usize {
        self.lock().containers.len()
    }

    /// Returns the images pulled so far.
    #[must_use]
    pub fn pulled_images(&self) -> Vec<String> {
        self.lock().images.iter().cloned().collect()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn call(&self, operation: String) -> Result<()> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        let mut inner = self.lock();
        if inner.unreachable {
            return Err(MongodockError::RuntimeUnavailable {
                source: "runtime is unreachable".into(),
            });
        }
        inner.operations.push(operation);
        Ok(())
    }
}

fn next_id(inner: &mut MemoryState) -> ContainerId {
    inner.next_id += 1;
    ContainerId::new(format!("{:064x}", inner.next_id))
}

fn not_found(id: &ContainerId) -> MongodockError {
    MongodockError::NotFound {
        kind: "container",
        id: id.to_string(),
    }
}

#[async_trait]
impl RuntimeGateway for MemoryGateway {
    async fn ping(&self) -> Result<()> {
        self.call("ping".to_string()).await
    }

    async fn pull_image(&self, image: &str) -> Result<()> {
        self.call(format!("pull:{image}")).await?;
        let _ = self.lock().images.insert(image.to_string());
        Ok(())
    }

    async fn list_containers(&self, label: &str) -> Result<Vec<ContainerSummary>> {
        self.call("list".to_string()).await?;
        Ok(self
            .lock()
            .containers
            .iter()
            .filter(|(_, c)| c.spec.labels.contains_key(label))
            .map(|(id, _)| ContainerSummary { id: id.clone() })
            .collect())
    }

    async fn create_container(&self, spec: &ContainerSpec) -> Result<ContainerId> {
        self.call(format!("create:{}", spec.name)).await?;
        let mut inner = self.lock();
        if let Some(message) = inner.fail_next_create.take() {
            return Err(MongodockError::runtime("create container", message));
        }
        if inner.containers.values().any(|c| c.spec.name == spec.name) {
            return Err(MongodockError::runtime(
                "create container",
                format!("Conflict. The container name \"/{}\" is already in use", spec.name),
            ));
        }

        let id = next_id(&mut inner);
        let _ = inner.containers.insert(
            id.clone(),
            MemoryContainer {
                spec: spec.clone(),
                state: State::Created,
                health: HealthStatus::None,
                created_at: chrono::Utc::now().to_rfc3339(),
            },
        );
        Ok(id)
    }

    async fn start_container(&self, id: &ContainerId) -> Result<()> {
        self.call(format!("start:{id}")).await?;
        let mut inner = self.lock();
        if let Some(message) = inner.fail_next_start.take() {
            return Err(MongodockError::runtime("start container", message));
        }
        let start_health = inner.start_health.unwrap_or(HealthStatus::Healthy);

        let container = inner.containers.get(id).ok_or_else(|| not_found(id))?;
        let wanted: Vec<u16> = container.spec.ports.iter().map(|p| p.host_port).collect();
        let clash = inner.containers.iter().any(|(other, c)| {
            other != id
                && c.state.is_running()
                && c.spec.ports.iter().any(|p| wanted.contains(&p.host_port))
        });
        if clash {
            return Err(MongodockError::runtime(
                "start container",
                "Bind for host port failed: port is already allocated",
            ));
        }

        let container = inner.containers.get_mut(id).ok_or_else(|| not_found(id))?;
        container.state = State::Running;
        container.health = start_health;
        Ok(())
    }

    async fn stop_container(&self, id: &ContainerId, _timeout_secs: u32) -> Result<()> {
        self.call(format!("stop:{id}")).await?;
        let mut inner = self.lock();
        let container = inner.containers.get_mut(id).ok_or_else(|| not_found(id))?;
        if container.state.is_running() {
            container.state = State::Exited;
        }
        Ok(())
    }

    async fn remove_container(&self, id: &ContainerId) -> Result<()> {
        self.call(format!("remove:{id}")).await?;
        self.lock()
            .containers
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| not_found(id))
    }

    async fn inspect_container(&self, id: &ContainerId) -> Result<ContainerDetails> {
        self.call(format!("inspect:{id}")).await?;
        let mut inner = self.lock();
        if let Some(message) = inner.fail_next_inspect.take() {
            return Err(MongodockError::runtime("inspect container", message));
        }
        let container = inner.containers.get(id).ok_or_else(|| not_found(id))?;
        Ok(ContainerDetails {
            id: id.clone(),
            name: container.spec.name.clone(),
            image: Some(container.spec.image.clone()),
            labels: container.spec.labels.clone(),
            env: container.spec.env.clone(),
            state: container.state,
            health: container.health,
            ports: container.spec.ports.clone(),
            binds: container.spec.binds.clone(),
            created_at: Some(container.created_at.clone()),
        })
    }
}
