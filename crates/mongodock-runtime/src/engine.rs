//! Deployment lifecycle engine.
//!
//! Turns deployment requests into gateway calls. Create and delete for the
//! same name are serialized through [`NameLocks`]; reading the bound ports,
//! picking a port and creating the container happen under one global
//! allocation lock so concurrent creates never publish the same port.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use mongodock_common::config::ClientConfig;
use mongodock_common::constants::LOOPBACK_IP;
use mongodock_common::error::{MongodockError, Result};
use mongodock_common::options::{CreateDeploymentOptions, GetConnectionStringOptions};
use mongodock_common::types::{BindingType, ContainerId, Deployment, PortBinding, State};
use tokio::net::TcpStream;
use tokio::sync::Mutex as AsyncMutex;
use tokio::time::Instant;

use crate::gateway::{ContainerDetails, HealthStatus, RuntimeGateway};
use crate::locks::{NameGuard, NameLocks};
use crate::ports::PortAllocator;
use crate::registry;
use crate::spec;

/// How long `verify` waits for the port to accept a connection.
const VERIFY_TIMEOUT: Duration = Duration::from_secs(5);

/// Formats the connection URI for a deployment.
#[must_use]
pub fn connection_string(username: &str, password: &str, host: &str, port: u16) -> String {
    format!("mongodb://{username}:{password}@{host}:{port}/?directConnection=true")
}

/// Coordinates deployment operations against a runtime gateway.
#[derive(Debug)]
pub struct Engine<G> {
    gateway: Arc<G>,
    config: ClientConfig,
    allocator: PortAllocator,
    name_locks: NameLocks,
    allocation_lock: AsyncMutex<()>,
}

impl<G> Engine<G>
where
    G: RuntimeGateway + 'static,
{
    /// Creates an engine over `gateway`.
    #[must_use]
    pub fn new(gateway: G, config: ClientConfig) -> Self {
        Self {
            gateway: Arc::new(gateway),
            allocator: PortAllocator::from_config(&config),
            config,
            name_locks: NameLocks::new(),
            allocation_lock: AsyncMutex::new(()),
        }
    }

    /// Replaces the port allocator.
    #[must_use]
    pub fn with_allocator(mut self, allocator: PortAllocator) -> Self {
        self.allocator = allocator;
        self
    }

    /// Returns the underlying gateway.
    #[must_use]
    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Returns the active configuration.
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn label(&self) -> &str {
        &self.config.managed_label
    }

    /// Lists every live deployment.
    ///
    /// # Errors
    ///
    /// Returns an error if the runtime cannot be queried.
    pub async fn list_deployments(&self) -> Result<Vec<Deployment>> {
        registry::list(self.gateway.as_ref(), self.label()).await
    }

    /// Returns the deployment called `name`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no live deployment has that name.
    pub async fn get_deployment(&self, name: &str) -> Result<Deployment> {
        registry::find(self.gateway.as_ref(), self.label(), name)
            .await?
            .ok_or_else(|| MongodockError::deployment_not_found(name))
    }

    /// Returns the id of the container backing `name`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no live deployment has that name.
    pub async fn get_deployment_id(&self, name: &str) -> Result<ContainerId> {
        Ok(self.get_deployment(name).await?.container_id)
    }

    /// Returns the connection URI of `name` with its stored credentials.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no live deployment has that name.
    pub async fn get_connection_string(&self, name: &str) -> Result<String> {
        let deployment = self.get_deployment(name).await?;
        connection_string_for(&deployment, &GetConnectionStringOptions::new(name)).await
    }

    /// Returns a connection URI, looking the deployment up by name or id.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if nothing matches, a `Config` error if the
    /// credentials are only available as files, and `Unreachable` if
    /// `verify` is set and the port does not accept connections.
    pub async fn get_connection_string_with(
        &self,
        options: &GetConnectionStringOptions,
    ) -> Result<String> {
        let deployment = registry::find_by_name_or_id(
            self.gateway.as_ref(),
            self.label(),
            &options.container_id_or_name,
        )
        .await?
        .ok_or_else(|| MongodockError::deployment_not_found(&options.container_id_or_name))?;
        connection_string_for(&deployment, options).await
    }

    /// Creates and starts a deployment.
    ///
    /// Any container created before a failure, timeout or cancellation is
    /// removed again.
    ///
    /// # Errors
    ///
    /// Returns `NameConflict` if the name is live, a port error if no port
    /// can be published, or the runtime error that stopped creation.
    pub async fn create_deployment(&self, options: &CreateDeploymentOptions) -> Result<Deployment> {
        self.with_deadline("create deployment", self.create_inner(options))
            .await
    }

    /// Stops and removes the deployment called `name`.
    ///
    /// Deleting a name with no live deployment succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the runtime fails to stop or remove the container.
    pub async fn delete_deployment(&self, name: &str) -> Result<()> {
        self.with_deadline("delete deployment", self.delete_inner(name))
            .await
    }

    /// Polls until the container reports healthy.
    ///
    /// A running container whose image defines no health check counts as
    /// healthy.
    ///
    /// # Errors
    ///
    /// Returns `Unhealthy` if the health check fails or the container
    /// exits, and `Timeout` once `timeout` has passed.
    pub async fn wait_until_healthy(
        &self,
        name: &str,
        id: &ContainerId,
        timeout: Duration,
    ) -> Result<()> {
        let deadline = Instant::now() + timeout;
        loop {
            let details = self.gateway.inspect_container(id).await?;
            match (details.state, details.health) {
                (_, HealthStatus::Healthy) | (State::Running, HealthStatus::None) => {
                    tracing::info!(name, id = %id.short(), "deployment is healthy");
                    return Ok(());
                }
                (_, HealthStatus::Unhealthy) => {
                    return Err(MongodockError::Unhealthy {
                        name: name.to_string(),
                        status: "unhealthy".to_string(),
                    });
                }
                (State::Exited | State::Dead, _) => {
                    return Err(MongodockError::Unhealthy {
                        name: name.to_string(),
                        status: details.state.to_string(),
                    });
                }
                _ => {}
            }
            if Instant::now() >= deadline {
                return Err(MongodockError::Timeout {
                    operation: "wait until healthy",
                    after: timeout,
                });
            }
            tokio::time::sleep(self.config.health_poll_interval()).await;
        }
    }

    async fn with_deadline<T>(
        &self,
        operation: &'static str,
        fut: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        match self.config.operation_timeout() {
            Some(after) => tokio::time::timeout(after, fut)
                .await
                .map_err(|_| MongodockError::Timeout { operation, after })?,
            None => fut.await,
        }
    }

    async fn create_inner(&self, options: &CreateDeploymentOptions) -> Result<Deployment> {
        let name = options.resolve_name()?;
        let name_guard = self.name_locks.lock(&name).await;

        if registry::find(self.gateway.as_ref(), self.label(), &name)
            .await?
            .is_some()
        {
            return Err(MongodockError::NameConflict { name });
        }

        let image = options.image_reference(&self.config.image);
        if !options.skip_pull_image.unwrap_or(false) {
            self.gateway.pull_image(&image).await?;
        }

        let pending = {
            let _allocation = self.allocation_lock.lock().await;
            let bound = registry::bound_ports(self.gateway.as_ref(), self.label()).await?;
            let port = match options.mongodb_port_binding.as_ref().and_then(|b| b.port) {
                Some(port) => self.allocator.check(port, &bound)?,
                None => self.allocator.allocate(&bound)?,
            };
            let binding = PortBinding::new(spec::requested_binding_type(options), port);
            let container = spec::build_container_spec(&name, options, &self.config, &binding);

            let id = self.gateway.create_container(&container).await?;
            tracing::info!(id = %id.short(), name = %name, port, image = %image, "container created");
            PendingContainer::new(Arc::clone(&self.gateway), id, name_guard)
        };

        let started = self.start(&name, pending.id(), options).await;
        match started {
            Ok(details) => {
                let _name_guard = pending.commit();
                Ok(registry::deployment_from_details(details))
            }
            Err(e) => {
                tracing::warn!(name = %name, error = %e, "removing half-created container");
                pending.discard().await;
                Err(e)
            }
        }
    }

    /// Starts the container, optionally waits for health, and reads it back.
    async fn start(
        &self,
        name: &str,
        id: &ContainerId,
        options: &CreateDeploymentOptions,
    ) -> Result<ContainerDetails> {
        self.gateway.start_container(id).await?;
        tracing::info!(id = %id.short(), name, "container started");

        if options.wait_until_healthy.unwrap_or(false) {
            let timeout = options
                .wait_until_healthy_timeout
                .unwrap_or_else(|| self.config.health_timeout());
            self.wait_until_healthy(name, id, timeout).await?;
        }
        self.gateway.inspect_container(id).await
    }

    async fn delete_inner(&self, name: &str) -> Result<()> {
        let _name_guard = self.name_locks.lock(name).await;

        let Some(deployment) = registry::find(self.gateway.as_ref(), self.label(), name).await?
        else {
            tracing::debug!(name, "delete of absent deployment");
            return Ok(());
        };
        let id = &deployment.container_id;

        match self
            .gateway
            .stop_container(id, self.config.stop_timeout_secs)
            .await
        {
            Ok(()) => tracing::info!(id = %id.short(), name, "container stopped"),
            Err(e) if e.is_not_found() => return Ok(()),
            Err(e) => return Err(e),
        }

        match self.gateway.remove_container(id).await {
            Ok(()) => {
                tracing::info!(id = %id.short(), name, "container removed");
                Ok(())
            }
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(e),
        }
    }
}

async fn connection_string_for(
    deployment: &Deployment,
    options: &GetConnectionStringOptions,
) -> Result<String> {
    let binding = deployment
        .port_bindings
        .as_ref()
        .ok_or_else(|| MongodockError::NotFound {
            kind: "port binding",
            id: deployment.name.clone(),
        })?;
    let host = match &binding.binding_type {
        BindingType::Specific(ip) => ip.to_string(),
        BindingType::Loopback | BindingType::AnyInterface => LOOPBACK_IP.to_string(),
    };

    let missing = |what: &str| MongodockError::Config {
        message: format!(
            "deployment {} reads its {what} from a file; pass it explicitly",
            deployment.name
        ),
    };
    let username = options
        .db_username
        .as_deref()
        .or(deployment.mongodb_initdb_root_username.as_deref())
        .ok_or_else(|| missing("username"))?;
    let password = options
        .db_password
        .as_deref()
        .or(deployment.mongodb_initdb_root_password.as_deref())
        .ok_or_else(|| missing("password"))?;

    if options.verify.unwrap_or(false) {
        verify_reachable(&host, binding.port).await?;
    }

    Ok(connection_string(username, password, &host, binding.port))
}

async fn verify_reachable(host: &str, port: u16) -> Result<()> {
    let address = format!("{host}:{port}");
    let unreachable = |source| MongodockError::Unreachable {
        address: address.clone(),
        source,
    };
    let _stream = tokio::time::timeout(VERIFY_TIMEOUT, TcpStream::connect((host, port)))
        .await
        .map_err(|_| {
            unreachable(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "connection attempt timed out",
            ))
        })?
        .map_err(unreachable)?;
    tracing::debug!(address = %address, "connection verified");
    Ok(())
}

/// A created container that is removed unless committed.
///
/// The deployment's name lock travels with it. Dropping it without
/// [`PendingContainer::commit`] (for example when the create future is
/// cancelled) spawns a best-effort removal that keeps holding the name lock
/// until the container is gone.
struct PendingContainer<G>
where
    G: RuntimeGateway + 'static,
{
    gateway: Arc<G>,
    id: ContainerId,
    name_guard: Option<NameGuard>,
}

impl<G> PendingContainer<G>
where
    G: RuntimeGateway + 'static,
{
    fn new(gateway: Arc<G>, id: ContainerId, name_guard: NameGuard) -> Self {
        Self {
            gateway,
            id,
            name_guard: Some(name_guard),
        }
    }

    const fn id(&self) -> &ContainerId {
        &self.id
    }

    /// Keeps the container and hands back the name lock.
    fn commit(mut self) -> Option<NameGuard> {
        self.name_guard.take()
    }

    async fn discard(mut self) {
        let _name_guard = self.name_guard.take();
        remove_quietly(self.gateway.as_ref(), &self.id).await;
    }
}

impl<G> Drop for PendingContainer<G>
where
    G: RuntimeGateway + 'static,
{
    fn drop(&mut self) {
        let Some(name_guard) = self.name_guard.take() else {
            return;
        };
        let gateway = Arc::clone(&self.gateway);
        let id = self.id.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                tracing::warn!(id = %id.short(), name = name_guard.name(), "create cancelled, removing container");
                let _ = handle.spawn(async move {
                    remove_quietly(gateway.as_ref(), &id).await;
                    drop(name_guard);
                });
            }
            Err(_) => {
                tracing::warn!(id = %id.short(), "create cancelled outside a runtime, container left behind");
            }
        }
    }
}

async fn remove_quietly<G>(gateway: &G, id: &ContainerId)
where
    G: RuntimeGateway + ?Sized,
{
    match gateway.remove_container(id).await {
        Ok(()) => tracing::info!(id = %id.short(), "removed half-created container"),
        Err(e) if e.is_not_found() => {}
        Err(e) => tracing::warn!(id = %id.short(), error = %e, "could not remove half-created container"),
    }
}
