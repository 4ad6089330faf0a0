//! Deployment client.

use mongodock_common::config::ClientConfig;
use mongodock_common::error::Result;
use mongodock_common::options::{CreateDeploymentOptions, GetConnectionStringOptions};
use mongodock_common::types::{ContainerId, Deployment};
use mongodock_runtime::engine::Engine;
use mongodock_runtime::gateway::{DockerGateway, RuntimeGateway};
use mongodock_runtime::ports::PortAllocator;

/// Handle for managing MongoDB deployments.
///
/// A client is `Send + Sync`; share it across tasks behind an `Arc`.
#[derive(Debug)]
pub struct Client<G = DockerGateway> {
    engine: Engine<G>,
}

impl Client<DockerGateway> {
    /// Connects to Docker using the configuration from the environment.
    ///
    /// # Errors
    ///
    /// Returns `RuntimeUnavailable` (displayed as `connect to docker`) if the
    /// daemon cannot be reached, or a `Config` error for malformed
    /// environment overrides.
    pub async fn connect() -> Result<Self> {
        Self::connect_with_config(ClientConfig::from_env()?).await
    }

    /// Connects to Docker with an explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns `RuntimeUnavailable` if the daemon cannot be reached, or a
    /// `Config` error if `config` is invalid.
    pub async fn connect_with_config(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let gateway = DockerGateway::connect(config.docker_host.as_deref()).await?;
        tracing::info!(
            image = %config.image,
            ports = %format!("{}-{}", config.port_range_start, config.port_range_end),
            "client ready"
        );
        Ok(Self::with_gateway(gateway, config))
    }
}

impl<G> Client<G>
where
    G: RuntimeGateway + 'static,
{
    /// Builds a client over any runtime gateway.
    #[must_use]
    pub fn with_gateway(gateway: G, config: ClientConfig) -> Self {
        Self {
            engine: Engine::new(gateway, config),
        }
    }

    /// Replaces the host port allocator.
    #[must_use]
    pub fn with_allocator(self, allocator: PortAllocator) -> Self {
        Self {
            engine: self.engine.with_allocator(allocator),
        }
    }

    /// Returns the runtime gateway.
    #[must_use]
    pub fn gateway(&self) -> &G {
        self.engine.gateway()
    }

    /// Returns the active configuration.
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        self.engine.config()
    }

    /// Lists every live deployment, sorted by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the runtime cannot be queried.
    pub async fn list_deployments(&self) -> Result<Vec<Deployment>> {
        self.engine.list_deployments().await
    }

    /// Creates and starts a deployment.
    ///
    /// # Errors
    ///
    /// Returns `NameConflict` if the name is live, a port error if no port
    /// can be published, or the runtime error that stopped creation.
    pub async fn create_deployment(&self, options: &CreateDeploymentOptions) -> Result<Deployment> {
        self.engine.create_deployment(options).await
    }

    /// Returns the deployment called `name`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no live deployment has that name.
    pub async fn get_deployment(&self, name: &str) -> Result<Deployment> {
        self.engine.get_deployment(name).await
    }

    /// Returns the container id backing `name`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no live deployment has that name.
    pub async fn get_deployment_id(&self, name: &str) -> Result<ContainerId> {
        self.engine.get_deployment_id(name).await
    }

    /// Returns `mongodb://<user>:<password>@127.0.0.1:<port>/?directConnection=true`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no live deployment has that name.
    pub async fn get_connection_string(&self, name: &str) -> Result<String> {
        self.engine.get_connection_string(name).await
    }

    /// Returns a connection string with credential overrides and optional
    /// reachability check.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if nothing matches, or `Unreachable` if
    /// verification fails.
    pub async fn get_connection_string_with(
        &self,
        options: &GetConnectionStringOptions,
    ) -> Result<String> {
        self.engine.get_connection_string_with(options).await
    }

    /// Stops and removes a deployment. Absent names succeed.
    ///
    /// # Errors
    ///
    /// Returns an error if the runtime fails to stop or remove the container.
    pub async fn delete_deployment(&self, name: &str) -> Result<()> {
        self.engine.delete_deployment(name).await
    }
}
