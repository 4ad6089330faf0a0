//! Fluent API for describing a deployment before creating it.

use std::time::Duration;

use mongodock_common::error::Result;
use mongodock_common::options::{CreateDeploymentOptions, RequestedPortBinding, validate_name};
use mongodock_common::types::{BindingType, CreationSource, MongoDbVersion};

/// Builder for [`CreateDeploymentOptions`].
#[derive(Debug, Default)]
pub struct DeploymentBuilder {
    options: CreateDeploymentOptions,
    version: Option<String>,
}

impl DeploymentBuilder {
    /// Creates a builder for a deployment with the given name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            options: CreateDeploymentOptions::named(name),
            version: None,
        }
    }

    /// Creates a builder whose deployment name is generated on creation.
    #[must_use]
    pub fn unnamed() -> Self {
        Self::default()
    }

    /// Sets the image repository.
    #[must_use]
    pub fn image(mut self, image: impl Into<String>) -> Self {
        self.options.image = Some(image.into());
        self
    }

    /// Sets the MongoDB version, e.g. `8`, `8.0` or `8.0.4`.
    #[must_use]
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Uses the local image without pulling.
    #[must_use]
    pub const fn skip_pull_image(mut self, skip: bool) -> Self {
        self.options.skip_pull_image = Some(skip);
        self
    }

    /// Blocks creation until the deployment is healthy, for at most `timeout`.
    #[must_use]
    pub const fn wait_until_healthy(mut self, timeout: Duration) -> Self {
        self.options.wait_until_healthy = Some(true);
        self.options.wait_until_healthy_timeout = Some(timeout);
        self
    }

    /// Sets the root credentials.
    #[must_use]
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.options.mongodb_initdb_root_username = Some(username.into());
        self.options.mongodb_initdb_root_password = Some(password.into());
        self
    }

    /// Reads the root credentials from files inside the container.
    #[must_use]
    pub fn credential_files(
        mut self,
        username_file: impl Into<String>,
        password_file: impl Into<String>,
    ) -> Self {
        self.options.mongodb_initdb_root_username_file = Some(username_file.into());
        self.options.mongodb_initdb_root_password_file = Some(password_file.into());
        self
    }

    /// Sets the initial database.
    #[must_use]
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.options.mongodb_initdb_database = Some(database.into());
        self
    }

    /// Publishes on a fixed host port instead of an allocated one.
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.options
            .mongodb_port_binding
            .get_or_insert_with(RequestedPortBinding::default)
            .port = Some(port);
        self
    }

    /// Chooses the host interface to publish on.
    #[must_use]
    pub fn binding(mut self, binding_type: BindingType) -> Self {
        self.options
            .mongodb_port_binding
            .get_or_insert_with(RequestedPortBinding::default)
            .binding_type = binding_type;
        self
    }

    /// Mounts a host directory of seed scripts.
    #[must_use]
    pub fn seed_location(mut self, path: impl Into<String>) -> Self {
        self.options.local_seed_location = Some(path.into());
        self
    }

    /// Loads the sample datasets on first start.
    #[must_use]
    pub const fn load_sample_data(mut self, load: bool) -> Self {
        self.options.load_sample_data = Some(load);
        self
    }

    /// Records who created the deployment.
    #[must_use]
    pub fn creation_source(mut self, source: CreationSource) -> Self {
        self.options.creation_source = Some(source);
        self
    }

    /// Sets the Voyage AI key used for vector search.
    #[must_use]
    pub fn voyage_api_key(mut self, key: impl Into<String>) -> Self {
        self.options.voyage_api_key = Some(key.into());
        self
    }

    /// Sets the telemetry opt-out.
    #[must_use]
    pub const fn do_not_track(mut self, do_not_track: bool) -> Self {
        self.options.do_not_track = Some(do_not_track);
        self
    }

    /// Builds the creation options.
    ///
    /// # Errors
    ///
    /// Returns a `Config` error if the name or version is malformed.
    pub fn build(self) -> Result<CreateDeploymentOptions> {
        let mut options = self.options;
        if let Some(name) = &options.name {
            validate_name(name)?;
        }
        if let Some(version) = self.version {
            options.mongodb_version = Some(version.parse::<MongoDbVersion>()?);
        }
        Ok(options)
    }
}
