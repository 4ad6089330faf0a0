//! System-wide constants and defaults.

/// Default image used for new deployments.
pub const DEFAULT_IMAGE: &str = "mongodb/mongodb-atlas-local";

/// Tag used when neither the image nor the options pin a version.
pub const DEFAULT_IMAGE_TAG: &str = "latest";

/// Port `mongod` listens on inside the container.
pub const MONGODB_CONTAINER_PORT: u16 = 27017;

/// Default root username baked into new deployments.
pub const DEFAULT_USERNAME: &str = "user";

/// Default root password baked into new deployments.
pub const DEFAULT_PASSWORD: &str = "password";

/// First host port considered by the allocator.
pub const DEFAULT_PORT_RANGE_START: u16 = 27017;

/// Last host port considered by the allocator.
pub const DEFAULT_PORT_RANGE_END: u16 = 27999;

/// Loopback address the published ports are bound to.
pub const LOOPBACK_IP: &str = "127.0.0.1";

/// Unspecified address used for `AnyInterface` bindings.
pub const ANY_INTERFACE_IP: &str = "0.0.0.0";

/// Seconds Docker waits for `mongod` to exit before killing it.
pub const DEFAULT_STOP_TIMEOUT_SECS: u32 = 10;

/// Interval between health probes while waiting for a deployment.
pub const DEFAULT_HEALTH_POLL_INTERVAL_MS: u64 = 500;

/// Default deadline for a deployment to report healthy.
pub const DEFAULT_HEALTH_TIMEOUT_SECS: u64 = 60;

/// Label marking containers managed by this crate.
pub const LABEL_MANAGED: &str = "mongodock.managed";

/// Label carrying the logical deployment name.
pub const LABEL_NAME: &str = "mongodock.name";

/// Label carrying the requested MongoDB version.
pub const LABEL_VERSION: &str = "mongodock.version";

/// Label carrying the MongoDB edition.
pub const LABEL_MONGODB_TYPE: &str = "mongodock.mongodb-type";

/// Label recording who created the deployment.
pub const LABEL_CREATION_SOURCE: &str = "mongodock.creation-source";

/// Mount point for seed scripts inside the container.
pub const SEED_MOUNT_PATH: &str = "/docker-entrypoint-initdb.d";

/// Environment variable names understood by the MongoDB image.
pub mod env {
    /// Initial database.
    pub const INITDB_DATABASE: &str = "MONGODB_INITDB_DATABASE";
    /// Root username.
    pub const INITDB_ROOT_USERNAME: &str = "MONGODB_INITDB_ROOT_USERNAME";
    /// File containing the root username.
    pub const INITDB_ROOT_USERNAME_FILE: &str = "MONGODB_INITDB_ROOT_USERNAME_FILE";
    /// Root password.
    pub const INITDB_ROOT_PASSWORD: &str = "MONGODB_INITDB_ROOT_PASSWORD";
    /// File containing the root password.
    pub const INITDB_ROOT_PASSWORD_FILE: &str = "MONGODB_INITDB_ROOT_PASSWORD_FILE";
    /// Load the sample datasets on first start.
    pub const LOAD_SAMPLE_DATA: &str = "MONGODB_LOAD_SAMPLE_DATA";
    /// Voyage AI key for automated embeddings.
    pub const VOYAGE_API_KEY: &str = "VOYAGE_API_KEY";
    /// Log file for `mongot`.
    pub const MONGOT_LOG_FILE: &str = "MONGOT_LOG_FILE";
    /// Log file for the runner.
    pub const RUNNER_LOG_FILE: &str = "RUNNER_LOG_FILE";
    /// Telemetry opt-out.
    pub const DO_NOT_TRACK: &str = "DO_NOT_TRACK";
    /// Telemetry endpoint.
    pub const TELEMETRY_BASE_URL: &str = "TELEMETRY_BASE_URL";
    /// Tool that created the container.
    pub const TOOL: &str = "TOOL";
}

/// Environment variables read by [`crate::config::ClientConfig::from_env`].
pub mod config_env {
    /// Docker daemon address.
    pub const DOCKER_HOST: &str = "DOCKER_HOST";
    /// Image override.
    pub const IMAGE: &str = "MONGODOCK_IMAGE";
    /// Port range override, formatted `start-end`.
    pub const PORT_RANGE: &str = "MONGODOCK_PORT_RANGE";
}

/// Prefix of generated deployment names.
pub const GENERATED_NAME_PREFIX: &str = "local";
