//! Caller-facing option structs for creating and connecting to deployments.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_IMAGE_TAG, GENERATED_NAME_PREFIX};
use crate::error::{MongodockError, Result};
use crate::types::{BindingType, CreationSource, MongoDbVersion};

/// Requested publication of the MongoDB port.
///
/// `port: None` lets the allocator pick a free host port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestedPortBinding {
    /// Interface to publish on.
    pub binding_type: BindingType,
    /// Host port, or `None` to allocate one.
    pub port: Option<u16>,
}

impl Default for RequestedPortBinding {
    fn default() -> Self {
        Self {
            binding_type: BindingType::Loopback,
            port: None,
        }
    }
}

/// Options accepted by `create_deployment`. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateDeploymentOptions {
    /// Deployment name; generated when absent.
    pub name: Option<String>,

    /// Image repository, overriding the configured default.
    pub image: Option<String>,
    /// Use the local image without pulling.
    pub skip_pull_image: Option<bool>,
    /// MongoDB version, used as the image tag.
    pub mongodb_version: Option<MongoDbVersion>,

    /// Block until the container reports healthy.
    pub wait_until_healthy: Option<bool>,
    /// Deadline for `wait_until_healthy`.
    pub wait_until_healthy_timeout: Option<Duration>,
    /// Who is creating the deployment.
    pub creation_source: Option<CreationSource>,

    /// Host directory with seed scripts.
    pub local_seed_location: Option<String>,
    /// Load the sample datasets on first start.
    pub load_sample_data: Option<bool>,
    /// Initial database.
    pub mongodb_initdb_database: Option<String>,
    /// File containing the root password.
    pub mongodb_initdb_root_password_file: Option<String>,
    /// Root password.
    pub mongodb_initdb_root_password: Option<String>,
    /// File containing the root username.
    pub mongodb_initdb_root_username_file: Option<String>,
    /// Root username.
    pub mongodb_initdb_root_username: Option<String>,
    /// Voyage AI key.
    pub voyage_api_key: Option<String>,

    /// Log file for `mongot`.
    pub mongot_log_file: Option<String>,
    /// Log file for the runner.
    pub runner_log_file: Option<String>,

    /// Telemetry opt-out.
    pub do_not_track: Option<bool>,
    /// Telemetry endpoint.
    pub telemetry_base_url: Option<String>,

    /// Port publication.
    pub mongodb_port_binding: Option<RequestedPortBinding>,
}

impl CreateDeploymentOptions {
    /// Options for a deployment with the given name and defaults otherwise.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Returns the deployment name, generating one if none was given.
    ///
    /// # Errors
    ///
    /// Returns an error if the given name is not a valid container name.
    pub fn resolve_name(&self) -> Result<String> {
        match &self.name {
            Some(name) => {
                validate_name(name)?;
                Ok(name.clone())
            }
            None => Ok(generate_name()),
        }
    }

    /// Returns the full image reference to create the container from.
    ///
    /// An explicit `mongodb_version` wins over a tag embedded in `image`.
    #[must_use]
    pub fn image_reference(&self, default_image: &str) -> String {
        let image = self.image.as_deref().unwrap_or(default_image);
        let (repository, tag) = split_image_tag(image);
        let tag = self
            .mongodb_version
            .map(|version| version.image_tag())
            .or_else(|| tag.map(str::to_string))
            .unwrap_or_else(|| DEFAULT_IMAGE_TAG.to_string());
        format!("{repository}:{tag}")
    }

    /// Returns the version label recorded on the container.
    #[must_use]
    pub fn version_label(&self) -> String {
        self.mongodb_version.unwrap_or_default().to_string()
    }
}

/// Splits `repo[:tag]`, ignoring colons that belong to a registry port.
fn split_image_tag(image: &str) -> (&str, Option<&str>) {
    match image.rsplit_once(':') {
        Some((repository, tag)) if !tag.contains('/') => (repository, Some(tag)),
        _ => (image, None),
    }
}

/// Checks a deployment name against Docker's container name rules.
///
/// # Errors
///
/// Returns an error if the name is empty or contains characters outside
/// `[a-zA-Z0-9_.-]`, or does not start with an alphanumeric character.
pub fn validate_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid_start = chars.next().is_some_and(|c| c.is_ascii_alphanumeric());
    let valid_rest = chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'));
    if valid_start && valid_rest {
        Ok(())
    } else {
        Err(MongodockError::Config {
            message: format!(
                "invalid deployment name {name:?}: use letters, digits, '_', '.' or '-' and start with a letter or digit"
            ),
        })
    }
}

fn generate_name() -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("{GENERATED_NAME_PREFIX}{}", &suffix[..8])
}

/// Options accepted by `get_connection_string_with`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GetConnectionStringOptions {
    /// Deployment name or backing container id.
    pub container_id_or_name: String,
    /// Username override.
    pub db_username: Option<String>,
    /// Password override.
    pub db_password: Option<String>,
    /// Probe the port before returning.
    pub verify: Option<bool>,
}

impl GetConnectionStringOptions {
    /// Options that look up `container_id_or_name` with stored credentials.
    #[must_use]
    pub fn new(container_id_or_name: impl Into<String>) -> Self {
        Self {
            container_id_or_name: container_id_or_name.into(),
            ..Self::default()
        }
    }
}
