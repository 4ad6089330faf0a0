//! Translation of creation options into a container spec.

use std::collections::BTreeMap;

use mongodock_common::config::ClientConfig;
use mongodock_common::constants::{
    LABEL_CREATION_SOURCE, LABEL_MONGODB_TYPE, LABEL_NAME, LABEL_VERSION, MONGODB_CONTAINER_PORT,
    SEED_MOUNT_PATH, env,
};
use mongodock_common::options::CreateDeploymentOptions;
use mongodock_common::types::{BindingType, MongodbType, PortBinding};

use crate::gateway::{ContainerSpec, PublishedPort};

/// Infers the MongoDB edition from an image reference.
#[must_use]
pub fn mongodb_type_for_image(image: &str) -> MongodbType {
    if image.to_ascii_lowercase().contains("enterprise") {
        MongodbType::Enterprise
    } else {
        MongodbType::Community
    }
}

/// Builds the container spec for a deployment published on `binding`.
///
/// Default credentials from `config` are used unless the options set a
/// username or password (directly or through a file).
#[must_use]
pub fn build_container_spec(
    name: &str,
    options: &CreateDeploymentOptions,
    config: &ClientConfig,
    binding: &PortBinding,
) -> ContainerSpec {
    let image = options.image_reference(&config.image);

    let mut vars: Vec<(&str, String)> = Vec::new();
    let mut push = |key: &'static str, value: Option<String>| {
        if let Some(value) = value {
            vars.push((key, value));
        }
    };

    let username = match (
        &options.mongodb_initdb_root_username,
        &options.mongodb_initdb_root_username_file,
    ) {
        (Some(username), _) => Some(username.clone()),
        (None, Some(_)) => None,
        (None, None) => Some(config.default_username.clone()),
    };
    let password = match (
        &options.mongodb_initdb_root_password,
        &options.mongodb_initdb_root_password_file,
    ) {
        (Some(password), _) => Some(password.clone()),
        (None, Some(_)) => None,
        (None, None) => Some(config.default_password.clone()),
    };

    push(env::INITDB_ROOT_USERNAME, username);
    push(
        env::INITDB_ROOT_USERNAME_FILE,
        options.mongodb_initdb_root_username_file.clone(),
    );
    push(env::INITDB_ROOT_PASSWORD, password);
    push(
        env::INITDB_ROOT_PASSWORD_FILE,
        options.mongodb_initdb_root_password_file.clone(),
    );
    push(env::INITDB_DATABASE, options.mongodb_initdb_database.clone());
    push(
        env::LOAD_SAMPLE_DATA,
        options.load_sample_data.map(|load| load.to_string()),
    );
    push(env::VOYAGE_API_KEY, options.voyage_api_key.clone());
    push(env::MONGOT_LOG_FILE, options.mongot_log_file.clone());
    push(env::RUNNER_LOG_FILE, options.runner_log_file.clone());
    push(
        env::DO_NOT_TRACK,
        options.do_not_track.map(|dnt| dnt.to_string()),
    );
    push(env::TELEMETRY_BASE_URL, options.telemetry_base_url.clone());
    push(
        env::TOOL,
        options
            .creation_source
            .as_ref()
            .map(|source| source.as_label().to_string()),
    );

    let mut labels = BTreeMap::from([
        (config.managed_label.clone(), "true".to_string()),
        (LABEL_NAME.to_string(), name.to_string()),
        (LABEL_VERSION.to_string(), options.version_label()),
        (
            LABEL_MONGODB_TYPE.to_string(),
            mongodb_type_for_image(&image).to_string(),
        ),
    ]);
    if let Some(source) = &options.creation_source {
        let _ = labels.insert(
            LABEL_CREATION_SOURCE.to_string(),
            source.as_label().to_string(),
        );
    }

    let binds = options
        .local_seed_location
        .iter()
        .map(|location| format!("{location}:{SEED_MOUNT_PATH}"))
        .collect();

    ContainerSpec {
        name: name.to_string(),
        image,
        env: vars
            .into_iter()
            .map(|(key, value)| (key.to_string(), value))
            .collect(),
        labels,
        ports: vec![PublishedPort {
            container_port: MONGODB_CONTAINER_PORT,
            host_ip: binding.ip.clone(),
            host_port: binding.port,
        }],
        binds,
    }
}

/// Returns the binding type the caller asked for, loopback by default.
#[must_use]
pub fn requested_binding_type(options: &CreateDeploymentOptions) -> BindingType {
    options
        .mongodb_port_binding
        .as_ref()
        .map_or(BindingType::Loopback, |binding| binding.binding_type.clone())
}
