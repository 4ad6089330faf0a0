//! Deployment registry.
//!
//! The set of deployments is a projection over the runtime: every read
//! lists the containers carrying the managed label and inspects each one.
//! Nothing is cached in process.

use std::collections::{BTreeSet, HashSet};

use chrono::{DateTime, Utc};
use mongodock_common::constants::{
    LABEL_CREATION_SOURCE, LABEL_MONGODB_TYPE, LABEL_NAME, LABEL_VERSION, MONGODB_CONTAINER_PORT,
    SEED_MOUNT_PATH, env,
};
use mongodock_common::error::Result;
use mongodock_common::types::{BindingType, CreationSource, Deployment, PortBinding};

use crate::gateway::{ContainerDetails, RuntimeGateway};
use crate::spec::mongodb_type_for_image;

/// Lists every managed deployment, sorted by name.
///
/// Containers removed between the listing and their inspection are
/// skipped; each container appears at most once.
///
/// # Errors
///
/// Returns an error if listing or inspecting fails for another reason.
pub async fn list<G>(gateway: &G, label: &str) -> Result<Vec<Deployment>>
where
    G: RuntimeGateway + ?Sized,
{
    let summaries = gateway.list_containers(label).await?;
    let mut seen = HashSet::new();
    let mut deployments = Vec::with_capacity(summaries.len());

    for summary in summaries {
        if !seen.insert(summary.id.clone()) {
            continue;
        }
        match gateway.inspect_container(&summary.id).await {
            Ok(details) => deployments.push(deployment_from_details(details)),
            Err(e) if e.is_not_found() => {
                tracing::debug!(id = %summary.id, "container vanished while listing");
            }
            Err(e) => return Err(e),
        }
    }

    deployments.sort_by(|a, b| a.name.cmp(&b.name));
    tracing::debug!(count = deployments.len(), "listed deployments");
    Ok(deployments)
}

/// Finds the live deployment called `name`.
///
/// # Errors
///
/// Returns an error if the runtime cannot be queried.
pub async fn find<G>(gateway: &G, label: &str, name: &str) -> Result<Option<Deployment>>
where
    G: RuntimeGateway + ?Sized,
{
    Ok(list(gateway, label)
        .await?
        .into_iter()
        .find(|deployment| deployment.name == name))
}

/// Finds a deployment by name, full container id, or id prefix.
///
/// Names win over id prefixes.
///
/// # Errors
///
/// Returns an error if the runtime cannot be queried.
pub async fn find_by_name_or_id<G>(
    gateway: &G,
    label: &str,
    name_or_id: &str,
) -> Result<Option<Deployment>>
where
    G: RuntimeGateway + ?Sized,
{
    let deployments = list(gateway, label).await?;
    if let Some(index) = deployments.iter().position(|d| d.name == name_or_id) {
        return Ok(deployments.into_iter().nth(index));
    }
    if name_or_id.is_empty() {
        return Ok(None);
    }
    Ok(deployments
        .into_iter()
        .find(|d| d.container_id.as_str().starts_with(name_or_id)))
}

/// Host ports published by managed containers, started or not.
///
/// # Errors
///
/// Returns an error if the runtime cannot be queried.
pub async fn bound_ports<G>(gateway: &G, label: &str) -> Result<BTreeSet<u16>>
where
    G: RuntimeGateway + ?Sized,
{
    Ok(list(gateway, label)
        .await?
        .iter()
        .filter_map(Deployment::port)
        .collect())
}

/// Maps an inspected container to a deployment.
#[must_use]
pub fn deployment_from_details(details: ContainerDetails) -> Deployment {
    let name = details
        .labels
        .get(LABEL_NAME)
        .cloned()
        .unwrap_or_else(|| details.name.clone());

    let port_bindings = details
        .ports
        .iter()
        .find(|p| p.container_port == MONGODB_CONTAINER_PORT)
        .map(|p| {
            let binding_type = BindingType::from_host_ip(&p.host_ip);
            PortBinding {
                ip: binding_type.host_ip(),
                binding_type,
                port: p.host_port,
            }
        });

    let mongodb_type = details
        .labels
        .get(LABEL_MONGODB_TYPE)
        .and_then(|t| t.parse().ok())
        .unwrap_or_else(|| mongodb_type_for_image(details.image.as_deref().unwrap_or_default()));

    let local_seed_location = details.binds.iter().find_map(|bind| {
        let (host, rest) = bind.split_once(':')?;
        rest.starts_with(SEED_MOUNT_PATH).then(|| host.to_string())
    });

    let var = |key: &str| details.env_var(key).map(str::to_string);

    Deployment {
        name,
        state: details.state,
        port_bindings,
        mongodb_type,
        mongodb_version: details
            .labels
            .get(LABEL_VERSION)
            .cloned()
            .unwrap_or_else(|| "unknown".to_string()),
        created_at: details
            .created_at
            .as_deref()
            .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
            .map(|ts| ts.with_timezone(&Utc)),
        creation_source: details
            .labels
            .get(LABEL_CREATION_SOURCE)
            .map(|source| CreationSource::from_label(source)),
        local_seed_location,
        mongodb_initdb_database: var(env::INITDB_DATABASE),
        mongodb_initdb_root_password_file: var(env::INITDB_ROOT_PASSWORD_FILE),
        mongodb_initdb_root_password: var(env::INITDB_ROOT_PASSWORD),
        mongodb_initdb_root_username_file: var(env::INITDB_ROOT_USERNAME_FILE),
        mongodb_initdb_root_username: var(env::INITDB_ROOT_USERNAME),
        mongot_log_file: var(env::MONGOT_LOG_FILE),
        runner_log_file: var(env::RUNNER_LOG_FILE),
        do_not_track: var(env::DO_NOT_TRACK),
        telemetry_base_url: var(env::TELEMETRY_BASE_URL),
        image: details.image.clone(),
        container_id: details.id,
    }
}
