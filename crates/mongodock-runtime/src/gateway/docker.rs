//! Docker Engine gateway built on `bollard`.

use std::collections::HashMap;

use async_trait::async_trait;
use bollard::container::{
    Config, CreateContainerOptions, InspectContainerOptions, ListContainersOptions,
    RemoveContainerOptions, StartContainerOptions, StopContainerOptions,
};
use bollard::errors::Error as DockerError;
use bollard::image::CreateImageOptions;
use bollard::models::{
    ContainerInspectResponse, ContainerStateStatusEnum, HealthStatusEnum, HostConfig, PortBinding,
};
use bollard::{API_DEFAULT_VERSION, Docker};
use futures::TryStreamExt;
use mongodock_common::error::{MongodockError, Result};
use mongodock_common::types::{ContainerId, State};

use super::{
    ContainerDetails, ContainerSpec, ContainerSummary, HealthStatus, PublishedPort,
    RuntimeGateway, parse_env,
};

/// Seconds the HTTP client waits for a daemon response.
const CLIENT_TIMEOUT_SECS: u64 = 120;

/// Gateway talking to a Docker daemon.
#[derive(Debug, Clone)]
pub struct DockerGateway {
    docker: Docker,
}

impl DockerGateway {
    /// Connects to the daemon and verifies that it answers.
    ///
    /// `docker_host` accepts `unix://`, `tcp://` and `http://` addresses;
    /// `None` uses the platform defaults (honouring `DOCKER_HOST`).
    ///
    /// # Errors
    ///
    /// Returns `RuntimeUnavailable` if the client cannot be built or the
    /// daemon does not answer a ping.
    pub async fn connect(docker_host: Option<&str>) -> Result<Self> {
        let docker = match docker_host {
            Some(host) => connect_with_host(host),
            None => Docker::connect_with_defaults(),
        }
        .map_err(|e| MongodockError::RuntimeUnavailable {
            source: Box::new(e),
        })?;

        let gateway = Self { docker };
        gateway.ping().await?;
        tracing::debug!(host = docker_host.unwrap_or("default"), "connected to docker");
        Ok(gateway)
    }
}

fn connect_with_host(host: &str) -> std::result::Result<Docker, DockerError> {
    if let Some(path) = host.strip_prefix("unix://") {
        Docker::connect_with_socket(path, CLIENT_TIMEOUT_SECS, API_DEFAULT_VERSION)
    } else {
        Docker::connect_with_http(host, CLIENT_TIMEOUT_SECS, API_DEFAULT_VERSION)
    }
}

/// Maps a daemon error, turning 404 into `NotFound`.
fn map_error(operation: &'static str, id: &str, err: DockerError) -> MongodockError {
    match err {
        DockerError::DockerResponseServerError {
            status_code: 404, ..
        } => MongodockError::NotFound {
            kind: "container",
            id: id.to_string(),
        },
        other => MongodockError::runtime(operation, other),
    }
}

fn split_reference(image: &str) -> (&str, &str) {
    match image.rsplit_once(':') {
        Some((repository, tag)) if !tag.contains('/') => (repository, tag),
        _ => (image, mongodock_common::constants::DEFAULT_IMAGE_TAG),
    }
}

fn port_key(container_port: u16) -> String {
    format!("{container_port}/tcp")
}

fn container_config(spec: &ContainerSpec) -> Config<String> {
    let mut exposed_ports = HashMap::new();
    let mut port_bindings = HashMap::new();
    for port in &spec.ports {
        let key = port_key(port.container_port);
        let _ = exposed_ports.insert(key.clone(), HashMap::new());
        let _ = port_bindings.insert(
            key,
            Some(vec![PortBinding {
                host_ip: Some(port.host_ip.clone()),
                host_port: Some(port.host_port.to_string()),
            }]),
        );
    }

    Config {
        image: Some(spec.image.clone()),
        env: Some(spec.env.iter().map(|(k, v)| format!("{k}={v}")).collect()),
        labels: Some(spec.labels.clone().into_iter().collect()),
        exposed_ports: Some(exposed_ports),
        host_config: Some(HostConfig {
            port_bindings: Some(port_bindings),
            binds: (!spec.binds.is_empty()).then(|| spec.binds.clone()),
            ..HostConfig::default()
        }),
        ..Config::default()
    }
}

const fn map_state(status: Option<ContainerStateStatusEnum>) -> State {
    match status {
        Some(ContainerStateStatusEnum::RUNNING) => State::Running,
        Some(ContainerStateStatusEnum::PAUSED) => State::Paused,
        Some(ContainerStateStatusEnum::RESTARTING) => State::Restarting,
        Some(ContainerStateStatusEnum::REMOVING) => State::Removing,
        Some(ContainerStateStatusEnum::EXITED) => State::Exited,
        Some(ContainerStateStatusEnum::DEAD) => State::Dead,
        Some(ContainerStateStatusEnum::CREATED | ContainerStateStatusEnum::EMPTY) | None => {
            State::Created
        }
    }
}

const fn map_health(status: Option<HealthStatusEnum>) -> HealthStatus {
    match status {
        Some(HealthStatusEnum::STARTING) => HealthStatus::Starting,
        Some(HealthStatusEnum::HEALTHY) => HealthStatus::Healthy,
        Some(HealthStatusEnum::UNHEALTHY) => HealthStatus::Unhealthy,
        Some(HealthStatusEnum::NONE | HealthStatusEnum::EMPTY) | None => HealthStatus::None,
    }
}

fn published_ports(host_config: Option<&HostConfig>) -> Vec<PublishedPort> {
    let Some(bindings) = host_config.and_then(|hc| hc.port_bindings.as_ref()) else {
        return Vec::new();
    };
    let mut ports = Vec::new();
    for (key, host_bindings) in bindings {
        let Some(container_port) = key.split('/').next().and_then(|p| p.parse().ok()) else {
            continue;
        };
        for binding in host_bindings.iter().flatten() {
            let Some(host_port) = binding.host_port.as_deref().and_then(|p| p.parse().ok()) else {
                continue;
            };
            ports.push(PublishedPort {
                container_port,
                host_ip: binding.host_ip.clone().unwrap_or_default(),
                host_port,
            });
        }
    }
    ports.sort_by_key(|p| (p.container_port, p.host_port));
    ports
}

fn details_from_inspect(response: ContainerInspectResponse) -> ContainerDetails {
    let config = response.config.unwrap_or_default();
    let state = response.state.unwrap_or_default();
    ContainerDetails {
        id: ContainerId::new(response.id.unwrap_or_default()),
        name: response
            .name
            .unwrap_or_default()
            .trim_start_matches('/')
            .to_string(),
        image: config.image,
        labels: config.labels.unwrap_or_default().into_iter().collect(),
        env: parse_env(&config.env.unwrap_or_default()),
        state: map_state(state.status),
        health: map_health(state.health.and_then(|h| h.status)),
        ports: published_ports(response.host_config.as_ref()),
        binds: response
            .host_config
            .and_then(|hc| hc.binds)
            .unwrap_or_default(),
        created_at: response.created,
    }
}

#[async_trait]
impl RuntimeGateway for DockerGateway {
    async fn ping(&self) -> Result<()> {
        let _ = self
            .docker
            .ping()
            .await
            .map_err(|e| MongodockError::RuntimeUnavailable {
                source: Box::new(e),
            })?;
        Ok(())
    }

    async fn pull_image(&self, image: &str) -> Result<()> {
        let (repository, tag) = split_reference(image);
        tracing::info!(image, "pulling image");
        let options = CreateImageOptions {
            from_image: repository.to_string(),
            tag: tag.to_string(),
            ..CreateImageOptions::default()
        };
        let _ = self
            .docker
            .create_image(Some(options), None, None)
            .try_collect::<Vec<_>>()
            .await
            .map_err(|e| MongodockError::runtime("pull image", e))?;
        Ok(())
    }

    async fn list_containers(&self, label: &str) -> Result<Vec<ContainerSummary>> {
        let filters = HashMap::from([("label".to_string(), vec![label.to_string()])]);
        let options = ListContainersOptions {
            all: true,
            filters,
            ..ListContainersOptions::default()
        };
        let summaries = self
            .docker
            .list_containers(Some(options))
            .await
            .map_err(|e| MongodockError::runtime("list containers", e))?;

        Ok(summaries
            .into_iter()
            .filter_map(|summary| summary.id)
            .map(|id| ContainerSummary {
                id: ContainerId::new(id),
            })
            .collect())
    }

    async fn create_container(&self, spec: &ContainerSpec) -> Result<ContainerId> {
        let options = CreateContainerOptions {
            name: spec.name.clone(),
            platform: None,
        };
        let response = self
            .docker
            .create_container(Some(options), container_config(spec))
            .await
            .map_err(|e| MongodockError::runtime("create container", e))?;
        for warning in &response.warnings {
            tracing::warn!(name = %spec.name, warning = %warning, "docker warning on create");
        }
        Ok(ContainerId::new(response.id))
    }

    async fn start_container(&self, id: &ContainerId) -> Result<()> {
        self.docker
            .start_container(id.as_str(), None::<StartContainerOptions<String>>)
            .await
            .map_err(|e| map_error("start container", id.as_str(), e))
    }

    async fn stop_container(&self, id: &ContainerId, timeout_secs: u32) -> Result<()> {
        let options = StopContainerOptions {
            t: i64::from(timeout_secs),
        };
        match self.docker.stop_container(id.as_str(), Some(options)).await {
            // 304: already stopped
            Ok(())
            | Err(DockerError::DockerResponseServerError {
                status_code: 304, ..
            }) => Ok(()),
            Err(e) => Err(map_error("stop container", id.as_str(), e)),
        }
    }

    async fn remove_container(&self, id: &ContainerId) -> Result<()> {
        let options = RemoveContainerOptions {
            force: true,
            v: true,
            ..RemoveContainerOptions::default()
        };
        self.docker
            .remove_container(id.as_str(), Some(options))
            .await
            .map_err(|e| map_error("remove container", id.as_str(), e))
    }

    async fn inspect_container(&self, id: &ContainerId) -> Result<ContainerDetails> {
        let response = self
            .docker
            .inspect_container(id.as_str(), None::<InspectContainerOptions>)
            .await
            .map_err(|e| map_error("inspect container", id.as_str(), e))?;
        Ok(details_from_inspect(response))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use bollard::models::{ContainerConfig, ContainerState, Health};

    use super::*;

    fn spec() -> ContainerSpec {
        ContainerSpec {
            name: "test_deployment".into(),
            image: "mongodb/mongodb-atlas-local:latest".into(),
            env: vec![("MONGODB_INITDB_ROOT_USERNAME".into(), "user".into())],
            labels: BTreeMap::from([("mongodock.managed".into(), "true".into())]),
            ports: vec![PublishedPort {
                container_port: 27017,
                host_ip: "127.0.0.1".into(),
                host_port: 27018,
            }],
            binds: Vec::new(),
        }
    }

    #[test]
    fn config_publishes_port_on_host_ip() {
        let config = container_config(&spec());
        let host_config = config.host_config.expect("host config");
        let bindings = host_config.port_bindings.expect("port bindings");
        let binding = bindings["27017/tcp"].as_ref().expect("binding list")[0].clone();
        assert_eq!(binding.host_ip.as_deref(), Some("127.0.0.1"));
        assert_eq!(binding.host_port.as_deref(), Some("27018"));
        assert!(config.exposed_ports.expect("exposed").contains_key("27017/tcp"));
        assert!(host_config.binds.is_none());
    }

    #[test]
    fn config_encodes_env_as_key_value() {
        let config = container_config(&spec());
        assert_eq!(
            config.env.expect("env"),
            vec!["MONGODB_INITDB_ROOT_USERNAME=user".to_string()]
        );
    }

    #[test]
    fn inspect_response_maps_to_details() {
        let mut port_map = HashMap::new();
        let _ = port_map.insert(
            "27017/tcp".to_string(),
            Some(vec![PortBinding {
                host_ip: Some("127.0.0.1".into()),
                host_port: Some("27020".into()),
            }]),
        );
        let response = ContainerInspectResponse {
            id: Some("abc123".into()),
            name: Some("/test_deployment".into()),
            created: Some("2026-10-18T10:00:00Z".into()),
            config: Some(ContainerConfig {
                image: Some("mongodb/mongodb-atlas-local:8.0".into()),
                env: Some(vec!["MONGODB_INITDB_ROOT_PASSWORD=password".into()]),
                labels: Some(HashMap::from([(
                    "mongodock.name".to_string(),
                    "test_deployment".to_string(),
                )])),
                ..ContainerConfig::default()
            }),
            state: Some(ContainerState {
                status: Some(ContainerStateStatusEnum::RUNNING),
                health: Some(Health {
                    status: Some(HealthStatusEnum::HEALTHY),
                    ..Health::default()
                }),
                ..ContainerState::default()
            }),
            host_config: Some(HostConfig {
                port_bindings: Some(port_map),
                ..HostConfig::default()
            }),
            ..ContainerInspectResponse::default()
        };

        let details = details_from_inspect(response);
        assert_eq!(details.id.as_str(), "abc123");
        assert_eq!(details.name, "test_deployment");
        assert_eq!(details.state, State::Running);
        assert_eq!(details.health, HealthStatus::Healthy);
        assert_eq!(details.env_var("MONGODB_INITDB_ROOT_PASSWORD"), Some("password"));
        assert_eq!(
            details.ports,
            vec![PublishedPort {
                container_port: 27017,
                host_ip: "127.0.0.1".into(),
                host_port: 27020,
            }]
        );
    }

    #[test]
    fn missing_state_reads_as_created() {
        assert_eq!(map_state(None), State::Created);
        assert_eq!(map_state(Some(ContainerStateStatusEnum::EXITED)), State::Exited);
        assert_eq!(map_health(None), HealthStatus::None);
    }

    #[test]
    fn not_found_errors_are_classified() {
        let err = map_error(
            "remove container",
            "abc",
            DockerError::DockerResponseServerError {
                status_code: 404,
                message: "No such container: abc".into(),
            },
        );
        assert!(err.is_not_found());

        let err = map_error(
            "start container",
            "abc",
            DockerError::DockerResponseServerError {
                status_code: 500,
                message: "port is already allocated".into(),
            },
        );
        assert!(err.to_string().starts_with("start container: "));
    }

    #[test]
    fn reference_split_defaults_tag() {
        assert_eq!(split_reference("mongo:7.0"), ("mongo", "7.0"));
        assert_eq!(split_reference("host:5000/mongo"), ("host:5000/mongo", "latest"));
    }

    #[tokio::test]
    async fn unreachable_daemon_reports_connect_to_docker() {
        let err = DockerGateway::connect(Some("tcp://127.0.0.1:1"))
            .await
            .expect_err("nothing listens on port 1");
        assert!(err.is_runtime_unavailable());
        assert_eq!(err.to_string(), "connect to docker");
    }
}
