//! Domain primitive types used across the mongodock workspace.

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{ANY_INTERFACE_IP, LOOPBACK_IP};
use crate::error::MongodockError;

/// Runtime-assigned identifier of a container.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContainerId(String);

impl ContainerId {
    /// Creates a new container ID from a string value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the inner string representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the 12 character prefix Docker shows in listings.
    #[must_use]
    pub fn short(&self) -> &str {
        self.0.get(..12).unwrap_or(&self.0)
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Observed state of the container backing a deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum State {
    /// Created but never started.
    Created,
    /// Removal failed half-way.
    Dead,
    /// The process exited.
    Exited,
    /// Processes are frozen.
    Paused,
    /// Removal is in progress.
    Removing,
    /// Docker is restarting the container.
    Restarting,
    /// `mongod` is running.
    Running,
}

impl State {
    /// Returns whether the database process is up.
    #[must_use]
    pub const fn is_running(self) -> bool {
        matches!(self, Self::Running)
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Created => "created",
            Self::Dead => "dead",
            Self::Exited => "exited",
            Self::Paused => "paused",
            Self::Removing => "removing",
            Self::Restarting => "restarting",
            Self::Running => "running",
        };
        f.write_str(s)
    }
}

/// Which host interface a port is published on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BindingType {
    /// `127.0.0.1`
    Loopback,
    /// `0.0.0.0`
    AnyInterface,
    /// Any other address.
    Specific(IpAddr),
}

impl BindingType {
    /// Classifies a host IP as reported by the runtime.
    ///
    /// An empty string is what Docker reports for "all interfaces".
    #[must_use]
    pub fn from_host_ip(ip: &str) -> Self {
        match ip {
            "" | ANY_INTERFACE_IP | "::" => Self::AnyInterface,
            LOOPBACK_IP => Self::Loopback,
            other => other
                .parse()
                .map_or(Self::AnyInterface, |addr: IpAddr| {
                    if addr.is_loopback() {
                        Self::Loopback
                    } else {
                        Self::Specific(addr)
                    }
                }),
        }
    }

    /// Returns the host IP to publish on.
    #[must_use]
    pub fn host_ip(&self) -> String {
        match self {
            Self::Loopback => LOOPBACK_IP.to_string(),
            Self::AnyInterface => ANY_INTERFACE_IP.to_string(),
            Self::Specific(ip) => ip.to_string(),
        }
    }
}

/// Host port through which a deployment is reachable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortBinding {
    /// Interface the port is published on.
    pub binding_type: BindingType,
    /// Host IP as a string.
    pub ip: String,
    /// Host TCP port.
    pub port: u16,
}

impl PortBinding {
    /// Creates a binding on the given interface.
    #[must_use]
    pub fn new(binding_type: BindingType, port: u16) -> Self {
        let ip = binding_type.host_ip();
        Self {
            binding_type,
            ip,
            port,
        }
    }
}

/// MongoDB edition shipped by the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MongodbType {
    /// Community server.
    #[default]
    Community,
    /// Enterprise server.
    Enterprise,
}

impl fmt::Display for MongodbType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Community => f.write_str("community"),
            Self::Enterprise => f.write_str("enterprise"),
        }
    }
}

impl FromStr for MongodbType {
    type Err = MongodockError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "community" => Ok(Self::Community),
            "enterprise" => Ok(Self::Enterprise),
            other => Err(MongodockError::Config {
                message: format!("unknown mongodb type: {other}"),
            }),
        }
    }
}

/// Tool or integration that requested a deployment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CreationSource {
    /// A command line tool.
    Cli,
    /// Another container.
    Container,
    /// An MCP server.
    McpServer,
    /// Anything else, kept verbatim.
    Other(String),
}

impl CreationSource {
    /// Returns the value stored in the container label.
    #[must_use]
    pub fn as_label(&self) -> &str {
        match self {
            Self::Cli => "CLI",
            Self::Container => "CONTAINER",
            Self::McpServer => "MCPSERVER",
            Self::Other(source) => source,
        }
    }

    /// Parses a label value; unknown values are kept as `Other`.
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        match label {
            "CLI" => Self::Cli,
            "CONTAINER" => Self::Container,
            "MCPSERVER" => Self::McpServer,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for CreationSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

/// Requested MongoDB server version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MongoDbVersion {
    /// Whatever the newest image ships.
    #[default]
    Latest,
    /// Newest release of a major version.
    Major(u8),
    /// Newest patch of a minor version.
    MajorMinor(u8, u8),
    /// An exact release.
    MajorMinorPatch(u8, u8, u8),
}

impl MongoDbVersion {
    /// Returns the image tag for this version.
    #[must_use]
    pub fn image_tag(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for MongoDbVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Latest => f.write_str("latest"),
            Self::Major(major) => write!(f, "{major}"),
            Self::MajorMinor(major, minor) => write!(f, "{major}.{minor}"),
            Self::MajorMinorPatch(major, minor, patch) => write!(f, "{major}.{minor}.{patch}"),
        }
    }
}

impl FromStr for MongoDbVersion {
    type Err = MongodockError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("latest") {
            return Ok(Self::Latest);
        }

        let invalid = || MongodockError::Config {
            message: format!("invalid mongodb version: {s:?}"),
        };
        let parts = s
            .split('.')
            .map(|part| part.parse::<u8>().map_err(|_| invalid()))
            .collect::<Result<Vec<_>, _>>()?;

        match parts.as_slice() {
            [major] => Ok(Self::Major(*major)),
            [major, minor] => Ok(Self::MajorMinor(*major, *minor)),
            [major, minor, patch] => Ok(Self::MajorMinorPatch(*major, *minor, *patch)),
            _ => Err(invalid()),
        }
    }
}

/// A logical, named MongoDB instance backed by a single container.
///
/// Every field is derived from what the runtime reports; nothing here is
/// cached between calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deployment {
    /// Identifier of the backing container.
    pub container_id: ContainerId,
    /// Logical deployment name.
    pub name: String,
    /// Observed container state.
    pub state: State,
    /// Published MongoDB port, if any.
    pub port_bindings: Option<PortBinding>,
    /// Image reference the container was created from.
    pub image: Option<String>,
    /// MongoDB edition.
    pub mongodb_type: MongodbType,
    /// MongoDB version as recorded at creation.
    pub mongodb_version: String,
    /// Creation timestamp reported by the runtime.
    pub created_at: Option<DateTime<Utc>>,
    /// Who created the deployment.
    pub creation_source: Option<CreationSource>,
    /// Host directory mounted as seed scripts.
    pub local_seed_location: Option<String>,
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
    /// Log file for `mongot`.
    pub mongot_log_file: Option<String>,
    /// Log file for the runner.
    pub runner_log_file: Option<String>,
    /// Telemetry opt-out as set in the environment.
    pub do_not_track: Option<String>,
    /// Telemetry endpoint.
    pub telemetry_base_url: Option<String>,
}

impl Deployment {
    /// Returns the published host port, if any.
    #[must_use]
    pub fn port(&self) -> Option<u16> {
        self.port_bindings.as_ref().map(|binding| binding.port)
    }
}
