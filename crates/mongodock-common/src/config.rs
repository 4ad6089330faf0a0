//! Client configuration model.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{self, config_env};
use crate::error::{MongodockError, Result};

/// Settings shared by every operation of a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Docker daemon address; platform default when `None`.
    pub docker_host: Option<String>,
    /// Image repository for new deployments.
    pub image: String,
    /// Root username used when a deployment does not set one.
    pub default_username: String,
    /// Root password used when a deployment does not set one.
    pub default_password: String,
    /// First host port the allocator may hand out.
    pub port_range_start: u16,
    /// Last host port the allocator may hand out.
    pub port_range_end: u16,
    /// Label every managed container carries.
    pub managed_label: String,
    /// Seconds to wait for `mongod` to exit on delete.
    pub stop_timeout_secs: u32,
    /// Interval between health probes in milliseconds.
    pub health_poll_interval_ms: u64,
    /// Default deadline for `wait_until_healthy`.
    pub health_timeout_secs: u64,
    /// Deadline for create and delete operations.
    pub operation_timeout_secs: Option<u64>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            docker_host: None,
            image: constants::DEFAULT_IMAGE.to_string(),
            default_username: constants::DEFAULT_USERNAME.to_string(),
            default_password: constants::DEFAULT_PASSWORD.to_string(),
            port_range_start: constants::DEFAULT_PORT_RANGE_START,
            port_range_end: constants::DEFAULT_PORT_RANGE_END,
            managed_label: constants::LABEL_MANAGED.to_string(),
            stop_timeout_secs: constants::DEFAULT_STOP_TIMEOUT_SECS,
            health_poll_interval_ms: constants::DEFAULT_HEALTH_POLL_INTERVAL_MS,
            health_timeout_secs: constants::DEFAULT_HEALTH_TIMEOUT_SECS,
            operation_timeout_secs: None,
        }
    }
}

impl ClientConfig {
    /// Loads a configuration from a JSON file; missing keys take defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or validated.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| MongodockError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Returns the defaults with `DOCKER_HOST`, `MONGODOCK_IMAGE` and
    /// `MONGODOCK_PORT_RANGE` applied.
    ///
    /// # Errors
    ///
    /// Returns an error if an override is malformed.
    pub fn from_env() -> Result<Self> {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if an override is malformed.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(host) = lookup(config_env::DOCKER_HOST).filter(|h| !h.is_empty()) {
            self.docker_host = Some(host);
        }
        if let Some(image) = lookup(config_env::IMAGE).filter(|i| !i.is_empty()) {
            self.image = image;
        }
        if let Some(range) = lookup(config_env::PORT_RANGE) {
            let (start, end) = parse_port_range(&range)?;
            self.port_range_start = start;
            self.port_range_end = end;
        }
        self.validate()?;
        Ok(self)
    }

    /// Rejects configurations no deployment could be created with.
    ///
    /// # Errors
    ///
    /// Returns an error describing the first invalid field.
    pub fn validate(&self) -> Result<()> {
        if self.image.trim().is_empty() {
            return Err(MongodockError::Config {
                message: "image must not be empty".to_string(),
            });
        }
        if self.port_range_start == 0 || self.port_range_start > self.port_range_end {
            return Err(MongodockError::Config {
                message: format!(
                    "invalid port range {}-{}",
                    self.port_range_start, self.port_range_end
                ),
            });
        }
        if self.managed_label.trim().is_empty() {
            return Err(MongodockError::Config {
                message: "managed label must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Interval between health probes.
    #[must_use]
    pub const fn health_poll_interval(&self) -> Duration {
        Duration::from_millis(self.health_poll_interval_ms)
    }

    /// Default deadline for a deployment to become healthy.
    #[must_use]
    pub const fn health_timeout(&self) -> Duration {
        Duration::from_secs(self.health_timeout_secs)
    }

    /// Deadline for create and delete, if any.
    #[must_use]
    pub fn operation_timeout(&self) -> Option<Duration> {
        self.operation_timeout_secs.map(Duration::from_secs)
    }
}

fn parse_port_range(raw: &str) -> Result<(u16, u16)> {
    let invalid = || MongodockError::Config {
        message: format!("invalid port range {raw:?}, expected start-end"),
    };
    let (start, end) = raw.split_once('-').ok_or_else(invalid)?;
    let start = start.trim().parse().map_err(|_| invalid())?;
    let end = end.trim().parse().map_err(|_| invalid())?;
    Ok((start, end))
}
