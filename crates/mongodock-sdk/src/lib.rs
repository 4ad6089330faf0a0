//! # mongodock-sdk
//!
//! Run single-node MongoDB deployments in Docker from Rust.
//!
//! Two entry points:
//! - [`Client`](client::Client): connects to the Docker daemon and creates,
//!   lists, inspects and deletes deployments.
//! - [`DeploymentBuilder`](builder::DeploymentBuilder): fluent construction
//!   of creation options.
//!
//! # Example
//!
//! ```rust,no_run
//! use mongodock_sdk::builder::DeploymentBuilder;
//! use mongodock_sdk::client::Client;
//!
//! # async fn run() -> mongodock_sdk::Result<()> {
//! let client = Client::connect().await?;
//! let options = DeploymentBuilder::new("test_deployment").version("8.0").build()?;
//! let deployment = client.create_deployment(&options).await?;
//! let uri = client.get_connection_string(&deployment.name).await?;
//! client.delete_deployment(&deployment.name).await?;
//! # let _ = uri;
//! # Ok(())
//! # }
//! ```

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod builder;
pub mod client;

pub use mongodock_common::config::ClientConfig;
pub use mongodock_common::error::{MongodockError, Result};
pub use mongodock_common::options::{
    CreateDeploymentOptions, GetConnectionStringOptions, RequestedPortBinding,
};
pub use mongodock_common::types::{
    BindingType, ContainerId, CreationSource, Deployment, MongoDbVersion, MongodbType, State,
};
