//! Full deployment lifecycle through the mongodock SDK.
//!
//! Creates a deployment, prints its connection string, and deletes it
//! again. Needs a running Docker daemon.
//!
//! Run with:
//! ```bash
//! cargo run -p mongodock-sdk --example lifecycle
//! ```

use std::time::Duration;

use mongodock_sdk::builder::DeploymentBuilder;
use mongodock_sdk::client::Client;
use mongodock_sdk::{CreationSource, MongodockError};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    tracing::info!("=== mongodock: deployment lifecycle ===");

    let client = match Client::connect().await {
        Ok(client) => client,
        Err(e @ MongodockError::RuntimeUnavailable { .. }) => {
            tracing::error!(%e, "Docker is not reachable; start the daemon and retry");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    let before = client.list_deployments().await?;
    tracing::info!(count = before.len(), "Existing deployments");

    let options = DeploymentBuilder::new("test_deployment")
        .creation_source(CreationSource::Other("DEMO".into()))
        .wait_until_healthy(Duration::from_secs(120))
        .build()?;
    let deployment = client.create_deployment(&options).await?;
    tracing::info!(
        name = %deployment.name,
        id = %deployment.container_id.short(),
        port = ?deployment.port(),
        state = %deployment.state,
        "Deployment created"
    );

    let uri = client.get_connection_string(&deployment.name).await?;
    tracing::info!(uri = %uri, "Connection string");

    match client.create_deployment(&options).await {
        Ok(_) => tracing::warn!("Expected a name conflict"),
        Err(MongodockError::NameConflict { name }) => {
            tracing::info!(name = %name, "Correctly rejected duplicate name");
        }
        Err(e) => tracing::error!(%e, "Unexpected error type"),
    }

    client.delete_deployment(&deployment.name).await?;
    let after = client.list_deployments().await?;
    tracing::info!(count = after.len(), "Deployments after delete");

    tracing::info!("=== Lifecycle demo complete ===");
    Ok(())
}
