//! # Badge Node
//!
//! Loads configuration from `BADGE_CONFIG` (default `./badge-node.toml`)
//! plus environment overrides, starts the node and runs until Ctrl+C.

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use node_runtime::{NodeConfig, NodeRuntime};

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .with_thread_ids(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = NodeConfig::load().context("loading node configuration")?;
    let mut runtime = NodeRuntime::new(config).context("building node")?;
    runtime.start().await?;

    info!("Node is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;

    runtime.shutdown().await;
    Ok(())
}
