//! # Badge Node Runtime
//!
//! Wires the badge subsystems into one node and runs it.
//!
//! ## Modules
//!
//! - `container/` - configuration and service wiring
//! - `adapters/` - merchant API chain oracle
//! - `services/` - queries and unsigned transfer building
//! - `api/` - HTTP JSON routes over the query service
//!
//! ## Startup Sequence
//!
//! 1. Bind the peer RPC listener and start serving peers
//! 2. Dial the configured peers until every one is connected
//! 3. Start the periodic sync loops (state, unconfirmed, tx state, spentness)
//! 4. Bind the HTTP listener and start the API
//!
//! Every task observes the same shutdown flag.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod api;
pub mod container;
pub mod services;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use bn_04_partition_sync::{spawn_loops, Oracle};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

// Re-exports
pub use container::{ContainerError, NodeConfig, NodeContainer};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// How long shutdown waits for tasks to finish.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Listener addresses after [`NodeRuntime::start`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundAddrs {
    /// Peer RPC listener.
    pub p2p: SocketAddr,
    /// HTTP API listener.
    pub http: SocketAddr,
}

/// A running badge node.
pub struct NodeRuntime {
    container: Arc<NodeContainer>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
    handles: Vec<JoinHandle<()>>,
}

impl NodeRuntime {
    /// Build a node from configuration.
    pub fn new(config: NodeConfig) -> Result<Self, ContainerError> {
        Ok(Self::from_container(NodeContainer::new(config)?))
    }

    /// Build a node around an explicit oracle.
    pub fn with_oracle(config: NodeConfig, oracle: Arc<dyn Oracle>) -> Result<Self, ContainerError> {
        Ok(Self::from_container(NodeContainer::with_oracle(config, oracle)?))
    }

    fn from_container(container: NodeContainer) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            container: Arc::new(container),
            shutdown_tx,
            shutdown_rx,
            handles: Vec::new(),
        }
    }

    /// Shared services of this node.
    pub fn container(&self) -> Arc<NodeContainer> {
        Arc::clone(&self.container)
    }

    /// Bind both listeners and spawn every task.
    pub async fn start(&mut self) -> Result<BoundAddrs> {
        let config = &self.container.config;
        info!("===========================================");
        info!("  Badge Node v{}", VERSION);
        info!("  Network: {:?}", config.network);
        info!("===========================================");

        let p2p_listener = TcpListener::bind(config.p2p_addr()?)
            .await
            .with_context(|| format!("binding peer listener {}", config.p2p_listen))?;
        let p2p = p2p_listener.local_addr()?;
        let server = self.container.peer_server();
        let shutdown = self.shutdown_rx.clone();
        self.handles
            .push(tokio::spawn(server.serve(p2p_listener, shutdown)));

        let connect = self
            .container
            .registry
            .spawn_connect(config.peers.clone(), self.shutdown_rx.clone());
        self.handles.push(tokio::spawn(async move {
            match connect.await {
                Ok(true) => info!("[node] all peers connected"),
                Ok(false) => warn!("[node] stopped dialing peers before all connected"),
                Err(e) => error!("[node] peer dialer failed: {}", e),
            }
        }));

        self.handles.extend(spawn_loops(
            Arc::clone(&self.container.sync),
            self.shutdown_rx.clone(),
        ));

        let http_listener = TcpListener::bind(config.http_addr()?)
            .await
            .with_context(|| format!("binding HTTP listener {}", config.http_listen))?;
        let http = http_listener.local_addr()?;
        let router = api::router(Arc::clone(&self.container.query));
        let shutdown = self.shutdown_rx.clone();
        self.handles.push(tokio::spawn(async move {
            if let Err(e) = api::serve(http_listener, router, shutdown).await {
                error!("[api] server stopped: {}", e);
            }
        }));

        info!("[node] peer RPC on {}, HTTP API on {}", p2p, http);
        Ok(BoundAddrs { p2p, http })
    }

    /// Raise the shutdown flag and wait for the tasks to finish.
    pub async fn shutdown(self) {
        info!("[node] initiating graceful shutdown");
        if let Err(e) = self.shutdown_tx.send(true) {
            error!("[node] failed to send shutdown signal: {}", e);
        }

        for handle in self.handles {
            let abort = handle.abort_handle();
            if tokio::time::timeout(SHUTDOWN_GRACE, handle).await.is_err() {
                warn!("[node] task did not stop in time, aborting");
                abort.abort();
            }
        }
        info!("[node] shutdown complete");
    }
}
