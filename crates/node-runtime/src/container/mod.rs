//! # Node Container
//!
//! Builds every service from a [`NodeConfig`] and holds the shared handles.
//!
//! ## Initialization Order
//!
//! 1. Identity (node key pair) and clock
//! 2. Ledger store (in-memory or RocksDB)
//! 3. Chain oracle
//! 4. Peer registry (outbound connections, the sync peer directory)
//! 5. Partition sync service over the store, oracle and registry
//! 6. Query service for the HTTP API

pub mod config;

use std::sync::Arc;

use bn_02_peer_auth::AllowList;
use bn_04_partition_sync::{Oracle, OracleError, SyncDependencies, SyncService};
use bn_05_peer_registry::{PeerRegistry, PeerServer};
use bn_06_ledger_store::{open_store, LedgerStore, StoreError};
use shared_crypto::{CryptoError, Secp256k1KeyPair};
use shared_types::{SystemTimeSource, TimeSource};
use thiserror::Error;
use tracing::info;

use crate::adapters::MapiOracle;
use crate::services::QueryService;

pub use config::{ConfigError, NodeConfig, OracleConfig, SyncIntervals};

/// Wiring failures.
#[derive(Debug, Error)]
pub enum ContainerError {
    /// Configuration is unusable.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Storage could not be opened.
    #[error("storage: {0}")]
    Store(#[from] StoreError),

    /// Oracle client could not be built.
    #[error("oracle: {0}")]
    Oracle(#[from] OracleError),

    /// A peer key could not be parsed for the allow-list.
    #[error("allow-list: {0}")]
    AllowList(#[from] CryptoError),
}

/// All services of one node.
pub struct NodeContainer {
    /// Configuration the node was built from.
    pub config: NodeConfig,
    /// Node identity.
    pub keypair: Arc<Secp256k1KeyPair>,
    /// Wall clock.
    pub clock: Arc<dyn TimeSource>,
    /// Ledger persistence.
    pub store: Arc<LedgerStore>,
    /// Chain oracle.
    pub oracle: Arc<dyn Oracle>,
    /// Outbound peer connections.
    pub registry: Arc<PeerRegistry>,
    /// Partition sync and ingestion.
    pub sync: Arc<SyncService>,
    /// Read and wallet-assist queries.
    pub query: Arc<QueryService>,
    /// Keys accepted on the peer listener.
    pub allow_list: AllowList,
}

impl NodeContainer {
    /// Build the node, talking to the configured merchant API oracle.
    pub fn new(config: NodeConfig) -> Result<Self, ContainerError> {
        config.validate()?;
        let oracle_key = Arc::new(config.oracle_keypair()?);
        let oracle: Arc<dyn Oracle> = Arc::new(MapiOracle::new(&config.oracle, oracle_key)?);
        Self::with_oracle(config, oracle)
    }

    /// Build the node around an explicit oracle.
    pub fn with_oracle(config: NodeConfig, oracle: Arc<dyn Oracle>) -> Result<Self, ContainerError> {
        config.validate()?;
        let keypair = Arc::new(config.keypair()?);
        let clock: Arc<dyn TimeSource> = Arc::new(SystemTimeSource);

        let store = Arc::new(LedgerStore::new(open_store(&config.storage)?));
        info!(
            "[node] ledger store ready (backend {:?}, path {})",
            config.storage.backend, config.storage.path
        );

        let registry = Arc::new(PeerRegistry::new(
            Arc::clone(&keypair),
            Arc::clone(&clock),
            config.registry_config(),
        ));

        let sync = Arc::new(SyncService::new(
            config.sync_config(),
            SyncDependencies {
                txs: store.clone(),
                points: store.clone(),
                partitions: store.clone(),
                oracle: Arc::clone(&oracle),
                peers: registry.clone(),
                clock: Arc::clone(&clock),
            },
        ));

        let query = Arc::new(QueryService::new(
            Arc::clone(&sync),
            store.clone(),
            store.clone(),
            Arc::clone(&clock),
        ));

        let allow_list = AllowList::from_hex(config.peers.iter().map(|p| p.pubkey.as_str()))?;

        info!(
            "[node] identity {}, {} trusted peers, network {:?}",
            keypair.public_key(),
            allow_list.len(),
            config.network
        );

        Ok(Self {
            config,
            keypair,
            clock,
            store,
            oracle,
            registry,
            sync,
            query,
            allow_list,
        })
    }

    /// Peer RPC server over this node's sync service.
    pub fn peer_server(&self) -> Arc<PeerServer> {
        Arc::new(PeerServer::new(
            Arc::clone(&self.sync),
            self.allow_list.clone(),
            Arc::clone(&self.clock),
            self.config.registry_config(),
        ))
    }
}
