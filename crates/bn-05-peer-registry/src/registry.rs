//! # Peer Registry
//!
//! The set of live connections, keyed by hex pubkey.

use std::collections::HashMap;
use std::sync::Arc;

use bn_04_partition_sync::{PeerClient, PeerDirectory};
use parking_lot::RwLock;
use shared_crypto::{Secp256k1KeyPair, Secp256k1PublicKey};
use shared_types::TimeSource;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::{PeerConfig, RegistryConfig};
use crate::connection::PeerConnection;
use crate::errors::PeerError;

/// Connections to the configured peers.
pub struct PeerRegistry {
    keypair: Arc<Secp256k1KeyPair>,
    clock: Arc<dyn TimeSource>,
    settings: RegistryConfig,
    peers: RwLock<HashMap<String, Arc<PeerConnection>>>,
}

impl PeerRegistry {
    /// Empty registry dialing as `keypair`.
    pub fn new(
        keypair: Arc<Secp256k1KeyPair>,
        clock: Arc<dyn TimeSource>,
        settings: RegistryConfig,
    ) -> Self {
        Self {
            keypair,
            clock,
            settings,
            peers: RwLock::new(HashMap::new()),
        }
    }

    /// Hex pubkeys of the registered connections.
    pub fn connected(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.peers.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Bring the registry in line with `configs`.
    ///
    /// Connections to still-configured peers are kept, the others are
    /// dialed, and peers no longer configured are dropped. Fails with
    /// [`PeerError::PartialConnect`] if any dial failed.
    pub async fn connect(&self, configs: &[PeerConfig]) -> Result<(), PeerError> {
        let existing = self.peers.read().clone();
        let mut next = HashMap::with_capacity(configs.len());
        let mut failed = Vec::new();

        for peer in configs {
            let key = match Secp256k1PublicKey::from_hex(&peer.pubkey) {
                Ok(key) => key.to_hex(),
                Err(e) => {
                    warn!("[bn-05] bad pubkey for {}: {}", peer.host, e);
                    failed.push(peer.pubkey.clone());
                    continue;
                }
            };
            if let Some(connection) = existing.get(&key) {
                next.insert(key, Arc::clone(connection));
                continue;
            }
            match PeerConnection::connect(
                peer,
                Arc::clone(&self.keypair),
                Arc::clone(&self.clock),
                self.settings.clone(),
            )
            .await
            {
                Ok(connection) => {
                    next.insert(key, Arc::new(connection));
                }
                Err(e) => {
                    warn!("[bn-05] connect to {} at {} failed: {}", key, peer.host, e);
                    failed.push(key);
                }
            }
        }

        *self.peers.write() = next;
        if failed.is_empty() {
            Ok(())
        } else {
            Err(PeerError::PartialConnect { failed })
        }
    }

    /// Retry [`Self::connect`] until every peer is connected or shutdown.
    pub async fn connect_until_complete(
        &self,
        configs: &[PeerConfig],
        mut shutdown: watch::Receiver<bool>,
    ) -> bool {
        let run_id = Uuid::new_v4();
        loop {
            match self.connect(configs).await {
                Ok(()) => {
                    info!("[bn-05] all {} peer(s) connected (run {})", configs.len(), run_id);
                    return true;
                }
                Err(e) => warn!("[bn-05] {} (run {}), retrying", e, run_id),
            }
            tokio::select! {
                _ = tokio::time::sleep(self.settings.reconnect_interval()) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        return false;
                    }
                }
            }
        }
    }

    /// Run [`Self::connect_until_complete`] in the background.
    pub fn spawn_connect(
        self: &Arc<Self>,
        configs: Vec<PeerConfig>,
        shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<bool> {
        let registry = Arc::clone(self);
        tokio::spawn(async move { registry.connect_until_complete(&configs, shutdown).await })
    }
}

impl PeerDirectory for PeerRegistry {
    fn peers(&self) -> Vec<Arc<dyn PeerClient>> {
        self.peers
            .read()
            .values()
            .map(|connection| Arc::clone(connection) as Arc<dyn PeerClient>)
            .collect()
    }

    fn peer(&self, pubkey: &str) -> Option<Arc<dyn PeerClient>> {
        self.peers
            .read()
            .get(pubkey)
            .map(|connection| Arc::clone(connection) as Arc<dyn PeerClient>)
    }
}
