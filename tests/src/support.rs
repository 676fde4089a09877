//! Builders shared by the integration tests.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bn_04_partition_sync::{MockOracle, TxStatus};
use bn_05_peer_registry::PeerConfig;
use node_runtime::{NodeConfig, NodeContainer};
use shared_crypto::Secp256k1KeyPair;
use tokio::net::TcpListener;
use tokio::sync::watch;

/// Chain tip reported by [`confirmed_oracle`].
pub const TIP: i64 = 20;

/// Oracle that reports every transaction confirmed at height 5.
pub fn confirmed_oracle() -> Arc<MockOracle> {
    let oracle = Arc::new(MockOracle::new(TIP));
    oracle.set_default_status(TxStatus::confirmed(5, "00".repeat(32)));
    oracle
}

/// Testing configuration for `keypair`, trusting `trusted` peers.
pub fn node_config(keypair: &Secp256k1KeyPair, trusted: Vec<PeerConfig>) -> NodeConfig {
    NodeConfig {
        private_key: hex::encode(keypair.to_bytes()),
        peers: trusted,
        ..NodeConfig::for_testing()
    }
}

/// Peer entry for `keypair` listening on `addr`.
pub fn peer_entry(keypair: &Secp256k1KeyPair, addr: SocketAddr) -> PeerConfig {
    PeerConfig {
        host: addr.to_string(),
        pubkey: keypair.public_key().to_hex(),
    }
}

/// A free localhost port, released again before returning.
pub async fn reserve_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// Container-level node: services plus a running peer listener, no loops.
pub struct PeerNode {
    /// Services.
    pub container: Arc<NodeContainer>,
    /// Peer RPC listener.
    pub addr: SocketAddr,
    _shutdown: watch::Sender<bool>,
}

impl PeerNode {
    /// Build the node and start serving peer RPCs.
    pub async fn start(config: NodeConfig, oracle: Arc<MockOracle>) -> Self {
        let container = Arc::new(NodeContainer::with_oracle(config, oracle).unwrap());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        tokio::spawn(container.peer_server().serve(listener, shutdown_rx));
        Self {
            container,
            addr,
            _shutdown: shutdown_tx,
        }
    }

    /// Digests of every partition up to [`TIP`].
    pub fn digests(&self) -> Vec<Vec<u8>> {
        let sync = &self.container.sync;
        let count = sync.params().expected_partitions(TIP);
        sync.partition_hashes(0, count).unwrap()
    }
}

/// Poll `check` every 100ms until it holds or `within` elapses.
pub async fn eventually<F, Fut>(within: Duration, mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + within;
    loop {
        if check().await {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
}
