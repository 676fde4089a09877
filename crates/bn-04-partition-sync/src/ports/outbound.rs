//! # Outbound Ports
//!
//! Traits for the partition digest store, the chain oracle, transaction
//! sources and peers, each with an in-memory implementation for tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use shared_types::{PartitionInfo, RepositoryError};

use crate::domain::{FeeQuote, OracleError, SubmitResult, SyncError, TxStatus};

/// Persisted partition digests.
pub trait PartitionRepository: Send + Sync {
    /// Insert or replace the digest of `info.id`.
    fn upsert_partition(&self, info: &PartitionInfo) -> Result<(), RepositoryError>;

    /// Stored digest of partition `id`.
    fn partition(&self, id: i64) -> Result<Option<PartitionInfo>, RepositoryError>;

    /// Number of stored partitions.
    fn partition_count(&self) -> Result<i64, RepositoryError>;
}

/// Anything that can hand out raw transaction bytes by id.
#[async_trait]
pub trait TxSource: Send + Sync {
    /// Raw bytes of the requested transactions. Unknown ids are omitted.
    async fn get_tx_bytes(&self, txids: &[String]) -> Result<Vec<Vec<u8>>, SyncError>;
}

/// External view of the base chain.
#[async_trait]
pub trait Oracle: Send + Sync {
    /// Current chain tip.
    async fn fee_quote(&self) -> Result<FeeQuote, OracleError>;

    /// Confirmation status of `txid`.
    async fn tx_status(&self, txid: &str) -> Result<TxStatus, OracleError>;

    /// Broadcast a hex-encoded transaction.
    async fn send_tx(&self, raw_hex: &str) -> Result<SubmitResult, OracleError>;
}

/// Authenticated RPC client of one peer.
#[async_trait]
pub trait PeerClient: Send + Sync {
    /// Hex pubkey identifying the peer.
    fn pubkey(&self) -> &str;

    /// Push newly confirmed txids.
    async fn notify_txs(&self, txids: Vec<String>) -> Result<(), SyncError>;

    /// Raw bytes of the requested transactions.
    async fn get_txs(&self, txids: Vec<String>) -> Result<Vec<Vec<u8>>, SyncError>;

    /// Digests of partitions `[offset, offset + count)`.
    async fn partitions_hash(&self, offset: i64, count: i64) -> Result<Vec<Vec<u8>>, SyncError>;

    /// Ids of the peer's unconfirmed transactions.
    async fn unconfirmed_txids(&self) -> Result<Vec<String>, SyncError>;

    /// Ids of the peer's `CLOSED` transactions in the given partitions.
    async fn txids_by_partitions(&self, ids: Vec<i64>) -> Result<Vec<String>, SyncError>;
}

/// Currently connected peers.
pub trait PeerDirectory: Send + Sync {
    /// Every connected peer.
    fn peers(&self) -> Vec<Arc<dyn PeerClient>>;

    /// Connection to the peer with hex pubkey `pubkey`.
    fn peer(&self, pubkey: &str) -> Option<Arc<dyn PeerClient>>;
}

// =============================================================================
// IN-MEMORY IMPLEMENTATIONS
// =============================================================================

/// Partition digests in a map.
#[derive(Default)]
pub struct InMemoryPartitionRepository {
    partitions: RwLock<BTreeMap<i64, Vec<u8>>>,
}

impl InMemoryPartitionRepository {
    /// Empty repository.
    pub fn new() -> Self {
        Self::default()
    }
}

impl PartitionRepository for InMemoryPartitionRepository {
    fn upsert_partition(&self, info: &PartitionInfo) -> Result<(), RepositoryError> {
        self.partitions.write().insert(info.id, info.hash.clone());
        Ok(())
    }

    fn partition(&self, id: i64) -> Result<Option<PartitionInfo>, RepositoryError> {
        Ok(self.partitions.read().get(&id).map(|hash| PartitionInfo {
            id,
            hash: hash.clone(),
        }))
    }

    fn partition_count(&self) -> Result<i64, RepositoryError> {
        Ok(self.partitions.read().len() as i64)
    }
}

/// Scriptable oracle.
///
/// Unknown txids report the default status, initially unconfirmed.
pub struct MockOracle {
    tip: Mutex<FeeQuote>,
    statuses: Mutex<HashMap<String, TxStatus>>,
    default_status: Mutex<TxStatus>,
    submitted: Mutex<Vec<String>>,
    unreachable: Mutex<bool>,
}

impl MockOracle {
    /// Oracle reporting `tip` as the best height.
    pub fn new(tip: i64) -> Self {
        Self {
            tip: Mutex::new(FeeQuote {
                current_highest_block_height: tip,
                current_highest_block_hash: String::new(),
            }),
            statuses: Mutex::new(HashMap::new()),
            default_status: Mutex::new(TxStatus::unconfirmed()),
            submitted: Mutex::new(Vec::new()),
            unreachable: Mutex::new(false),
        }
    }

    /// Move the tip.
    pub fn set_tip(&self, tip: i64) {
        self.tip.lock().current_highest_block_height = tip;
    }

    /// Script the status of `txid`.
    pub fn set_status(&self, txid: &str, status: TxStatus) {
        self.statuses.lock().insert(txid.to_string(), status);
    }

    /// Status for txids without a scripted one.
    pub fn set_default_status(&self, status: TxStatus) {
        *self.default_status.lock() = status;
    }

    /// Make every call fail with a transport error.
    pub fn set_unreachable(&self, unreachable: bool) {
        *self.unreachable.lock() = unreachable;
    }

    /// Hex transactions received by `send_tx`.
    pub fn submitted(&self) -> Vec<String> {
        self.submitted.lock().clone()
    }

    fn check_reachable(&self) -> Result<(), OracleError> {
        if *self.unreachable.lock() {
            return Err(OracleError::Transport("mock oracle offline".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl Oracle for MockOracle {
    async fn fee_quote(&self) -> Result<FeeQuote, OracleError> {
        self.check_reachable()?;
        Ok(self.tip.lock().clone())
    }

    async fn tx_status(&self, txid: &str) -> Result<TxStatus, OracleError> {
        self.check_reachable()?;
        let scripted = self.statuses.lock().get(txid).cloned();
        Ok(scripted.unwrap_or_else(|| self.default_status.lock().clone()))
    }

    async fn send_tx(&self, raw_hex: &str) -> Result<SubmitResult, OracleError> {
        self.check_reachable()?;
        self.submitted.lock().push(raw_hex.to_string());
        Ok(SubmitResult {
            return_result: "success".into(),
            ..Default::default()
        })
    }
}

/// Fixed set of peers.
#[derive(Default)]
pub struct StaticPeerDirectory {
    peers: RwLock<Vec<Arc<dyn PeerClient>>>,
}

impl StaticPeerDirectory {
    /// Empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a peer.
    pub fn add(&self, peer: Arc<dyn PeerClient>) {
        self.peers.write().push(peer);
    }
}

impl PeerDirectory for StaticPeerDirectory {
    fn peers(&self) -> Vec<Arc<dyn PeerClient>> {
        self.peers.read().clone()
    }

    fn peer(&self, pubkey: &str) -> Option<Arc<dyn PeerClient>> {
        self.peers
            .read()
            .iter()
            .find(|p| p.pubkey() == pubkey)
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_upsert_replaces() {
        let repo = InMemoryPartitionRepository::new();
        repo.upsert_partition(&PartitionInfo { id: 3, hash: vec![1] }).unwrap();
        repo.upsert_partition(&PartitionInfo { id: 3, hash: vec![2] }).unwrap();
        assert_eq!(repo.partition_count().unwrap(), 1);
        assert_eq!(repo.partition(3).unwrap().unwrap().hash, vec![2]);
        assert!(repo.partition(4).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_mock_oracle_scripting() {
        let oracle = MockOracle::new(100);
        oracle.set_status("a", TxStatus::missing());
        assert!(oracle.tx_status("a").await.unwrap().is_missing());
        assert_eq!(oracle.tx_status("b").await.unwrap(), TxStatus::unconfirmed());

        oracle.set_unreachable(true);
        assert!(matches!(oracle.fee_quote().await, Err(OracleError::Transport(_))));
    }
}
