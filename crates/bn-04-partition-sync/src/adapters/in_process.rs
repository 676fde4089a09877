//! Peer client calling another node's [`SyncService`] directly.
//!
//! Lets several nodes run in one process without sockets, e.g. in tests.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::application::SyncService;
use crate::domain::SyncError;
use crate::ports::PeerClient;

/// In-process connection to a remote node.
pub struct InProcessPeer {
    pubkey: String,
    caller: String,
    remote: Arc<SyncService>,
}

impl InProcessPeer {
    /// Connection to `remote` (identified by `pubkey`), calling as `caller`.
    pub fn new(pubkey: impl Into<String>, caller: impl Into<String>, remote: Arc<SyncService>) -> Self {
        Self {
            pubkey: pubkey.into(),
            caller: caller.into(),
            remote,
        }
    }
}

#[async_trait]
impl PeerClient for InProcessPeer {
    fn pubkey(&self) -> &str {
        &self.pubkey
    }

    async fn notify_txs(&self, txids: Vec<String>) -> Result<(), SyncError> {
        let remote = Arc::clone(&self.remote);
        let caller = self.caller.clone();
        tokio::spawn(async move {
            if let Err(e) = remote.on_notify(&caller, txids).await {
                debug!("[bn-04] in-process notify from {} failed: {}", caller, e);
            }
        });
        Ok(())
    }

    async fn get_txs(&self, txids: Vec<String>) -> Result<Vec<Vec<u8>>, SyncError> {
        self.remote.get_txs(&txids)
    }

    async fn partitions_hash(&self, offset: i64, count: i64) -> Result<Vec<Vec<u8>>, SyncError> {
        self.remote.partition_hashes(offset, count)
    }

    async fn unconfirmed_txids(&self) -> Result<Vec<String>, SyncError> {
        self.remote.unconfirmed_txids()
    }

    async fn txids_by_partitions(&self, ids: Vec<i64>) -> Result<Vec<String>, SyncError> {
        self.remote.txids_by_partitions(&ids)
    }
}
