//! A peer viewed as a transaction source.

use async_trait::async_trait;

use crate::domain::SyncError;
use crate::ports::{PeerClient, TxSource};

/// Fetches transaction bytes through a peer's `GetTxs` call.
pub struct PeerTxSource<'a>(pub &'a dyn PeerClient);

#[async_trait]
impl TxSource for PeerTxSource<'_> {
    async fn get_tx_bytes(&self, txids: &[String]) -> Result<Vec<Vec<u8>>, SyncError> {
        if txids.is_empty() {
            return Ok(Vec::new());
        }
        self.0.get_txs(txids.to_vec()).await
    }
}
