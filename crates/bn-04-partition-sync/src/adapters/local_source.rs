//! Source for a transaction submitted directly to this node.

use async_trait::async_trait;
use bitcoin::Transaction;
use bn_03_ledger_state::decode_tx;

use crate::domain::SyncError;
use crate::ports::TxSource;

/// Serves exactly one caller-supplied transaction.
#[derive(Debug, Clone)]
pub struct LocalSingleTxSource {
    txid: String,
    raw: Vec<u8>,
    tx: Transaction,
}

impl LocalSingleTxSource {
    /// Wrap hex-encoded transaction bytes.
    pub fn from_hex(raw_hex: &str) -> Result<Self, SyncError> {
        let raw = hex::decode(raw_hex.trim())
            .map_err(|e| SyncError::Source(format!("raw tx is not hex: {e}")))?;
        Self::from_bytes(raw)
    }

    /// Wrap consensus-encoded transaction bytes.
    pub fn from_bytes(raw: Vec<u8>) -> Result<Self, SyncError> {
        let tx = decode_tx(&raw)?;
        Ok(Self {
            txid: tx.compute_txid().to_string(),
            raw,
            tx,
        })
    }

    /// Id of the wrapped transaction.
    pub fn txid(&self) -> &str {
        &self.txid
    }

    /// The decoded transaction.
    pub fn tx(&self) -> &Transaction {
        &self.tx
    }
}

#[async_trait]
impl TxSource for LocalSingleTxSource {
    async fn get_tx_bytes(&self, txids: &[String]) -> Result<Vec<Vec<u8>>, SyncError> {
        match txids {
            [] => Ok(Vec::new()),
            [txid] if *txid == self.txid => Ok(vec![self.raw.clone()]),
            [txid] => Err(SyncError::Source(format!(
                "requested {txid}, holding {}",
                self.txid
            ))),
            _ => Err(SyncError::Source(format!(
                "single tx source asked for {} txs",
                txids.len()
            ))),
        }
    }
}
