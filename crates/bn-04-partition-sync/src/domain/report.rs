//! Sync run summaries.

use bn_03_ledger_state::BatchResult;

/// Result of one `sync_txs` run.
#[derive(Debug, Default)]
pub struct SyncReport {
    /// Requested ids that were already `CLOSED` locally.
    pub already_closed: Vec<String>,
    /// Ids fetched from the source and stored as new records.
    pub ingested: Vec<String>,
    /// Ids dropped: unknown to the oracle, malformed, or not delivered.
    pub skipped: Vec<String>,
    /// Classification outcome of the processed batch.
    pub batch: BatchResult,
}

impl SyncReport {
    /// Newly ingested ids that ended `CLOSED`.
    pub fn newly_closed(&self) -> Vec<String> {
        self.batch
            .closed_txids()
            .filter(|txid| self.ingested.iter().any(|id| id == txid))
            .map(str::to_string)
            .collect()
    }
}

/// Result of reconciling with one peer.
#[derive(Debug, Default)]
pub struct ReconcileReport {
    /// Partitions whose digests differed.
    pub differing: Vec<i64>,
    /// Txids the peer reported for them.
    pub requested: Vec<String>,
    /// Ingestion summary, absent when nothing differed.
    pub sync: Option<SyncReport>,
}
