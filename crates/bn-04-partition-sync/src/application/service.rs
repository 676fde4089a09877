//! # Sync Service
//!
//! Owns the dirty partition set and the ingest/delete lock, and implements
//! every sync operation: digest maintenance, reconciliation, ingestion,
//! state repair, spentness aging and the calls served to peers.
//!
//! ## Locking
//!
//! - Ingestion (persist + classify) holds the shared side of `ingest_lock`.
//! - Deleting a vanished transaction holds the exclusive side, so a record
//!   is never removed while a batch that may reference it is being
//!   classified.
//! - The dirty set has its own mutex and is drained by swap.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;

use bitcoin::Transaction;
use bn_03_ledger_state::{
    decode_tx, LedgerConfig, LedgerService, TxInfoRepository, TxPointRepository,
};
use shared_types::{
    NetworkParams, PartitionInfo, PointKind, SpentState, TimeSource, TxBriefInfo, TxRecord, TxState,
    UNCONFIRMED_HEIGHT,
};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::adapters::{LocalSingleTxSource, PeerTxSource};
use crate::config::SyncConfig;
use crate::domain::{digest_txids, DirtyPartitions, ReconcileReport, SyncError, SyncReport};
use crate::ports::{Oracle, PartitionRepository, PeerClient, PeerDirectory, TxSource};

/// Collaborators of the sync service.
#[derive(Clone)]
pub struct SyncDependencies {
    /// Transaction records.
    pub txs: Arc<dyn TxInfoRepository>,
    /// Ledger points.
    pub points: Arc<dyn TxPointRepository>,
    /// Partition digests.
    pub partitions: Arc<dyn PartitionRepository>,
    /// Chain oracle.
    pub oracle: Arc<dyn Oracle>,
    /// Connected peers.
    pub peers: Arc<dyn PeerDirectory>,
    /// Wall clock.
    pub clock: Arc<dyn TimeSource>,
}

/// Partition sync service.
pub struct SyncService {
    config: SyncConfig,
    params: NetworkParams,
    ledger: LedgerService,
    txs: Arc<dyn TxInfoRepository>,
    points: Arc<dyn TxPointRepository>,
    partitions: Arc<dyn PartitionRepository>,
    oracle: Arc<dyn Oracle>,
    peers: Arc<dyn PeerDirectory>,
    clock: Arc<dyn TimeSource>,
    dirty: DirtyPartitions,
    ingest_lock: RwLock<()>,
}

impl SyncService {
    /// Create a service.
    pub fn new(config: SyncConfig, deps: SyncDependencies) -> Self {
        let params = NetworkParams::for_network(config.network);
        let ledger = LedgerService::new(
            LedgerConfig {
                network: config.network,
            },
            Arc::clone(&deps.txs),
            Arc::clone(&deps.points),
        );
        Self {
            config,
            params,
            ledger,
            txs: deps.txs,
            points: deps.points,
            partitions: deps.partitions,
            oracle: deps.oracle,
            peers: deps.peers,
            clock: deps.clock,
            dirty: DirtyPartitions::new(params),
            ingest_lock: RwLock::new(()),
        }
    }

    /// Configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Partition geometry.
    pub fn params(&self) -> NetworkParams {
        self.params
    }

    /// The ledger state machine.
    pub fn ledger(&self) -> &LedgerService {
        &self.ledger
    }

    /// Partitions awaiting recomputation.
    pub fn dirty(&self) -> &DirtyPartitions {
        &self.dirty
    }

    /// The chain oracle.
    pub fn oracle(&self) -> &Arc<dyn Oracle> {
        &self.oracle
    }

    // =========================================================================
    // DIGESTS
    // =========================================================================

    /// Sorted, deduplicated ids of the `CLOSED` transactions in partition `id`.
    pub fn closed_txids(&self, id: i64) -> Result<Vec<String>, SyncError> {
        let (start, end) = self
            .params
            .height_range(id)
            .ok_or(SyncError::InvalidRange { offset: id, count: 1 })?;
        let set: BTreeSet<String> = self
            .txs
            .briefs_in_heights(start, end)?
            .into_iter()
            .filter(TxBriefInfo::is_closed)
            .map(|info| info.txid)
            .collect();
        Ok(set.into_iter().collect())
    }

    /// Digest of partition `id` from current records.
    pub fn compute_digest(&self, id: i64) -> Result<Vec<u8>, SyncError> {
        Ok(digest_txids(&self.closed_txids(id)?)?)
    }

    /// Recompute and persist the digest of partition `id`.
    pub fn compute_and_store(&self, id: i64) -> Result<PartitionInfo, SyncError> {
        let info = PartitionInfo {
            id,
            hash: self.compute_digest(id)?,
        };
        self.partitions.upsert_partition(&info)?;
        debug!("[bn-04] partition {} digest {}", id, hex::encode(&info.hash));
        Ok(info)
    }

    /// Recompute every dirty partition. Ids that fail stay dirty.
    pub fn flush_dirty(&self) -> Result<usize, SyncError> {
        let ids = self.dirty.drain();
        let mut first_error = None;
        let mut flushed = 0;
        for id in ids {
            match self.compute_and_store(id) {
                Ok(_) => flushed += 1,
                Err(e) => {
                    warn!("[bn-04] recomputing partition {} failed: {}", id, e);
                    self.dirty.mark(id);
                    first_error.get_or_insert(e);
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(flushed),
        }
    }

    /// Stored digest of `id`, or the digest of the current records when no
    /// row exists. Only dirtied partitions are ever persisted.
    pub fn partition_hash(&self, id: i64) -> Result<Vec<u8>, SyncError> {
        match self.partitions.partition(id)? {
            Some(info) => Ok(info.hash),
            None => self.compute_digest(id),
        }
    }

    /// Digests of `[offset, offset + count)`, one per position.
    ///
    /// Pending dirty partitions are flushed first so peers never see a
    /// digest older than the local records.
    pub fn partition_hashes(&self, offset: i64, count: i64) -> Result<Vec<Vec<u8>>, SyncError> {
        let end = self.checked_range(offset, count)?;
        if count > self.config.max_hash_count {
            return Err(SyncError::InvalidRange { offset, count });
        }
        self.flush_dirty()?;
        (offset..end).map(|id| self.partition_hash(id)).collect()
    }

    /// End of `[offset, offset + count)`, rejecting negatives and overflow.
    fn checked_range(&self, offset: i64, count: i64) -> Result<i64, SyncError> {
        if offset < 0 || count < 0 {
            return Err(SyncError::InvalidRange { offset, count });
        }
        let end = offset
            .checked_add(count)
            .ok_or(SyncError::InvalidRange { offset, count })?;
        // The last partition must still map to real heights.
        if count > 0 && self.params.height_range(end - 1).is_none() {
            return Err(SyncError::InvalidRange { offset, count });
        }
        Ok(end)
    }

    // =========================================================================
    // RECONCILIATION
    // =========================================================================

    /// Compare `[offset, offset + count)` with `peer` and pull what differs.
    pub async fn reconcile_with_peer(
        &self,
        peer: &dyn PeerClient,
        offset: i64,
        count: i64,
    ) -> Result<ReconcileReport, SyncError> {
        let end = self.checked_range(offset, count)?;
        let mut report = ReconcileReport::default();
        if count == 0 {
            return Ok(report);
        }

        // The newest partition is still filling up; never trust its cache.
        self.dirty.mark(end - 1);
        self.flush_dirty()?;

        let mut chunk_start = offset;
        while chunk_start < end {
            let chunk = self.config.digest_chunk.max(1).min(end - chunk_start);
            let theirs = peer.partitions_hash(chunk_start, chunk).await?;
            for (position, id) in (chunk_start..chunk_start + chunk).enumerate() {
                let Some(their_hash) = theirs.get(position) else {
                    break;
                };
                if *their_hash != self.partition_hash(id)? {
                    debug!("[bn-04] partition {} differs from {}", id, peer.pubkey());
                    report.differing.push(id);
                }
            }
            chunk_start += chunk;
        }
        if report.differing.is_empty() {
            return Ok(report);
        }

        report.requested = peer.txids_by_partitions(report.differing.clone()).await?;
        let sync = self.sync_txs(&report.requested, &PeerTxSource(peer)).await?;
        report.sync = Some(sync);
        self.flush_dirty()?;
        Ok(report)
    }

    /// Reconcile `[offset, offset + count)` with every connected peer.
    ///
    /// A failing peer is logged and skipped.
    pub async fn sync_partitions(&self, offset: i64, count: i64) -> Result<(), SyncError> {
        self.flush_dirty()?;
        for peer in self.peers.peers() {
            match self.reconcile_with_peer(peer.as_ref(), offset, count).await {
                Ok(report) => info!(
                    "[bn-04] reconciled [{}, {}) with {}: {} partitions differed, {} txids pulled",
                    offset,
                    offset.saturating_add(count),
                    peer.pubkey(),
                    report.differing.len(),
                    report.requested.len()
                ),
                Err(e) => warn!("[bn-04] reconcile with {} failed: {}", peer.pubkey(), e),
            }
        }
        Ok(())
    }

    // =========================================================================
    // INGESTION
    // =========================================================================

    /// Bring the requested transactions into the local ledger.
    ///
    /// Already `CLOSED` ids are reported as such; stored but unresolved ids
    /// are classified again; unknown ids are checked with the oracle and
    /// fetched from `source`. Newly ingested transactions that close are
    /// pushed to every peer.
    pub async fn sync_txs(
        &self,
        txids: &[String],
        source: &dyn TxSource,
    ) -> Result<SyncReport, SyncError> {
        let mut report = SyncReport::default();
        let mut batch: Vec<Transaction> = Vec::new();
        let mut lack: BTreeMap<String, (i64, String)> = BTreeMap::new();
        let mut seen = HashSet::new();

        for txid in txids {
            if !seen.insert(txid.as_str()) {
                continue;
            }
            match self.txs.brief_info(txid)? {
                Some(info) if info.is_closed() => report.already_closed.push(txid.clone()),
                Some(info) => match self.requeue(&info)? {
                    Some(tx) => batch.push(tx),
                    None => report.skipped.push(txid.clone()),
                },
                None => match self.oracle.tx_status(txid).await {
                    Ok(status) if status.is_failure() => {
                        debug!("[bn-04] oracle rejects {}: {}", txid, status.result_description);
                        report.skipped.push(txid.clone());
                    }
                    Ok(status) => {
                        lack.insert(txid.clone(), (status.ingest_height(), status.block_hash));
                    }
                    Err(e) => {
                        warn!("[bn-04] oracle status of {} unavailable: {}", txid, e);
                        return Err(e.into());
                    }
                },
            }
        }

        let fetched = if lack.is_empty() {
            Vec::new()
        } else {
            let ids: Vec<String> = lack.keys().cloned().collect();
            source.get_tx_bytes(&ids).await?
        };

        let ingest_guard = self.ingest_lock.read().await;
        let now = self.clock.now();
        for raw in fetched {
            let tx = match decode_tx(&raw) {
                Ok(tx) => tx,
                Err(e) => {
                    warn!("[bn-04] dropping undecodable tx from source: {}", e);
                    continue;
                }
            };
            let txid = tx.compute_txid().to_string();
            let Some((height, block_hash)) = lack.remove(&txid) else {
                warn!("[bn-04] source sent unrequested tx {}", txid);
                continue;
            };
            let record = TxRecord {
                info: TxBriefInfo {
                    txid: txid.clone(),
                    height,
                    block_hash,
                    timestamp: now,
                    state: TxState::New,
                },
                raw,
            };
            match self.txs.insert_tx(&record) {
                Ok(()) => {}
                Err(e) if e.is_duplicate() => {}
                Err(e) => return Err(e.into()),
            }
            self.dirty.mark_height(height);
            report.ingested.push(txid);
            batch.push(tx);
        }
        report.skipped.extend(lack.into_keys());

        report.batch = self.ledger.resolve_batch(batch, now);
        drop(ingest_guard);

        let notify = report.newly_closed();
        self.notify_peers(notify);
        Ok(report)
    }

    /// Reload a stored but unresolved transaction for classification.
    fn requeue(&self, info: &TxBriefInfo) -> Result<Option<Transaction>, SyncError> {
        let Some(record) = self.txs.tx(&info.txid)? else {
            return Ok(None);
        };
        match decode_tx(&record.raw) {
            Ok(tx) => {
                self.dirty.mark_height(info.height);
                debug!("[bn-04] {} still {:?}, requeued", info.txid, info.state);
                Ok(Some(tx))
            }
            Err(e) => {
                warn!("[bn-04] stored tx {} undecodable: {}", info.txid, e);
                Ok(None)
            }
        }
    }

    /// Push `txids` to every peer without waiting for the outcome.
    pub fn notify_peers(&self, txids: Vec<String>) {
        if txids.is_empty() {
            return;
        }
        for peer in self.peers.peers() {
            let txids = txids.clone();
            tokio::spawn(async move {
                if let Err(e) = peer.notify_txs(txids).await {
                    debug!("[bn-04] notify {} failed: {}", peer.pubkey(), e);
                }
            });
        }
    }

    /// Handle a push from `sender`: sync the ids from that peer.
    pub async fn on_notify(&self, sender: &str, txids: Vec<String>) -> Result<SyncReport, SyncError> {
        let peer = self
            .peers
            .peer(sender)
            .ok_or_else(|| SyncError::UnknownPeer(sender.to_string()))?;
        self.sync_txs(&txids, &PeerTxSource(peer.as_ref())).await
    }

    /// Ingest a transaction submitted to this node.
    pub async fn submit_local(&self, raw_hex: &str) -> Result<(String, SyncReport), SyncError> {
        let source = LocalSingleTxSource::from_hex(raw_hex)?;
        let txid = source.txid().to_string();
        let report = self.sync_txs(std::slice::from_ref(&txid), &source).await?;
        Ok((txid, report))
    }

    /// Pull every peer's unconfirmed transactions.
    pub async fn sync_unconfirmed(&self) {
        for peer in self.peers.peers() {
            let txids = match peer.unconfirmed_txids().await {
                Ok(txids) => txids,
                Err(e) => {
                    warn!("[bn-04] unconfirmed txids from {} failed: {}", peer.pubkey(), e);
                    continue;
                }
            };
            if let Err(e) = self.sync_txs(&txids, &PeerTxSource(peer.as_ref())).await {
                warn!("[bn-04] unconfirmed sync with {} failed: {}", peer.pubkey(), e);
            }
        }
    }

    /// One state sync round: unconfirmed sync, then reconcile the trailing
    /// window (or everything when `full`) against every peer.
    pub async fn sync_state(&self, full: bool) -> Result<(), SyncError> {
        let run = Uuid::new_v4();
        let tip = self.oracle.fee_quote().await?.current_highest_block_height;
        let stored = self.partitions.partition_count()?;
        self.sync_unconfirmed().await;

        let expected = self.params.expected_partitions(tip);
        let mut start = stored - self.config.recompute_trailing;
        if start < 0 || full {
            start = 0;
        }
        info!(
            "[bn-04] state sync run={} tip={} full={} partitions [{}, {})",
            run, tip, full, start, expected
        );
        if expected <= start {
            return Ok(());
        }
        self.dirty.mark_range(start, expected);
        self.sync_partitions(start, expected - start).await
    }

    // =========================================================================
    // REPAIR
    // =========================================================================

    /// Remove a transaction and its points.
    pub async fn delete_tx(&self, txid: &str) -> Result<(), SyncError> {
        let _exclusive = self.ingest_lock.write().await;
        self.points.delete_points(txid)?;
        self.txs.delete_tx(txid)?;
        Ok(())
    }

    /// Re-check recent and unconfirmed transactions with the oracle.
    ///
    /// Transactions the chain no longer knows are deleted; height or block
    /// drift is corrected. Both the old and the new partition are dirtied.
    pub async fn check_tx_state(&self) -> Result<(), SyncError> {
        let tip = self.oracle.fee_quote().await?.current_highest_block_height;
        let mut recent: BTreeMap<String, TxBriefInfo> = BTreeMap::new();
        let window = self
            .txs
            .briefs_in_heights(tip - self.config.tx_state_window, tip + 1)?;
        let unconfirmed = self
            .txs
            .briefs_in_heights(UNCONFIRMED_HEIGHT, UNCONFIRMED_HEIGHT + 1)?;
        for info in window.into_iter().chain(unconfirmed) {
            recent.insert(info.txid.clone(), info);
        }

        for info in recent.into_values() {
            let status = self.oracle.tx_status(&info.txid).await?;
            if status.is_missing() {
                info!("[bn-04] {} vanished from the chain, deleting", info.txid);
                self.delete_tx(&info.txid).await?;
                self.dirty.mark_height(info.height);
                continue;
            }
            let height = status.repair_height();
            if height != info.height || status.block_hash != info.block_hash {
                info!(
                    "[bn-04] {} moved from height {} to {}",
                    info.txid, info.height, height
                );
                self.txs.set_block(&info.txid, height, &status.block_hash)?;
                self.dirty.mark_height(info.height);
                self.dirty.mark_height(height);
            }
        }
        Ok(())
    }

    /// Flip deeply confirmed spends to `PrettySureSpent`. Returns how many
    /// spends were aged.
    pub async fn age_spentness(&self) -> Result<usize, SyncError> {
        let tip = self.oracle.fee_quote().await?.current_highest_block_height;
        let cutoff = self.clock.now() - self.config.spent_min_age_secs;
        let mut aged = 0;
        for vin in self.points.unsettled_vins(cutoff)? {
            let Some(info) = self.txs.brief_info(&vin.txid)? else {
                continue;
            };
            if info.height == UNCONFIRMED_HEIGHT
                || tip - info.height <= self.config.spent_min_confirmations
            {
                continue;
            }
            self.points.set_point_state(
                &vin.pre_txid,
                vin.pre_index,
                PointKind::Vout,
                SpentState::PrettySureSpent,
            )?;
            self.points.set_point_state(
                &vin.txid,
                vin.index,
                PointKind::Vin,
                SpentState::PrettySureSpent,
            )?;
            aged += 1;
        }
        Ok(aged)
    }

    // =========================================================================
    // SERVING PEERS
    // =========================================================================

    /// Raw bytes of the requested transactions; unknown ids are omitted.
    pub fn get_txs(&self, txids: &[String]) -> Result<Vec<Vec<u8>>, SyncError> {
        let mut raws = Vec::with_capacity(txids.len());
        for txid in txids {
            if let Some(record) = self.txs.tx(txid)? {
                raws.push(record.raw);
            }
        }
        Ok(raws)
    }

    /// Ids of unconfirmed transactions.
    pub fn unconfirmed_txids(&self) -> Result<Vec<String>, SyncError> {
        let set: BTreeSet<String> = self
            .txs
            .briefs_in_heights(UNCONFIRMED_HEIGHT, UNCONFIRMED_HEIGHT + 1)?
            .into_iter()
            .map(|info| info.txid)
            .collect();
        Ok(set.into_iter().collect())
    }

    /// Ids of `CLOSED` transactions in any of the partitions.
    pub fn txids_by_partitions(&self, ids: &[i64]) -> Result<Vec<String>, SyncError> {
        let mut set = BTreeSet::new();
        for id in ids {
            if *id < 0 {
                continue;
            }
            set.extend(self.closed_txids(*id)?);
        }
        Ok(set.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::adapters::InProcessPeer;
    use crate::domain::TxStatus;
    use crate::ports::{InMemoryPartitionRepository, MockOracle, StaticPeerDirectory};
    use bn_03_ledger_state::fixtures::{badge_input, badge_output, mint, raw, transaction};
    use bn_03_ledger_state::InMemoryLedgerRepository;
    use shared_types::FixedTimeSource;

    const NOW: i64 = 1_700_000_000;

    struct Node {
        repo: Arc<InMemoryLedgerRepository>,
        partitions: Arc<InMemoryPartitionRepository>,
        peers: Arc<StaticPeerDirectory>,
        clock: Arc<FixedTimeSource>,
        service: Arc<SyncService>,
    }

    fn node(oracle: &Arc<MockOracle>) -> Node {
        let repo = Arc::new(InMemoryLedgerRepository::new());
        let partitions = Arc::new(InMemoryPartitionRepository::new());
        let peers = Arc::new(StaticPeerDirectory::new());
        let clock = Arc::new(FixedTimeSource::new(NOW));
        let service = Arc::new(SyncService::new(
            SyncConfig::for_testing(),
            SyncDependencies {
                txs: repo.clone(),
                points: repo.clone(),
                partitions: partitions.clone(),
                oracle: oracle.clone(),
                peers: peers.clone(),
                clock: clock.clone(),
            },
        ));
        Node {
            repo,
            partitions,
            peers,
            clock,
            service,
        }
    }

    /// `from` gets a connection to `to`.
    fn connect(from: &Node, from_key: &str, to: &Node, to_key: &str) -> Arc<InProcessPeer> {
        let peer = Arc::new(InProcessPeer::new(to_key, from_key, to.service.clone()));
        from.peers.add(peer.clone());
        peer
    }

    fn id(tx: &Transaction) -> String {
        tx.compute_txid().to_string()
    }

    fn state(node: &Node, tx: &Transaction) -> Option<TxState> {
        node.repo.brief_info(&id(tx)).unwrap().map(|info| info.state)
    }

    fn record(txid: &str, height: i64, state: TxState) -> TxRecord {
        TxRecord {
            info: TxBriefInfo {
                txid: txid.to_string(),
                height,
                block_hash: String::new(),
                timestamp: NOW,
                state,
            },
            raw: vec![0],
        }
    }

    #[test]
    fn test_digest_counts_only_closed_in_range() {
        let oracle = Arc::new(MockOracle::new(40));
        let a = node(&oracle);
        let closed = "11".repeat(32);
        let open = "22".repeat(32);
        let outside = "33".repeat(32);
        a.repo.insert_tx(&record(&closed, 31, TxState::Closed)).unwrap();
        a.repo.insert_tx(&record(&open, 32, TxState::Open)).unwrap();
        a.repo.insert_tx(&record(&outside, 40, TxState::Closed)).unwrap();

        assert_eq!(a.service.closed_txids(3).unwrap(), vec![closed.clone()]);
        assert_eq!(
            a.service.compute_digest(3).unwrap(),
            digest_txids(&[closed]).unwrap()
        );
    }

    #[test]
    fn test_partition_hashes_fill_every_position() {
        let oracle = Arc::new(MockOracle::new(40));
        let a = node(&oracle);
        let hashes = a.service.partition_hashes(0, 4).unwrap();
        assert_eq!(hashes.len(), 4);
        assert!(a.service.partition_hashes(-1, 2).is_err());
    }

    #[test]
    fn test_serving_digests_persists_nothing_new() {
        let oracle = Arc::new(MockOracle::new(40));
        let a = node(&oracle);
        a.repo
            .insert_tx(&record(&"11".repeat(32), 31, TxState::Closed))
            .unwrap();
        let hashes = a.service.partition_hashes(0, 100).unwrap();
        assert_eq!(hashes[3], a.service.compute_digest(3).unwrap());
        assert_eq!(a.partitions.partition_count().unwrap(), 0);

        // Dirtied partitions are the only ones written.
        a.service.dirty().mark(3);
        a.service.partition_hashes(0, 5).unwrap();
        assert_eq!(a.partitions.partition_count().unwrap(), 1);
    }

    #[test]
    fn test_oversized_ranges_rejected() {
        let oracle = Arc::new(MockOracle::new(40));
        let a = node(&oracle);
        let max = a.service.config().max_hash_count;
        assert!(matches!(
            a.service.partition_hashes(1, i64::MAX),
            Err(SyncError::InvalidRange { .. })
        ));
        assert!(matches!(
            a.service.partition_hashes(i64::MAX, 1),
            Err(SyncError::InvalidRange { .. })
        ));
        assert!(matches!(
            a.service.partition_hashes(0, max + 1),
            Err(SyncError::InvalidRange { .. })
        ));
        assert_eq!(a.service.partition_hashes(0, max).unwrap().len() as i64, max);
        assert!(matches!(
            a.service.txids_by_partitions(&[i64::MAX]),
            Err(SyncError::InvalidRange { .. })
        ));
        assert!(matches!(
            a.service.closed_txids(i64::MAX / 2),
            Err(SyncError::InvalidRange { .. })
        ));
        assert_eq!(a.partitions.partition_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_reconcile_rejects_overflowing_range() {
        let oracle = Arc::new(MockOracle::new(40));
        let a = node(&oracle);
        let b = node(&oracle);
        let to_a = connect(&b, "b", &a, "a");
        assert!(matches!(
            b.service.reconcile_with_peer(to_a.as_ref(), i64::MAX, 2).await,
            Err(SyncError::InvalidRange { .. })
        ));
        assert!(b.service.dirty().is_empty());
    }

    #[tokio::test]
    async fn test_empty_nodes_request_nothing() {
        let oracle = Arc::new(MockOracle::new(40));
        let a = node(&oracle);
        let b = node(&oracle);
        let to_a = connect(&b, "b", &a, "a");

        let report = b.service.reconcile_with_peer(to_a.as_ref(), 0, 5).await.unwrap();
        assert!(report.differing.is_empty());
        assert!(report.requested.is_empty());
        assert!(report.sync.is_none());
    }

    #[tokio::test]
    async fn test_reconcile_pulls_missing_closed_tx() {
        let oracle = Arc::new(MockOracle::new(40));
        let a = node(&oracle);
        let b = node(&oracle);
        let to_a = connect(&b, "b", &a, "a");

        let tx = mint(1, &[100], 0);
        oracle.set_status(&id(&tx), TxStatus::confirmed(35, "blk"));
        a.service.submit_local(&hex::encode(raw(&tx))).await.unwrap();
        assert_eq!(state(&a, &tx), Some(TxState::Closed));
        assert_ne!(
            a.service.compute_digest(3).unwrap(),
            b.service.compute_digest(3).unwrap()
        );

        let report = b.service.reconcile_with_peer(to_a.as_ref(), 0, 5).await.unwrap();
        assert_eq!(report.differing, vec![3]);
        assert_eq!(report.requested, vec![id(&tx)]);
        assert_eq!(state(&b, &tx), Some(TxState::Closed));
        assert_eq!(
            a.service.partition_hash(3).unwrap(),
            b.service.partition_hash(3).unwrap()
        );

        let again = b.service.reconcile_with_peer(to_a.as_ref(), 0, 5).await.unwrap();
        assert!(again.differing.is_empty());
    }

    #[tokio::test]
    async fn test_already_closed_is_reported() {
        let oracle = Arc::new(MockOracle::new(40));
        let a = node(&oracle);
        let tx = mint(1, &[100], 0);
        let (txid, _) = a.service.submit_local(&hex::encode(raw(&tx))).await.unwrap();

        let source = LocalSingleTxSource::from_bytes(raw(&tx)).unwrap();
        let report = a.service.sync_txs(&[txid.clone()], &source).await.unwrap();
        assert_eq!(report.already_closed, vec![txid]);
        assert!(report.ingested.is_empty());
    }

    #[tokio::test]
    async fn test_oracle_rejected_tx_is_skipped() {
        let oracle = Arc::new(MockOracle::new(40));
        let a = node(&oracle);
        let tx = mint(1, &[100], 0);
        oracle.set_status(&id(&tx), TxStatus::missing());

        let (txid, report) = a.service.submit_local(&hex::encode(raw(&tx))).await.unwrap();
        assert_eq!(report.skipped, vec![txid]);
        assert_eq!(state(&a, &tx), None);
    }

    #[tokio::test]
    async fn test_oracle_outage_fails_the_sync() {
        let oracle = Arc::new(MockOracle::new(40));
        let a = node(&oracle);
        let tx = mint(1, &[100], 0);
        oracle.set_unreachable(true);

        let result = a.service.submit_local(&hex::encode(raw(&tx))).await;
        assert!(matches!(result, Err(SyncError::Oracle(_))));
        assert_eq!(state(&a, &tx), None);

        oracle.set_unreachable(false);
        let (_, report) = a.service.submit_local(&hex::encode(raw(&tx))).await.unwrap();
        assert!(report.skipped.is_empty());
        assert_eq!(state(&a, &tx), Some(TxState::Closed));
    }

    #[tokio::test]
    async fn test_open_tx_is_requeued_once_parent_arrives() {
        let oracle = Arc::new(MockOracle::new(40));
        let a = node(&oracle);
        let b = node(&oracle);
        let to_a = connect(&b, "b", &a, "a");

        let parent = mint(1, &[100], 0);
        let child = transaction(vec![badge_input(parent.compute_txid(), 0)], vec![badge_output(2, 100)]);
        a.service.submit_local(&hex::encode(raw(&parent))).await.unwrap();
        a.service.submit_local(&hex::encode(raw(&child))).await.unwrap();
        assert_eq!(state(&a, &child), Some(TxState::Closed));

        let source = PeerTxSource(to_a.as_ref());
        b.service.sync_txs(&[id(&child)], &source).await.unwrap();
        assert_eq!(state(&b, &child), Some(TxState::Open));

        let report = b.service.sync_txs(&[id(&parent), id(&child)], &source).await.unwrap();
        assert_eq!(report.ingested, vec![id(&parent)]);
        assert_eq!(state(&b, &parent), Some(TxState::Closed));
        assert_eq!(state(&b, &child), Some(TxState::Closed));
        assert_eq!(report.newly_closed(), vec![id(&parent)]);
    }

    #[tokio::test]
    async fn test_submit_rejects_garbage() {
        let oracle = Arc::new(MockOracle::new(40));
        let a = node(&oracle);
        assert!(a.service.submit_local("not hex").await.is_err());
    }

    #[tokio::test]
    async fn test_closed_tx_is_pushed_to_peers() {
        let oracle = Arc::new(MockOracle::new(40));
        let a = node(&oracle);
        let b = node(&oracle);
        connect(&a, "a", &b, "b");
        connect(&b, "b", &a, "a");

        let tx = mint(1, &[100], 0);
        a.service.submit_local(&hex::encode(raw(&tx))).await.unwrap();

        let arrived = tokio::time::timeout(Duration::from_secs(5), async {
            while state(&b, &tx) != Some(TxState::Closed) {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await;
        assert!(arrived.is_ok());
    }

    #[tokio::test]
    async fn test_notify_from_unknown_peer_fails() {
        let oracle = Arc::new(MockOracle::new(40));
        let a = node(&oracle);
        assert!(matches!(
            a.service.on_notify("stranger", vec!["00".repeat(32)]).await,
            Err(SyncError::UnknownPeer(_))
        ));
    }

    #[tokio::test]
    async fn test_vanished_tx_is_deleted() {
        let oracle = Arc::new(MockOracle::new(40));
        let a = node(&oracle);
        let tx = mint(1, &[100], 0);
        oracle.set_status(&id(&tx), TxStatus::confirmed(35, "blk"));
        a.service.submit_local(&hex::encode(raw(&tx))).await.unwrap();
        a.service.flush_dirty().unwrap();

        oracle.set_status(&id(&tx), TxStatus::missing());
        a.service.check_tx_state().await.unwrap();
        assert_eq!(state(&a, &tx), None);
        assert_eq!(a.repo.point_count(), 0);
        assert!(a.service.dirty().contains(3));
    }

    #[tokio::test]
    async fn test_height_drift_is_repaired() {
        let oracle = Arc::new(MockOracle::new(40));
        let a = node(&oracle);
        let tx = mint(1, &[100], 0);
        oracle.set_status(&id(&tx), TxStatus::confirmed(35, "blk"));
        a.service.submit_local(&hex::encode(raw(&tx))).await.unwrap();
        a.service.flush_dirty().unwrap();

        oracle.set_status(&id(&tx), TxStatus::confirmed(38, "other"));
        a.service.check_tx_state().await.unwrap();
        let info = a.repo.brief_info(&id(&tx)).unwrap().unwrap();
        assert_eq!((info.height, info.block_hash.as_str()), (38, "other"));
        assert!(a.service.dirty().contains(3));

        oracle.set_status(&id(&tx), TxStatus::unconfirmed());
        a.service.check_tx_state().await.unwrap();
        assert_eq!(a.service.unconfirmed_txids().unwrap(), vec![id(&tx)]);
        assert!(a.service.closed_txids(3).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_deep_spends_are_aged() {
        let oracle = Arc::new(MockOracle::new(40));
        let a = node(&oracle);
        let parent = mint(1, &[100], 0);
        let child = transaction(vec![badge_input(parent.compute_txid(), 0)], vec![badge_output(2, 100)]);
        oracle.set_status(&id(&parent), TxStatus::confirmed(10, "b10"));
        oracle.set_status(&id(&child), TxStatus::confirmed(12, "b12"));
        a.service.submit_local(&hex::encode(raw(&parent))).await.unwrap();
        a.service.submit_local(&hex::encode(raw(&child))).await.unwrap();

        // Too recent.
        assert_eq!(a.service.age_spentness().await.unwrap(), 0);

        a.clock.advance(3601);
        oracle.set_tip(32);
        assert_eq!(a.service.age_spentness().await.unwrap(), 0);

        oracle.set_tip(40);
        assert_eq!(a.service.age_spentness().await.unwrap(), 1);
        let spent = a.repo.point(&id(&parent), 0, PointKind::Vout).unwrap().unwrap();
        let spend = a.repo.point(&id(&child), 0, PointKind::Vin).unwrap().unwrap();
        assert_eq!(spent.state, SpentState::PrettySureSpent);
        assert_eq!(spend.state, SpentState::PrettySureSpent);
        assert_eq!(a.service.age_spentness().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_full_state_sync_pulls_history() {
        let oracle = Arc::new(MockOracle::new(40));
        let a = node(&oracle);
        let b = node(&oracle);
        connect(&b, "b", &a, "a");

        let old = mint(1, &[1], 0);
        let recent = mint(1, &[2], 1);
        oracle.set_status(&id(&old), TxStatus::confirmed(3, "b3"));
        oracle.set_status(&id(&recent), TxStatus::confirmed(39, "b39"));
        a.service.submit_local(&hex::encode(raw(&old))).await.unwrap();
        a.service.submit_local(&hex::encode(raw(&recent))).await.unwrap();

        b.service.sync_state(true).await.unwrap();
        assert_eq!(state(&b, &old), Some(TxState::Closed));
        assert_eq!(state(&b, &recent), Some(TxState::Closed));
        assert_eq!(b.partitions.partition_count().unwrap(), 5);
    }

    #[tokio::test]
    async fn test_state_sync_pulls_unconfirmed() {
        let oracle = Arc::new(MockOracle::new(40));
        let a = node(&oracle);
        let b = node(&oracle);
        connect(&b, "b", &a, "a");

        let pending = mint(1, &[1], 0);
        a.service.submit_local(&hex::encode(raw(&pending))).await.unwrap();
        b.service.sync_state(false).await.unwrap();
        assert_eq!(state(&b, &pending), Some(TxState::Closed));
    }

    #[tokio::test]
    async fn test_serving_calls() {
        let oracle = Arc::new(MockOracle::new(40));
        let a = node(&oracle);
        let confirmed = mint(1, &[1], 0);
        let pending = mint(1, &[2], 1);
        oracle.set_status(&id(&confirmed), TxStatus::confirmed(21, "b21"));
        a.service.submit_local(&hex::encode(raw(&confirmed))).await.unwrap();
        a.service.submit_local(&hex::encode(raw(&pending))).await.unwrap();

        assert_eq!(a.service.unconfirmed_txids().unwrap(), vec![id(&pending)]);
        assert_eq!(
            a.service.txids_by_partitions(&[1, 2, 2, -1]).unwrap(),
            vec![id(&confirmed)]
        );
        let raws = a
            .service
            .get_txs(&[id(&confirmed), "00".repeat(32)])
            .unwrap();
        assert_eq!(raws, vec![raw(&confirmed)]);
    }
}
