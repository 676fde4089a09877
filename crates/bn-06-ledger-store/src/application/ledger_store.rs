//! # Ledger Store
//!
//! Implements the ledger and partition repositories on a [`KeyValueStore`].
//!
//! Read-modify-write operations (duplicate checks, state changes, index
//! moves) run under one writer mutex and commit as a single atomic batch.

use std::sync::Arc;

use bn_03_ledger_state::{AddrInfoRepository, TxInfoRepository, TxPointRepository};
use bn_04_partition_sync::PartitionRepository;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use shared_types::{
    AddrInfo, PartitionInfo, PointKind, RepositoryError, SpentState, StateFilter, TxBriefInfo,
    TxPoint, TxRecord, TxState, TX_SENTINEL_INDEX,
};
use tracing::debug;

use crate::config::{StorageBackend, StorageConfig};
use crate::domain::{assemble, keys, split, StoreError};
use crate::ports::{BatchOperation, InMemoryKVStore, KeyValueStore};

/// Sentinel row of a stored transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TxMeta {
    info: TxBriefInfo,
    chunks: u32,
}

/// Open the configured backend.
pub fn open_store(config: &StorageConfig) -> Result<Arc<dyn KeyValueStore>, StoreError> {
    match config.backend {
        StorageBackend::Memory => Ok(Arc::new(InMemoryKVStore::new())),
        #[cfg(feature = "rocksdb")]
        StorageBackend::Rocksdb => {
            let store = crate::adapters::RocksDbStore::open(config.into())?;
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "rocksdb"))]
        StorageBackend::Rocksdb => Err(StoreError::Unavailable(
            "built without the rocksdb feature".to_string(),
        )),
    }
}

/// Ledger repositories over a key-value store.
pub struct LedgerStore {
    kv: Arc<dyn KeyValueStore>,
    writer: Mutex<()>,
}

fn encode<T: Serialize>(key: &[u8], value: &T) -> Result<Vec<u8>, StoreError> {
    bincode::serialize(value).map_err(|e| StoreError::Codec {
        key: keys::display(key),
        message: e.to_string(),
    })
}

fn decode<T: DeserializeOwned>(key: &[u8], bytes: &[u8]) -> Result<T, StoreError> {
    bincode::deserialize(bytes).map_err(|e| StoreError::Codec {
        key: keys::display(key),
        message: e.to_string(),
    })
}

impl LedgerStore {
    /// Store over `kv`.
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self {
            kv,
            writer: Mutex::new(()),
        }
    }

    /// Store over a fresh in-memory backend.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryKVStore::new()))
    }

    /// Underlying key-value store.
    pub fn kv(&self) -> &Arc<dyn KeyValueStore> {
        &self.kv
    }

    fn load<T: DeserializeOwned>(&self, key: &[u8]) -> Result<Option<T>, StoreError> {
        self.kv
            .get(key)?
            .map(|bytes| decode(key, &bytes))
            .transpose()
    }

    fn meta(&self, txid: &str) -> Result<Option<TxMeta>, StoreError> {
        self.load(&keys::tx_row(txid, TX_SENTINEL_INDEX))
    }

    /// Rewrite the sentinel row, moving the height index if needed.
    fn update_meta(
        &self,
        txid: &str,
        change: impl FnOnce(&mut TxBriefInfo),
    ) -> Result<(), RepositoryError> {
        let _writer = self.writer.lock();
        let mut meta = self
            .meta(txid)?
            .ok_or_else(|| RepositoryError::NotFound(txid.to_string()))?;
        let old_height = meta.info.height;
        change(&mut meta.info);

        let sentinel = keys::tx_row(txid, TX_SENTINEL_INDEX);
        let mut batch = vec![BatchOperation::put(sentinel.clone(), encode(&sentinel, &meta)?)];
        if meta.info.height != old_height {
            batch.push(BatchOperation::delete(keys::tx_height(old_height, txid)));
            batch.push(BatchOperation::put(
                keys::tx_height(meta.info.height, txid),
                Vec::new(),
            ));
        }
        self.kv.atomic_batch_write(batch)?;
        Ok(())
    }

    /// Points referenced by index entries under `prefix`.
    fn indexed_points(
        &self,
        entries: Vec<(Vec<u8>, Vec<u8>)>,
        prefix_len: usize,
    ) -> Result<Vec<TxPoint>, StoreError> {
        let mut points = Vec::with_capacity(entries.len());
        for (entry, _) in entries {
            let Some(point_key) = keys::embedded_point_key(&entry, prefix_len) else {
                continue;
            };
            match self.load::<TxPoint>(point_key)? {
                Some(point) => points.push(point),
                None => debug!("[bn-06] dangling index entry {}", keys::display(&entry)),
            }
        }
        Ok(points)
    }
}

impl TxInfoRepository for LedgerStore {
    fn insert_tx(&self, record: &TxRecord) -> Result<(), RepositoryError> {
        let txid = &record.info.txid;
        let _writer = self.writer.lock();
        let sentinel = keys::tx_row(txid, TX_SENTINEL_INDEX);
        if self.kv.exists(&sentinel)? {
            return Err(RepositoryError::DuplicateKey(txid.clone()));
        }

        let segments = split(&record.raw);
        let meta = TxMeta {
            info: record.info.clone(),
            chunks: segments.len() as u32,
        };
        let mut batch = Vec::with_capacity(segments.len() + 2);
        batch.push(BatchOperation::put(sentinel.clone(), encode(&sentinel, &meta)?));
        for (index, segment) in segments.into_iter().enumerate() {
            batch.push(BatchOperation::put(
                keys::tx_row(txid, index as i32),
                segment.to_vec(),
            ));
        }
        batch.push(BatchOperation::put(
            keys::tx_height(record.info.height, txid),
            Vec::new(),
        ));
        self.kv.atomic_batch_write(batch)?;
        Ok(())
    }

    fn brief_info(&self, txid: &str) -> Result<Option<TxBriefInfo>, RepositoryError> {
        Ok(self.meta(txid)?.map(|meta| meta.info))
    }

    fn tx(&self, txid: &str) -> Result<Option<TxRecord>, RepositoryError> {
        let Some(meta) = self.meta(txid)? else {
            return Ok(None);
        };
        let sentinel = keys::tx_row(txid, TX_SENTINEL_INDEX);
        let rows = self.kv.prefix_scan(&keys::tx_prefix(txid))?;
        let segments: Vec<Vec<u8>> = rows
            .into_iter()
            .filter(|(key, _)| *key != sentinel)
            .map(|(_, value)| value)
            .collect();
        if segments.len() != meta.chunks as usize {
            return Err(RepositoryError::Corruption {
                key: txid.to_string(),
                message: format!("expected {} chunks, found {}", meta.chunks, segments.len()),
            });
        }
        Ok(Some(TxRecord {
            info: meta.info,
            raw: assemble(segments),
        }))
    }

    fn set_state(&self, txid: &str, state: TxState) -> Result<(), RepositoryError> {
        self.update_meta(txid, |info| info.state = state)
    }

    fn set_block(&self, txid: &str, height: i64, block_hash: &str) -> Result<(), RepositoryError> {
        self.update_meta(txid, |info| {
            info.height = height;
            info.block_hash = block_hash.to_string();
        })
    }

    fn delete_tx(&self, txid: &str) -> Result<(), RepositoryError> {
        let _writer = self.writer.lock();
        let Some(meta) = self.meta(txid)? else {
            return Ok(());
        };
        let mut batch: Vec<BatchOperation> = self
            .kv
            .prefix_scan(&keys::tx_prefix(txid))?
            .into_iter()
            .map(|(key, _)| BatchOperation::delete(key))
            .collect();
        batch.push(BatchOperation::delete(keys::tx_height(meta.info.height, txid)));
        self.kv.atomic_batch_write(batch)?;
        Ok(())
    }

    fn briefs_in_heights(&self, start: i64, end: i64) -> Result<Vec<TxBriefInfo>, RepositoryError> {
        let entries = self
            .kv
            .range_scan(&keys::tx_height_bound(start), &keys::tx_height_bound(end))?;
        let mut briefs = Vec::with_capacity(entries.len());
        for (entry, _) in entries {
            let Some(txid) = keys::txid_of_height_key(&entry) else {
                continue;
            };
            if let Some(meta) = self.meta(txid)? {
                briefs.push(meta.info);
            }
        }
        briefs.sort_by(|a, b| a.txid.cmp(&b.txid));
        Ok(briefs)
    }
}

impl TxPointRepository for LedgerStore {
    fn insert_point(&self, point: &TxPoint) -> Result<(), RepositoryError> {
        let _writer = self.writer.lock();
        let key = keys::point(&point.txid, point.kind, point.index);
        if self.kv.exists(&key)? {
            return Err(RepositoryError::DuplicateKey(format!(
                "{}:{}:{:?}",
                point.txid, point.index, point.kind
            )));
        }
        let mut batch = vec![
            BatchOperation::put(key.clone(), encode(&key, point)?),
            BatchOperation::put(
                keys::point_addr(&point.addr, &point.txid, point.kind, point.index),
                Vec::new(),
            ),
        ];
        if point.kind == PointKind::Vin && point.state == SpentState::MayBeUnspent {
            batch.push(BatchOperation::put(
                keys::point_unsettled(point.timestamp, &point.txid, point.index),
                Vec::new(),
            ));
        }
        self.kv.atomic_batch_write(batch)?;
        Ok(())
    }

    fn point(&self, txid: &str, index: i32, kind: PointKind) -> Result<Option<TxPoint>, RepositoryError> {
        Ok(self.load(&keys::point(txid, kind, index))?)
    }

    fn points_of_tx(&self, txid: &str) -> Result<Vec<TxPoint>, RepositoryError> {
        let mut points = Vec::new();
        for (key, value) in self.kv.prefix_scan(&keys::point_prefix(txid))? {
            points.push(decode(&key, &value)?);
        }
        Ok(points)
    }

    fn points_of_addr(
        &self,
        addr: &str,
        badge_code: Option<&str>,
        filter: StateFilter,
    ) -> Result<Vec<TxPoint>, RepositoryError> {
        let prefix = keys::point_addr_prefix(addr);
        let entries = self.kv.prefix_scan(&prefix)?;
        Ok(self
            .indexed_points(entries, prefix.len())?
            .into_iter()
            .filter(|p| badge_code.map_or(true, |code| p.badge_code == code))
            .filter(|p| filter.matches(p.state))
            .collect())
    }

    fn set_point_state(
        &self,
        txid: &str,
        index: i32,
        kind: PointKind,
        state: SpentState,
    ) -> Result<(), RepositoryError> {
        let _writer = self.writer.lock();
        let key = keys::point(txid, kind, index);
        let mut point: TxPoint = self
            .load(&key)?
            .ok_or_else(|| RepositoryError::NotFound(format!("{txid}:{index}")))?;
        point.state = state;

        let mut batch = vec![BatchOperation::put(key.clone(), encode(&key, &point)?)];
        if kind == PointKind::Vin {
            let unsettled = keys::point_unsettled(point.timestamp, txid, index);
            batch.push(match state {
                SpentState::MayBeUnspent => BatchOperation::put(unsettled, Vec::new()),
                SpentState::PrettySureSpent => BatchOperation::delete(unsettled),
            });
        }
        self.kv.atomic_batch_write(batch)?;
        Ok(())
    }

    fn delete_points(&self, txid: &str) -> Result<(), RepositoryError> {
        let _writer = self.writer.lock();
        let mut batch = Vec::new();
        for (key, value) in self.kv.prefix_scan(&keys::point_prefix(txid))? {
            let point: TxPoint = decode(&key, &value)?;
            batch.push(BatchOperation::delete(keys::point_addr(
                &point.addr,
                txid,
                point.kind,
                point.index,
            )));
            if point.kind == PointKind::Vin {
                batch.push(BatchOperation::delete(keys::point_unsettled(
                    point.timestamp,
                    txid,
                    point.index,
                )));
            }
            batch.push(BatchOperation::delete(key));
        }
        if !batch.is_empty() {
            self.kv.atomic_batch_write(batch)?;
        }
        Ok(())
    }

    fn unsettled_vins(&self, before: i64) -> Result<Vec<TxPoint>, RepositoryError> {
        let start = keys::point_unsettled_bound(i64::MIN);
        let entries = self
            .kv
            .range_scan(&start, &keys::point_unsettled_bound(before))?;
        Ok(self
            .indexed_points(entries, start.len())?
            .into_iter()
            .filter(|p| p.state == SpentState::MayBeUnspent)
            .collect())
    }
}

impl AddrInfoRepository for LedgerStore {
    fn upsert_addr_info(&self, info: &AddrInfo) -> Result<(), RepositoryError> {
        let _writer = self.writer.lock();
        let key = keys::addr(&info.addr);
        let mut batch = Vec::with_capacity(3);
        if let Some(previous) = self.load::<AddrInfo>(&key)? {
            batch.push(BatchOperation::delete(keys::addr_user(
                &previous.appid,
                previous.user_id,
                previous.user_index,
                &previous.addr,
            )));
        }
        batch.push(BatchOperation::put(key.clone(), encode(&key, info)?));
        batch.push(BatchOperation::put(
            keys::addr_user(&info.appid, info.user_id, info.user_index, &info.addr),
            Vec::new(),
        ));
        self.kv.atomic_batch_write(batch)?;
        Ok(())
    }

    fn addr_info(&self, addr: &str) -> Result<Option<AddrInfo>, RepositoryError> {
        Ok(self.load(&keys::addr(addr))?)
    }

    fn user_addrs(&self, appid: &str, user_id: i64, user_index: i64) -> Result<Vec<String>, RepositoryError> {
        let prefix = keys::addr_user_prefix(appid, user_id, user_index);
        Ok(self
            .kv
            .prefix_scan(&prefix)?
            .into_iter()
            .filter_map(|(entry, _)| {
                entry
                    .get(prefix.len()..)
                    .and_then(|addr| std::str::from_utf8(addr).ok())
                    .map(str::to_string)
            })
            .collect())
    }
}

impl PartitionRepository for LedgerStore {
    fn upsert_partition(&self, info: &PartitionInfo) -> Result<(), RepositoryError> {
        self.kv.put(&keys::partition(info.id), &info.hash)?;
        Ok(())
    }

    fn partition(&self, id: i64) -> Result<Option<PartitionInfo>, RepositoryError> {
        Ok(self
            .kv
            .get(&keys::partition(id))?
            .map(|hash| PartitionInfo { id, hash }))
    }

    fn partition_count(&self) -> Result<i64, RepositoryError> {
        Ok(self.kv.prefix_scan(keys::PARTITION)?.len() as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::{TxPoint, TX_SEGMENT_SIZE, UNCONFIRMED_HEIGHT};

    const NOW: i64 = 1_700_000_000;

    fn txid(byte: u8) -> String {
        hex_byte(byte).repeat(32)
    }

    fn hex_byte(byte: u8) -> String {
        format!("{byte:02x}")
    }

    fn record(id: &str, height: i64, raw: Vec<u8>) -> TxRecord {
        TxRecord {
            info: TxBriefInfo {
                txid: id.to_string(),
                height,
                block_hash: String::new(),
                timestamp: NOW,
                state: TxState::New,
            },
            raw,
        }
    }

    fn vout(id: &str, index: i32, addr: &str, value: i64) -> TxPoint {
        TxPoint::vout(id, index, addr.to_string(), value, "badge", NOW)
    }

    #[test]
    fn test_large_tx_is_chunked_and_reassembled() {
        let store = LedgerStore::in_memory();
        let raw: Vec<u8> = (0..TX_SEGMENT_SIZE * 2 + 17).map(|i| (i % 253) as u8).collect();
        store.insert_tx(&record(&txid(1), 5, raw.clone())).unwrap();

        let rows = store.kv().prefix_scan(&keys::tx_prefix(&txid(1))).unwrap();
        assert_eq!(rows.len(), 4);
        assert_eq!(store.tx(&txid(1)).unwrap().unwrap().raw, raw);
    }

    #[test]
    fn test_duplicate_insert_rejected() {
        let store = LedgerStore::in_memory();
        store.insert_tx(&record(&txid(1), 5, vec![1])).unwrap();
        let err = store.insert_tx(&record(&txid(1), 6, vec![2])).unwrap_err();
        assert!(err.is_duplicate());
        assert_eq!(store.tx(&txid(1)).unwrap().unwrap().raw, vec![1]);
    }

    #[test]
    fn test_missing_chunk_is_corruption() {
        let store = LedgerStore::in_memory();
        store.insert_tx(&record(&txid(1), 5, vec![1, 2, 3])).unwrap();
        store.kv().delete(&keys::tx_row(&txid(1), 0)).unwrap();
        assert!(matches!(
            store.tx(&txid(1)),
            Err(RepositoryError::Corruption { .. })
        ));
    }

    #[test]
    fn test_height_index_follows_set_block() {
        let store = LedgerStore::in_memory();
        store.insert_tx(&record(&txid(2), UNCONFIRMED_HEIGHT, vec![0])).unwrap();
        store.insert_tx(&record(&txid(1), 12, vec![0])).unwrap();

        let unconfirmed = store.briefs_in_heights(UNCONFIRMED_HEIGHT, 0).unwrap();
        assert_eq!(unconfirmed.len(), 1);

        store.set_block(&txid(2), 15, "blockhash").unwrap();
        assert!(store.briefs_in_heights(UNCONFIRMED_HEIGHT, 0).unwrap().is_empty());

        let confirmed = store.briefs_in_heights(10, 20).unwrap();
        let ids: Vec<_> = confirmed.iter().map(|b| b.txid.clone()).collect();
        assert_eq!(ids, vec![txid(1), txid(2)]);
        assert_eq!(confirmed[1].block_hash, "blockhash");
        assert!(store.briefs_in_heights(16, 20).unwrap().is_empty());
    }

    #[test]
    fn test_set_state_on_missing_tx() {
        let store = LedgerStore::in_memory();
        assert!(matches!(
            store.set_state(&txid(9), TxState::Closed),
            Err(RepositoryError::NotFound(_))
        ));
    }

    #[test]
    fn test_delete_removes_every_row() {
        let kv = Arc::new(InMemoryKVStore::new());
        let store = LedgerStore::new(kv.clone());
        store
            .insert_tx(&record(&txid(3), 7, vec![5; TX_SEGMENT_SIZE + 1]))
            .unwrap();
        store.set_state(&txid(3), TxState::Closed).unwrap();
        store.delete_tx(&txid(3)).unwrap();
        assert!(kv.is_empty());
        store.delete_tx(&txid(3)).unwrap();
    }

    #[test]
    fn test_points_order_and_address_queries() {
        let store = LedgerStore::in_memory();
        let spent = vout(&txid(1), 0, "1Alice", 100);
        let vin = TxPoint::vin(&txid(2), 0, &spent, NOW);
        store.insert_point(&vout(&txid(2), 1, "1Bob", 60)).unwrap();
        store.insert_point(&vout(&txid(2), 0, "1Alice", 40)).unwrap();
        store.insert_point(&vin).unwrap();
        assert!(store.insert_point(&vin).unwrap_err().is_duplicate());

        let kinds: Vec<_> = store
            .points_of_tx(&txid(2))
            .unwrap()
            .iter()
            .map(|p| (p.kind, p.index))
            .collect();
        assert_eq!(
            kinds,
            vec![(PointKind::Vin, 0), (PointKind::Vout, 0), (PointKind::Vout, 1)]
        );

        let alice = store.points_of_addr("1Alice", None, StateFilter::All).unwrap();
        assert_eq!(alice.len(), 2);
        assert!(store
            .points_of_addr("1Alice", Some("other"), StateFilter::All)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_unsettled_vins_track_state() {
        let store = LedgerStore::in_memory();
        let spent = vout(&txid(1), 0, "1Alice", 100);
        let vin = TxPoint::vin(&txid(2), 0, &spent, NOW);
        store.insert_point(&vin).unwrap();

        assert!(store.unsettled_vins(NOW).unwrap().is_empty());
        assert_eq!(store.unsettled_vins(NOW + 1).unwrap(), vec![vin.clone()]);

        store
            .set_point_state(&txid(2), 0, PointKind::Vin, SpentState::PrettySureSpent)
            .unwrap();
        assert!(store.unsettled_vins(NOW + 1).unwrap().is_empty());
        let filtered = store
            .points_of_addr("1Alice", None, StateFilter::Only(SpentState::PrettySureSpent))
            .unwrap();
        assert_eq!(filtered.len(), 1);
    }

    #[test]
    fn test_delete_points_clears_indexes() {
        let kv = Arc::new(InMemoryKVStore::new());
        let store = LedgerStore::new(kv.clone());
        let spent = vout(&txid(1), 0, "1Alice", 100);
        store.insert_point(&TxPoint::vin(&txid(2), 0, &spent, NOW)).unwrap();
        store.insert_point(&vout(&txid(2), 0, "1Bob", 100)).unwrap();
        store.delete_points(&txid(2)).unwrap();
        assert!(kv.is_empty());
    }

    #[test]
    fn test_addr_info_upsert_moves_user_slot() {
        let store = LedgerStore::in_memory();
        let mut info = AddrInfo {
            appid: "app".into(),
            user_id: 7,
            user_index: 0,
            addr: "1Alice".into(),
            timestamp: NOW,
        };
        store.upsert_addr_info(&info).unwrap();
        assert_eq!(store.user_addrs("app", 7, 0).unwrap(), vec!["1Alice".to_string()]);

        info.user_index = 1;
        store.upsert_addr_info(&info).unwrap();
        assert!(store.user_addrs("app", 7, 0).unwrap().is_empty());
        assert_eq!(store.user_addrs("app", 7, 1).unwrap(), vec!["1Alice".to_string()]);
        assert_eq!(store.addr_info("1Alice").unwrap(), Some(info));
    }

    #[test]
    fn test_partitions() {
        let store = LedgerStore::in_memory();
        store
            .upsert_partition(&PartitionInfo { id: 0, hash: vec![1] })
            .unwrap();
        store
            .upsert_partition(&PartitionInfo { id: 0, hash: vec![2] })
            .unwrap();
        store
            .upsert_partition(&PartitionInfo { id: 1, hash: vec![3] })
            .unwrap();
        assert_eq!(store.partition_count().unwrap(), 2);
        assert_eq!(store.partition(0).unwrap().unwrap().hash, vec![2]);
        assert!(store.partition(5).unwrap().is_none());
    }

    #[test]
    fn test_memory_backend_opens() {
        let kv = open_store(&StorageConfig::for_testing()).unwrap();
        kv.put(b"k", b"v").unwrap();
        assert!(kv.exists(b"k").unwrap());
    }

    #[test]
    fn test_ledger_service_over_store() {
        use bn_03_ledger_state::fixtures::{badge_input, badge_output, mint, raw, transaction};
        use bn_03_ledger_state::{LedgerConfig, LedgerService, ProcessOutcome};

        let store = Arc::new(LedgerStore::in_memory());
        let ledger = LedgerService::new(LedgerConfig::for_testing(), store.clone(), store.clone());

        let minted = mint(1, &[100], 0);
        let transfer = transaction(
            vec![badge_input(minted.compute_txid(), 0)],
            vec![badge_output(2, 70), badge_output(1, 30)],
        );
        for tx in [&minted, &transfer] {
            let id = tx.compute_txid().to_string();
            store.insert_tx(&record(&id, 3, raw(tx))).unwrap();
        }

        assert!(matches!(
            ledger.process(&minted, NOW).unwrap(),
            ProcessOutcome::Closed(_)
        ));
        assert!(matches!(
            ledger.process(&transfer, NOW).unwrap(),
            ProcessOutcome::Closed(_)
        ));

        let transfer_id = transfer.compute_txid().to_string();
        let values: Vec<i64> = store
            .points_of_tx(&transfer_id)
            .unwrap()
            .iter()
            .map(|p| p.value)
            .collect();
        assert_eq!(values, vec![-100, 70, 30]);
        assert_eq!(
            store.brief_info(&transfer_id).unwrap().unwrap().state,
            TxState::Closed
        );
        assert_eq!(store.unsettled_vins(NOW + 1).unwrap().len(), 1);
    }
}
