//! # Outbound Ports
//!
//! Repository traits for transaction records, ledger points and address
//! metadata. Every method is a single atomic write or a consistent read.

use std::collections::BTreeMap;

use parking_lot::RwLock;
use shared_types::{
    AddrInfo, PointKind, RepositoryError, SpentState, StateFilter, TxBriefInfo, TxPoint,
    TxRecord, TxState,
};

/// Transaction record storage.
pub trait TxInfoRepository: Send + Sync {
    /// Insert a new record. Fails with `DuplicateKey` if the txid exists.
    fn insert_tx(&self, record: &TxRecord) -> Result<(), RepositoryError>;

    /// Metadata of a stored transaction.
    fn brief_info(&self, txid: &str) -> Result<Option<TxBriefInfo>, RepositoryError>;

    /// Full record including the raw bytes.
    fn tx(&self, txid: &str) -> Result<Option<TxRecord>, RepositoryError>;

    /// Set the classification state.
    fn set_state(&self, txid: &str, state: TxState) -> Result<(), RepositoryError>;

    /// Move a transaction to a new height and block.
    fn set_block(&self, txid: &str, height: i64, block_hash: &str)
        -> Result<(), RepositoryError>;

    /// Remove the record. Removing an unknown txid is not an error.
    fn delete_tx(&self, txid: &str) -> Result<(), RepositoryError>;

    /// Records with height in `[start, end)`, ordered by txid.
    fn briefs_in_heights(&self, start: i64, end: i64)
        -> Result<Vec<TxBriefInfo>, RepositoryError>;
}

/// Ledger point storage.
pub trait TxPointRepository: Send + Sync {
    /// Insert a point. Fails with `DuplicateKey` on `(txid, index, kind)`.
    fn insert_point(&self, point: &TxPoint) -> Result<(), RepositoryError>;

    /// Point by unique key.
    fn point(&self, txid: &str, index: i32, kind: PointKind)
        -> Result<Option<TxPoint>, RepositoryError>;

    /// All points of a transaction, VINs then VOUTs, each by index.
    fn points_of_tx(&self, txid: &str) -> Result<Vec<TxPoint>, RepositoryError>;

    /// Points of `addr`, optionally restricted to one badge code.
    fn points_of_addr(
        &self,
        addr: &str,
        badge_code: Option<&str>,
        filter: StateFilter,
    ) -> Result<Vec<TxPoint>, RepositoryError>;

    /// Update the spentness of one point.
    fn set_point_state(
        &self,
        txid: &str,
        index: i32,
        kind: PointKind,
        state: SpentState,
    ) -> Result<(), RepositoryError>;

    /// Remove every point of a transaction.
    fn delete_points(&self, txid: &str) -> Result<(), RepositoryError>;

    /// VIN points still `MayBeUnspent` with `timestamp < before`.
    fn unsettled_vins(&self, before: i64) -> Result<Vec<TxPoint>, RepositoryError>;
}

/// Address ownership metadata.
pub trait AddrInfoRepository: Send + Sync {
    /// Insert or replace the row for `info.addr`.
    fn upsert_addr_info(&self, info: &AddrInfo) -> Result<(), RepositoryError>;

    /// Row for `addr`.
    fn addr_info(&self, addr: &str) -> Result<Option<AddrInfo>, RepositoryError>;

    /// Addresses registered to a user slot.
    fn user_addrs(
        &self,
        appid: &str,
        user_id: i64,
        user_index: i64,
    ) -> Result<Vec<String>, RepositoryError>;
}

type PointKey = (String, PointKind, i32);

#[derive(Default)]
struct LedgerTables {
    txs: BTreeMap<String, TxRecord>,
    points: BTreeMap<PointKey, TxPoint>,
    addrs: BTreeMap<String, AddrInfo>,
}

/// In-memory implementation of all ledger repositories, for tests.
#[derive(Default)]
pub struct InMemoryLedgerRepository {
    tables: RwLock<LedgerTables>,
}

impl InMemoryLedgerRepository {
    /// Empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored points.
    pub fn point_count(&self) -> usize {
        self.tables.read().points.len()
    }
}

impl TxInfoRepository for InMemoryLedgerRepository {
    fn insert_tx(&self, record: &TxRecord) -> Result<(), RepositoryError> {
        let mut tables = self.tables.write();
        if tables.txs.contains_key(&record.info.txid) {
            return Err(RepositoryError::DuplicateKey(record.info.txid.clone()));
        }
        tables.txs.insert(record.info.txid.clone(), record.clone());
        Ok(())
    }

    fn brief_info(&self, txid: &str) -> Result<Option<TxBriefInfo>, RepositoryError> {
        Ok(self.tables.read().txs.get(txid).map(|r| r.info.clone()))
    }

    fn tx(&self, txid: &str) -> Result<Option<TxRecord>, RepositoryError> {
        Ok(self.tables.read().txs.get(txid).cloned())
    }

    fn set_state(&self, txid: &str, state: TxState) -> Result<(), RepositoryError> {
        let mut tables = self.tables.write();
        let record = tables
            .txs
            .get_mut(txid)
            .ok_or_else(|| RepositoryError::NotFound(txid.to_string()))?;
        record.info.state = state;
        Ok(())
    }

    fn set_block(&self, txid: &str, height: i64, block_hash: &str) -> Result<(), RepositoryError> {
        let mut tables = self.tables.write();
        let record = tables
            .txs
            .get_mut(txid)
            .ok_or_else(|| RepositoryError::NotFound(txid.to_string()))?;
        record.info.height = height;
        record.info.block_hash = block_hash.to_string();
        Ok(())
    }

    fn delete_tx(&self, txid: &str) -> Result<(), RepositoryError> {
        self.tables.write().txs.remove(txid);
        Ok(())
    }

    fn briefs_in_heights(&self, start: i64, end: i64) -> Result<Vec<TxBriefInfo>, RepositoryError> {
        Ok(self
            .tables
            .read()
            .txs
            .values()
            .filter(|r| r.info.height >= start && r.info.height < end)
            .map(|r| r.info.clone())
            .collect())
    }
}

impl TxPointRepository for InMemoryLedgerRepository {
    fn insert_point(&self, point: &TxPoint) -> Result<(), RepositoryError> {
        let key = (point.txid.clone(), point.kind, point.index);
        let mut tables = self.tables.write();
        if tables.points.contains_key(&key) {
            return Err(RepositoryError::DuplicateKey(format!(
                "{}:{}:{:?}",
                point.txid, point.index, point.kind
            )));
        }
        tables.points.insert(key, point.clone());
        Ok(())
    }

    fn point(
        &self,
        txid: &str,
        index: i32,
        kind: PointKind,
    ) -> Result<Option<TxPoint>, RepositoryError> {
        Ok(self
            .tables
            .read()
            .points
            .get(&(txid.to_string(), kind, index))
            .cloned())
    }

    fn points_of_tx(&self, txid: &str) -> Result<Vec<TxPoint>, RepositoryError> {
        Ok(self
            .tables
            .read()
            .points
            .values()
            .filter(|p| p.txid == txid)
            .cloned()
            .collect())
    }

    fn points_of_addr(
        &self,
        addr: &str,
        badge_code: Option<&str>,
        filter: StateFilter,
    ) -> Result<Vec<TxPoint>, RepositoryError> {
        Ok(self
            .tables
            .read()
            .points
            .values()
            .filter(|p| p.addr == addr)
            .filter(|p| badge_code.map_or(true, |code| p.badge_code == code))
            .filter(|p| filter.matches(p.state))
            .cloned()
            .collect())
    }

    fn set_point_state(
        &self,
        txid: &str,
        index: i32,
        kind: PointKind,
        state: SpentState,
    ) -> Result<(), RepositoryError> {
        let mut tables = self.tables.write();
        let point = tables
            .points
            .get_mut(&(txid.to_string(), kind, index))
            .ok_or_else(|| RepositoryError::NotFound(format!("{txid}:{index}")))?;
        point.state = state;
        Ok(())
    }

    fn delete_points(&self, txid: &str) -> Result<(), RepositoryError> {
        self.tables.write().points.retain(|(id, _, _), _| id != txid);
        Ok(())
    }

    fn unsettled_vins(&self, before: i64) -> Result<Vec<TxPoint>, RepositoryError> {
        Ok(self
            .tables
            .read()
            .points
            .values()
            .filter(|p| {
                p.kind == PointKind::Vin
                    && p.state == SpentState::MayBeUnspent
                    && p.timestamp < before
            })
            .cloned()
            .collect())
    }
}

impl AddrInfoRepository for InMemoryLedgerRepository {
    fn upsert_addr_info(&self, info: &AddrInfo) -> Result<(), RepositoryError> {
        self.tables.write().addrs.insert(info.addr.clone(), info.clone());
        Ok(())
    }

    fn addr_info(&self, addr: &str) -> Result<Option<AddrInfo>, RepositoryError> {
        Ok(self.tables.read().addrs.get(addr).cloned())
    }

    fn user_addrs(
        &self,
        appid: &str,
        user_id: i64,
        user_index: i64,
    ) -> Result<Vec<String>, RepositoryError> {
        Ok(self
            .tables
            .read()
            .addrs
            .values()
            .filter(|i| i.appid == appid && i.user_id == user_id && i.user_index == user_index)
            .map(|i| i.addr.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(txid: &str, height: i64) -> TxRecord {
        TxRecord {
            info: TxBriefInfo {
                txid: txid.into(),
                height,
                block_hash: String::new(),
                timestamp: 0,
                state: TxState::New,
            },
            raw: vec![1, 2, 3],
        }
    }

    #[test]
    fn test_duplicate_tx_rejected() {
        let repo = InMemoryLedgerRepository::new();
        repo.insert_tx(&record("a", 1)).unwrap();
        assert!(repo.insert_tx(&record("a", 1)).unwrap_err().is_duplicate());
    }

    #[test]
    fn test_height_range_is_half_open() {
        let repo = InMemoryLedgerRepository::new();
        for (txid, height) in [("a", 9), ("b", 10), ("c", 19), ("d", 20), ("e", -1)] {
            repo.insert_tx(&record(txid, height)).unwrap();
        }
        let ids: Vec<String> = repo
            .briefs_in_heights(10, 20)
            .unwrap()
            .into_iter()
            .map(|b| b.txid)
            .collect();
        assert_eq!(ids, vec!["b", "c"]);
    }

    #[test]
    fn test_points_of_tx_vins_first() {
        let repo = InMemoryLedgerRepository::new();
        let source = TxPoint::vout("s", 0, "x".into(), 3, "code", 0);
        repo.insert_point(&TxPoint::vout("t", 0, "y".into(), 3, "code", 0)).unwrap();
        repo.insert_point(&TxPoint::vin("t", 0, &source, 0)).unwrap();
        let kinds: Vec<PointKind> = repo.points_of_tx("t").unwrap().iter().map(|p| p.kind).collect();
        assert_eq!(kinds, vec![PointKind::Vin, PointKind::Vout]);
    }

    #[test]
    fn test_addr_info_upsert_by_addr() {
        let repo = InMemoryLedgerRepository::new();
        let mut info = AddrInfo {
            appid: "app".into(),
            user_id: 1,
            user_index: 0,
            addr: "addr".into(),
            timestamp: 1,
        };
        repo.upsert_addr_info(&info).unwrap();
        info.user_id = 2;
        repo.upsert_addr_info(&info).unwrap();
        assert!(repo.user_addrs("app", 1, 0).unwrap().is_empty());
        assert_eq!(repo.user_addrs("app", 2, 0).unwrap(), vec!["addr"]);
    }
}
