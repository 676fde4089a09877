//! # Query Service
//!
//! Read and wallet-assist operations behind the HTTP API.
//!
//! | Operation | Source |
//! |-----------|--------|
//! | submit raw tx | oracle broadcast, then local ingestion |
//! | tx inventory | points of the tx |
//! | utxos / balance | `MayBeUnspent` points netted by [`compute_utxos`] |
//! | inventories | all points, summed per txid, newest first |
//! | unsigned transfer | user UTXOs selected until the outputs are covered |

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use bitcoin::absolute::LockTime;
use bitcoin::consensus::encode::serialize_hex;
use bitcoin::transaction::Version;
use bitcoin::{Amount, OutPoint, ScriptBuf, Sequence, Transaction, TxIn, TxOut, Txid, Witness};
use bn_01_script_codec::{encode, parse_address};
use bn_03_ledger_state::{compute_utxos, total_value, AddrInfoRepository, TxPointRepository};
use bn_04_partition_sync::{LocalSingleTxSource, SyncService, ORACLE_FAILURE_RESULT};
use serde::{Deserialize, Serialize};
use shared_types::{
    AddrInfo, Network, SpentState, StateFilter, TimeSource, TxInventory, TxPoint,
};
use tracing::{info, warn};

use super::errors::QueryError;

/// Satoshis attached to every badge output of a built transfer.
pub const BADGE_OUTPUT_SATS: u64 = 888;

/// Version of built transfers.
pub const TRANSFER_TX_VERSION: Version = Version::TWO;

/// A user slot owning addresses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRef {
    /// Application id.
    pub appid: String,
    /// User id within the application.
    #[serde(rename = "userid")]
    pub user_id: i64,
    /// Address index of the user.
    pub user_index: i64,
}

/// Slice of a result list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    /// Items to skip.
    pub offset: usize,
    /// Items to return at most.
    pub limit: usize,
}

impl Page {
    /// Validate request values.
    pub fn new(offset: i64, limit: i64) -> Result<Self, QueryError> {
        let offset = usize::try_from(offset)
            .map_err(|_| QueryError::InvalidParameter(format!("offset {offset} < 0")))?;
        let limit = usize::try_from(limit)
            .ok()
            .filter(|l| *l > 0)
            .ok_or_else(|| QueryError::InvalidParameter(format!("limit {limit} <= 0")))?;
        Ok(Self { offset, limit })
    }

    fn apply<T>(self, items: Vec<T>) -> Vec<T> {
        items.into_iter().skip(self.offset).take(self.limit).collect()
    }
}

/// Net value one transaction moved for one address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddrInventory {
    /// Address.
    pub addr: String,
    /// Transaction.
    pub txid: String,
    /// Ingestion time of the transaction.
    pub timestamp: i64,
    /// Sum of the address's points in the transaction.
    pub value: i64,
}

/// One destination of a transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddrAmount {
    /// Destination address.
    pub addr: String,
    /// Badge amount.
    pub amount: i64,
}

/// Parameters of [`QueryService::build_unsigned_transfer`].
#[derive(Debug, Clone)]
pub struct TransferRequest {
    /// Owner of the spent UTXOs.
    pub user: UserRef,
    /// Badge to move.
    pub badge_code: String,
    /// Receives the change.
    pub change_addr: String,
    /// Destinations.
    pub outputs: Vec<AddrAmount>,
    /// Amount destroyed.
    pub burn: i64,
}

/// Unsigned transfer and the points it spends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsignedTransfer {
    /// Hex of the unsigned transaction.
    pub unfinished_tx: String,
    /// Spent VOUT points, in input order.
    pub vins: Vec<TxPoint>,
}

/// Queries over the ledger plus transaction submission.
pub struct QueryService {
    sync: Arc<SyncService>,
    points: Arc<dyn TxPointRepository>,
    addrs: Arc<dyn AddrInfoRepository>,
    clock: Arc<dyn TimeSource>,
}

impl QueryService {
    /// Create a service.
    pub fn new(
        sync: Arc<SyncService>,
        points: Arc<dyn TxPointRepository>,
        addrs: Arc<dyn AddrInfoRepository>,
        clock: Arc<dyn TimeSource>,
    ) -> Self {
        Self {
            sync,
            points,
            addrs,
            clock,
        }
    }

    fn network(&self) -> Network {
        self.sync.config().network
    }

    // =========================================================================
    // TRANSACTIONS
    // =========================================================================

    /// Broadcast a raw transaction and ingest it locally.
    ///
    /// Broadcast failures are logged only; the local ingestion consults
    /// the oracle again and decides.
    pub async fn submit_raw_transaction(&self, raw_hex: &str) -> Result<TxInventory, QueryError> {
        let source = LocalSingleTxSource::from_hex(raw_hex)?;
        let txid = source.txid().to_string();

        match self.sync.oracle().send_tx(raw_hex.trim()).await {
            Ok(result) if result.return_result == ORACLE_FAILURE_RESULT => {
                warn!(txid = %txid, "[node] oracle refused broadcast: {}", result.result_description)
            }
            Ok(_) => info!(txid = %txid, "[node] broadcast accepted"),
            Err(e) => warn!(txid = %txid, "[node] broadcast failed: {}", e),
        }

        let (txid, report) = self.sync.submit_local(raw_hex).await?;
        if let Some((failed, e)) = report.batch.errors.first() {
            warn!(txid = %failed, "[node] submitted tx rejected: {}", e);
            return Err(e.clone().into());
        }
        if let Some(inventory) = report.batch.outcome(&txid).and_then(|o| o.inventory()) {
            return Ok(inventory.clone());
        }
        self.transaction_inventory(&txid)
    }

    /// Classified points of a transaction, VINs first.
    pub fn transaction_inventory(&self, txid: &str) -> Result<TxInventory, QueryError> {
        let points = self.points.points_of_tx(txid)?;
        if points.is_empty() {
            return Err(QueryError::NotFound(format!("unknown tx {txid}")));
        }
        Ok(TxInventory {
            txid: txid.to_string(),
            points,
        })
    }

    // =========================================================================
    // ADDRESSES
    // =========================================================================

    fn addr_points(
        &self,
        addr: &str,
        badge_code: Option<&str>,
        filter: StateFilter,
    ) -> Result<Vec<TxPoint>, QueryError> {
        if addr.is_empty() {
            return Err(QueryError::InvalidParameter("empty addr".into()));
        }
        let points = self.points.points_of_addr(addr, non_empty(badge_code), filter)?;
        if points.is_empty() && !self.addr_known(addr, badge_code, filter)? {
            return Err(QueryError::NotFound(format!("unknown addr {addr}")));
        }
        Ok(points)
    }

    /// Whether `addr` has any point at all.
    fn addr_known(
        &self,
        addr: &str,
        badge_code: Option<&str>,
        filter: StateFilter,
    ) -> Result<bool, QueryError> {
        // Already looked at every point of this badge.
        if filter == StateFilter::All && non_empty(badge_code).is_none() {
            return Ok(false);
        }
        Ok(!self
            .points
            .points_of_addr(addr, None, StateFilter::All)?
            .is_empty())
    }

    fn addr_utxo_points(&self, addr: &str, badge_code: Option<&str>) -> Result<Vec<TxPoint>, QueryError> {
        let points = self.addr_points(addr, badge_code, StateFilter::Only(SpentState::MayBeUnspent))?;
        Ok(sorted_oldest_first(compute_utxos(&points)))
    }

    /// Unspent badge outputs of `addr`, oldest first.
    pub fn addr_utxos(
        &self,
        addr: &str,
        badge_code: Option<&str>,
        page: Page,
    ) -> Result<Vec<TxPoint>, QueryError> {
        Ok(page.apply(self.addr_utxo_points(addr, badge_code)?))
    }

    /// Sum of the unspent outputs of `addr`.
    pub fn addr_balance(&self, addr: &str, badge_code: Option<&str>) -> Result<i64, QueryError> {
        Ok(total_value(&self.addr_utxo_points(addr, badge_code)?))
    }

    /// Per-transaction history of `addr`, newest first.
    pub fn addr_inventories(
        &self,
        addr: &str,
        badge_code: Option<&str>,
        page: Page,
    ) -> Result<Vec<AddrInventory>, QueryError> {
        let points = self.addr_points(addr, badge_code, StateFilter::All)?;
        Ok(page.apply(aggregate_by_txid(&points)))
    }

    // =========================================================================
    // USERS
    // =========================================================================

    /// Register `addr` to a user slot, replacing any previous owner.
    pub fn set_addr_info(&self, user: &UserRef, addr: &str) -> Result<AddrInfo, QueryError> {
        if user.appid.is_empty() {
            return Err(QueryError::InvalidParameter("empty appid".into()));
        }
        parse_address(addr, self.network())?;
        let info = AddrInfo {
            appid: user.appid.clone(),
            user_id: user.user_id,
            user_index: user.user_index,
            addr: addr.to_string(),
            timestamp: self.clock.now(),
        };
        self.addrs.upsert_addr_info(&info)?;
        info!(addr = %addr, "[node] address registered to {}/{}/{}", user.appid, user.user_id, user.user_index);
        Ok(info)
    }

    fn user_points(
        &self,
        user: &UserRef,
        badge_code: Option<&str>,
        filter: StateFilter,
    ) -> Result<Vec<TxPoint>, QueryError> {
        let addrs = self
            .addrs
            .user_addrs(&user.appid, user.user_id, user.user_index)?;
        if addrs.is_empty() {
            return Err(QueryError::NotFound(format!(
                "unknown user {}/{}/{}",
                user.appid, user.user_id, user.user_index
            )));
        }
        let mut points = Vec::new();
        for addr in addrs {
            points.extend(self.points.points_of_addr(&addr, non_empty(badge_code), filter)?);
        }
        Ok(points)
    }

    fn user_utxo_points(&self, user: &UserRef, badge_code: Option<&str>) -> Result<Vec<TxPoint>, QueryError> {
        let points = self.user_points(user, badge_code, StateFilter::Only(SpentState::MayBeUnspent))?;
        Ok(sorted_oldest_first(compute_utxos(&points)))
    }

    /// Unspent outputs over every address of a user.
    pub fn user_utxos(
        &self,
        user: &UserRef,
        badge_code: Option<&str>,
        page: Page,
    ) -> Result<Vec<TxPoint>, QueryError> {
        Ok(page.apply(self.user_utxo_points(user, badge_code)?))
    }

    /// Balance over every address of a user.
    pub fn user_balance(&self, user: &UserRef, badge_code: Option<&str>) -> Result<i64, QueryError> {
        Ok(total_value(&self.user_utxo_points(user, badge_code)?))
    }

    /// History over every address of a user, newest first.
    pub fn user_inventories(
        &self,
        user: &UserRef,
        badge_code: Option<&str>,
        page: Page,
    ) -> Result<Vec<AddrInventory>, QueryError> {
        let points = self.user_points(user, badge_code, StateFilter::All)?;
        Ok(page.apply(aggregate_by_txid(&points)))
    }

    // =========================================================================
    // TRANSFERS
    // =========================================================================

    /// Build an unsigned transfer of one badge from a user's UTXOs.
    ///
    /// Each destination gets an output of [`BADGE_OUTPUT_SATS`]; inputs are
    /// taken oldest first until they cover the outputs plus `burn`, and any
    /// surplus goes back to `change_addr`.
    pub fn build_unsigned_transfer(
        &self,
        request: &TransferRequest,
    ) -> Result<UnsignedTransfer, QueryError> {
        if request.burn < 0 {
            return Err(QueryError::InvalidParameter(format!(
                "amount to burn {} < 0",
                request.burn
            )));
        }
        if request.badge_code.is_empty() {
            return Err(QueryError::InvalidParameter("empty badge_code".into()));
        }
        let network = self.network();
        let change_addr = parse_address(&request.change_addr, network)?;

        let mut output = Vec::with_capacity(request.outputs.len() + 1);
        let mut needed = request.burn;
        for destination in &request.outputs {
            let addr = parse_address(&destination.addr, network)?;
            output.push(badge_txout(encode(&addr, destination.amount)?));
            needed = needed
                .checked_add(destination.amount)
                .ok_or_else(|| QueryError::InvalidParameter("output total overflows".into()))?;
        }

        let mut input = Vec::new();
        let mut vins = Vec::new();
        let mut covered = 0i64;
        for utxo in self.user_utxo_points(&request.user, Some(&request.badge_code))? {
            if covered >= needed {
                break;
            }
            let txid = Txid::from_str(&utxo.txid)
                .map_err(|e| QueryError::Service(format!("stored txid {}: {e}", utxo.txid)))?;
            input.push(TxIn {
                previous_output: OutPoint::new(txid, utxo.index as u32),
                script_sig: ScriptBuf::new(),
                sequence: Sequence::MAX,
                witness: Witness::new(),
            });
            covered = covered.saturating_add(utxo.value);
            vins.push(utxo);
        }

        let change = covered - needed;
        if change < 0 {
            return Err(QueryError::NotEnoughBadge {
                needed,
                available: covered,
            });
        }
        if change > 0 {
            output.push(badge_txout(encode(&change_addr, change)?));
        }

        let tx = Transaction {
            version: TRANSFER_TX_VERSION,
            lock_time: LockTime::ZERO,
            input,
            output,
        };
        Ok(UnsignedTransfer {
            unfinished_tx: serialize_hex(&tx),
            vins,
        })
    }
}

fn badge_txout(script_pubkey: ScriptBuf) -> TxOut {
    TxOut {
        value: Amount::from_sat(BADGE_OUTPUT_SATS),
        script_pubkey,
    }
}

fn non_empty(badge_code: Option<&str>) -> Option<&str> {
    badge_code.filter(|code| !code.is_empty())
}

fn sorted_oldest_first(mut points: Vec<TxPoint>) -> Vec<TxPoint> {
    points.sort_by(|a, b| {
        a.timestamp
            .cmp(&b.timestamp)
            .then_with(|| a.txid.cmp(&b.txid))
            .then_with(|| a.index.cmp(&b.index))
    });
    points
}

/// Sum points per txid; newest first.
fn aggregate_by_txid(points: &[TxPoint]) -> Vec<AddrInventory> {
    let mut order: Vec<AddrInventory> = Vec::new();
    let mut slots: HashMap<&str, usize> = HashMap::new();
    for point in points {
        match slots.get(point.txid.as_str()) {
            Some(&slot) => order[slot].value = order[slot].value.saturating_add(point.value),
            None => {
                slots.insert(point.txid.as_str(), order.len());
                order.push(AddrInventory {
                    addr: point.addr.clone(),
                    txid: point.txid.clone(),
                    timestamp: point.timestamp,
                    value: point.value,
                });
            }
        }
    }
    order.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| a.txid.cmp(&b.txid)));
    order
}
