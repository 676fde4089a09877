//! # Ledger Entities
//!
//! The records a badge node persists and exchanges.
//!
//! ## Clusters
//!
//! - **Transactions**: `TxRecord`, `TxBriefInfo`, `TxState`
//! - **Derived points**: `TxPoint`, `PointKind`, `SpentState`, `TxInventory`
//! - **Sync state**: `PartitionInfo`
//! - **Identity mapping**: `AddrInfo`

use serde::{Deserialize, Serialize};

/// Height recorded for a transaction that is not (yet) in a block.
pub const UNCONFIRMED_HEIGHT: i64 = -1;

/// Maximum size of one stored data chunk of a raw transaction.
pub const TX_SEGMENT_SIZE: usize = 131_070;

/// Chunk index of the metadata-only sentinel row of a stored transaction.
pub const TX_SENTINEL_INDEX: i32 = -1;

/// `pre_index` carried by VOUT points.
pub const NO_PRE_INDEX: i32 = -1;

// =============================================================================
// TRANSACTIONS
// =============================================================================

/// Resolution state of a stored transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TxState {
    /// Ingested, not classified yet.
    New,
    /// Classification deferred until a badge-flagged input's source closes.
    Open,
    /// Fully classified; derived points are durable.
    Closed,
}

impl TxState {
    /// Numeric code used in logs and by the reference wire format.
    pub fn code(self) -> i32 {
        match self {
            TxState::New => 1,
            TxState::Open => 2,
            TxState::Closed => 3,
        }
    }
}

/// Everything known about a transaction except its bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxBriefInfo {
    /// Display-order hex txid.
    pub txid: String,
    /// Confirmation height, [`UNCONFIRMED_HEIGHT`] when unknown.
    pub height: i64,
    /// Containing block hash, empty when unconfirmed.
    pub block_hash: String,
    /// Unix time the node first observed the transaction.
    pub timestamp: i64,
    /// Resolution state.
    pub state: TxState,
}

impl TxBriefInfo {
    /// True once classification is final.
    pub fn is_closed(&self) -> bool {
        self.state == TxState::Closed
    }
}

/// A stored transaction with its canonical raw bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxRecord {
    /// Metadata.
    pub info: TxBriefInfo,
    /// Consensus-serialized transaction bytes.
    pub raw: Vec<u8>,
}

// =============================================================================
// DERIVED POINTS
// =============================================================================

/// Which side of a transfer a point records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PointKind {
    /// Destruction of value: an input consuming an earlier VOUT.
    Vin,
    /// Creation of value at an output index.
    Vout,
}

impl PointKind {
    /// Stable one-byte tag, used in storage keys.
    pub fn tag(self) -> u8 {
        match self {
            PointKind::Vin => 1,
            PointKind::Vout => 2,
        }
    }
}

/// Best-effort spentness cache carried by every point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpentState {
    /// Default for new points.
    MayBeUnspent,
    /// The spending transaction is deeply confirmed.
    PrettySureSpent,
}

/// State filter for point queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateFilter {
    /// Any state.
    All,
    /// Only points in the given state.
    Only(SpentState),
}

impl StateFilter {
    /// Whether `state` passes the filter.
    pub fn matches(self, state: SpentState) -> bool {
        match self {
            StateFilter::All => true,
            StateFilter::Only(wanted) => wanted == state,
        }
    }
}

/// A derived ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxPoint {
    /// Owner address (base58 P2PKH).
    pub addr: String,
    /// Transaction the point belongs to.
    pub txid: String,
    /// Output index (VOUT) or input index (VIN).
    pub index: i32,
    /// VIN or VOUT.
    #[serde(rename = "type")]
    pub kind: PointKind,
    /// Positive for VOUT, negated for VIN.
    pub value: i64,
    /// Consumed transaction (VIN only).
    #[serde(rename = "pretxid")]
    pub pre_txid: String,
    /// Consumed output index (VIN only), [`NO_PRE_INDEX`] for VOUT.
    #[serde(rename = "preindex")]
    pub pre_index: i32,
    /// Txid of the transaction that minted the badge.
    pub badge_code: String,
    /// Observation time of the owning transaction.
    pub timestamp: i64,
    /// Spentness cache.
    pub state: SpentState,
}

impl TxPoint {
    /// Build a VOUT point.
    pub fn vout(
        txid: &str,
        index: i32,
        addr: String,
        value: i64,
        badge_code: &str,
        timestamp: i64,
    ) -> Self {
        Self {
            addr,
            txid: txid.to_string(),
            index,
            kind: PointKind::Vout,
            value,
            pre_txid: String::new(),
            pre_index: NO_PRE_INDEX,
            badge_code: badge_code.to_string(),
            timestamp,
            state: SpentState::MayBeUnspent,
        }
    }

    /// Build the VIN point consuming `spent` at input `index` of `txid`.
    pub fn vin(txid: &str, index: i32, spent: &TxPoint, timestamp: i64) -> Self {
        Self {
            addr: spent.addr.clone(),
            txid: txid.to_string(),
            index,
            kind: PointKind::Vin,
            value: -spent.value,
            pre_txid: spent.txid.clone(),
            pre_index: spent.index,
            badge_code: spent.badge_code.clone(),
            timestamp,
            state: SpentState::MayBeUnspent,
        }
    }
}

/// The points derived from one transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxInventory {
    /// Transaction id.
    pub txid: String,
    /// VIN points followed by VOUT points.
    pub points: Vec<TxPoint>,
}

impl TxInventory {
    /// Empty inventory for `txid`.
    pub fn empty(txid: impl Into<String>) -> Self {
        Self {
            txid: txid.into(),
            points: Vec::new(),
        }
    }

    /// True when the transaction carried no badge activity.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

// =============================================================================
// SYNC STATE
// =============================================================================

/// Stored digest of one partition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionInfo {
    /// Partition id.
    pub id: i64,
    /// SHA-256 over the raw ids of CLOSED transactions in range.
    pub hash: Vec<u8>,
}

// =============================================================================
// IDENTITY MAPPING
// =============================================================================

/// Maps an application user to an address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddrInfo {
    /// Application id.
    pub appid: String,
    /// User id within the application.
    #[serde(rename = "userid")]
    pub user_id: i64,
    /// Address slot of the user.
    pub user_index: i64,
    /// Address.
    pub addr: String,
    /// Last update time.
    pub timestamp: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source_vout() -> TxPoint {
        TxPoint::vout("aa", 1, "addr".to_string(), 500, "code", 10)
    }

    #[test]
    fn test_vin_negates_value_and_links_source() {
        let vin = TxPoint::vin("bb", 0, &source_vout(), 20);
        assert_eq!(vin.value, -500);
        assert_eq!(vin.pre_txid, "aa");
        assert_eq!(vin.pre_index, 1);
        assert_eq!(vin.kind, PointKind::Vin);
        assert_eq!(vin.badge_code, "code");
    }

    #[test]
    fn test_vout_has_no_predecessor() {
        let vout = source_vout();
        assert_eq!(vout.pre_index, NO_PRE_INDEX);
        assert!(vout.pre_txid.is_empty());
        assert_eq!(vout.state, SpentState::MayBeUnspent);
    }

    #[test]
    fn test_state_filter() {
        assert!(StateFilter::All.matches(SpentState::PrettySureSpent));
        assert!(!StateFilter::Only(SpentState::MayBeUnspent).matches(SpentState::PrettySureSpent));
    }

    #[test]
    fn test_point_json_field_names() {
        let json = serde_json::to_value(source_vout()).unwrap();
        assert_eq!(json["pretxid"], "");
        assert_eq!(json["preindex"], -1);
        assert_eq!(json["badge_code"], "code");
    }
}
