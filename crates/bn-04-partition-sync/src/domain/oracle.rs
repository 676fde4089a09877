//! # Chain Oracle Types
//!
//! Payloads reported by the external merchant API oracle. Field names
//! follow the oracle's JSON so adapters can deserialize them directly.

use serde::{Deserialize, Serialize};
use shared_types::UNCONFIRMED_HEIGHT;
use thiserror::Error;

/// Substring of `resultDescription` for a transaction the chain has never
/// seen or has dropped.
pub const ORACLE_NOT_FOUND_PHRASE: &str = "No such mempool or blockchain transaction";

/// `returnResult` of a rejected query or submission.
pub const ORACLE_FAILURE_RESULT: &str = "failure";

/// Oracle call failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OracleError {
    /// Request did not complete.
    #[error("oracle unreachable: {0}")]
    Transport(String),

    /// Response could not be parsed.
    #[error("oracle response malformed: {0}")]
    Decode(String),

    /// Oracle answered with a non-success status.
    #[error("oracle rejected request: {0}")]
    Rejected(String),
}

/// Current chain tip.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FeeQuote {
    /// Height of the best block.
    pub current_highest_block_height: i64,
    /// Hash of the best block.
    pub current_highest_block_hash: String,
}

/// Confirmation status of one transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TxStatus {
    /// `success` or `failure`.
    pub return_result: String,
    /// Free-form detail, carries the not-found phrase.
    pub result_description: String,
    /// Containing block, empty while unconfirmed.
    pub block_hash: String,
    /// Containing block height, 0 while unconfirmed.
    pub block_height: i64,
    /// Confirmation count.
    pub confirmations: i64,
}

impl TxStatus {
    /// Status of a mined transaction.
    pub fn confirmed(height: i64, block_hash: impl Into<String>) -> Self {
        Self {
            return_result: "success".into(),
            block_hash: block_hash.into(),
            block_height: height,
            confirmations: 1,
            ..Default::default()
        }
    }

    /// Status of a mempool transaction.
    pub fn unconfirmed() -> Self {
        Self {
            return_result: "success".into(),
            ..Default::default()
        }
    }

    /// Status of a transaction the chain does not know.
    pub fn missing() -> Self {
        Self {
            return_result: ORACLE_FAILURE_RESULT.into(),
            result_description: ORACLE_NOT_FOUND_PHRASE.into(),
            ..Default::default()
        }
    }

    /// The oracle rejected the query.
    pub fn is_failure(&self) -> bool {
        self.return_result == ORACLE_FAILURE_RESULT
    }

    /// The chain no longer knows the transaction.
    pub fn is_missing(&self) -> bool {
        self.result_description.contains(ORACLE_NOT_FOUND_PHRASE)
    }

    /// Height to record at ingestion: the block height once a block hash is
    /// known, else unconfirmed.
    pub fn ingest_height(&self) -> i64 {
        if self.block_hash.is_empty() {
            UNCONFIRMED_HEIGHT
        } else {
            self.block_height
        }
    }

    /// Height used when repairing drift: 0 means unconfirmed.
    pub fn repair_height(&self) -> i64 {
        if self.block_height == 0 {
            UNCONFIRMED_HEIGHT
        } else {
            self.block_height
        }
    }
}

/// Outcome of broadcasting a transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SubmitResult {
    /// `success` or `failure`.
    pub return_result: String,
    /// Free-form detail.
    pub result_description: String,
    /// Id of the submitted transaction.
    pub txid: String,
}
