//! # Query Errors

use bn_01_script_codec::ScriptError;
use bn_03_ledger_state::LedgerError;
use bn_04_partition_sync::SyncError;
use shared_types::RepositoryError;
use thiserror::Error;

/// Failures of the query surface.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// No such transaction, or it has not been resolved yet.
    #[error("not found: {0}")]
    NotFound(String),

    /// A request field is missing or malformed.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The selected UTXOs do not cover the outputs.
    #[error("not enough badge: need {needed}, have {available}")]
    NotEnoughBadge {
        /// Outputs plus burn.
        needed: i64,
        /// Sum of the user's spendable points.
        available: i64,
    },

    /// A badge input spends an output without a VOUT point.
    #[error("unknown utxo: {0}")]
    UnknownUtxo(String),

    /// Badge inputs cannot be summed.
    #[error("illegal vin: {0}")]
    IllegalVin(String),

    /// Storage, oracle or peer failure.
    #[error("service error: {0}")]
    Service(String),
}

impl From<LedgerError> for QueryError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::UnknownUtxo { .. } => QueryError::UnknownUtxo(e.to_string()),
            LedgerError::ValueOverflow { .. } => QueryError::IllegalVin(e.to_string()),
            LedgerError::MalformedTransaction(_) => QueryError::InvalidParameter(e.to_string()),
            LedgerError::Repository(_) => QueryError::Service(e.to_string()),
        }
    }
}

impl From<SyncError> for QueryError {
    fn from(e: SyncError) -> Self {
        match e {
            SyncError::Ledger(inner) => inner.into(),
            SyncError::InvalidId(_) | SyncError::Source(_) => {
                QueryError::InvalidParameter(e.to_string())
            }
            other => QueryError::Service(other.to_string()),
        }
    }
}

impl From<RepositoryError> for QueryError {
    fn from(e: RepositoryError) -> Self {
        QueryError::Service(e.to_string())
    }
}

impl From<ScriptError> for QueryError {
    fn from(e: ScriptError) -> Self {
        QueryError::InvalidParameter(e.to_string())
    }
}
