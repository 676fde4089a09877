//! # Ledger Errors

use shared_types::RepositoryError;
use thiserror::Error;

/// Ledger state machine failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// A badge input references an output of a `CLOSED` transaction that
    /// carries no VOUT point.
    #[error("unknown utxo {prev_txid}:{prev_index} spent by {txid}")]
    UnknownUtxo {
        /// Spending transaction.
        txid: String,
        /// Transaction that should own the output.
        prev_txid: String,
        /// Output index.
        prev_index: i32,
    },

    /// Badge input values overflowed while summing.
    #[error("badge input value overflow in {txid}")]
    ValueOverflow {
        /// Offending transaction.
        txid: String,
    },

    /// Raw bytes are not a valid transaction.
    #[error("malformed transaction: {0}")]
    MalformedTransaction(String),

    /// Persistence failed.
    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),
}
