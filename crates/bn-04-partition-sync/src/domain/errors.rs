//! # Sync Errors

use bn_03_ledger_state::LedgerError;
use shared_types::{IdError, RepositoryError};
use thiserror::Error;

use super::oracle::OracleError;

/// Partition sync failures.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Local storage failed.
    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// Classification failed outside a batch.
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// Chain oracle failed.
    #[error("oracle error: {0}")]
    Oracle(#[from] OracleError),

    /// A peer call failed.
    #[error("peer {peer}: {message}")]
    Peer {
        /// Hex pubkey of the peer.
        peer: String,
        /// Failure description.
        message: String,
    },

    /// No connection for the given pubkey.
    #[error("peer not connected: {0}")]
    UnknownPeer(String),

    /// A transaction source refused the request.
    #[error("tx source error: {0}")]
    Source(String),

    /// A transaction id is not valid hex of the right length.
    #[error("invalid txid: {0}")]
    InvalidId(#[from] IdError),

    /// Malformed partition range.
    #[error("invalid partition range offset={offset} count={count}")]
    InvalidRange {
        /// First id.
        offset: i64,
        /// Number of ids.
        count: i64,
    },
}
