//! # Error Types
//!
//! Errors shared across subsystems.

use thiserror::Error;

/// Errors returned by ledger repositories.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    /// A row with the same unique key already exists.
    #[error("duplicate key: {0}")]
    DuplicateKey(String),

    /// The row to update does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A stored value could not be decoded.
    #[error("corrupted record {key}: {message}")]
    Corruption { key: String, message: String },

    /// The storage backend failed.
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl RepositoryError {
    /// True for errors that an idempotent insert may ignore.
    pub fn is_duplicate(&self) -> bool {
        matches!(self, RepositoryError::DuplicateKey(_))
    }
}

/// Malformed transaction id.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdError {
    /// Not a hex string.
    #[error("txid is not hex: {0}")]
    NotHex(String),

    /// Wrong number of bytes.
    #[error("txid must be 32 bytes, got {0}")]
    WrongLength(usize),
}
