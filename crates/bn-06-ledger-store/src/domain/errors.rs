//! # Store Errors

use shared_types::RepositoryError;
use thiserror::Error;

/// Key-value store failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The backend failed.
    #[error("I/O error: {message}")]
    IOError {
        /// Backend message.
        message: String,
    },

    /// A value could not be (de)serialized.
    #[error("codec error at {key}: {message}")]
    Codec {
        /// Printable key.
        key: String,
        /// Codec message.
        message: String,
    },

    /// The configured backend is not compiled in.
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
}

impl From<StoreError> for RepositoryError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Codec { key, message } => RepositoryError::Corruption { key, message },
            other => RepositoryError::Backend(other.to_string()),
        }
    }
}
