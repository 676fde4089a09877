//! # Authentication Errors
//!
//! Every variant is fatal for the connection or call that raised it; there
//! is no partial-trust state.

use shared_crypto::CryptoError;
use thiserror::Error;

use crate::frame::FrameError;

/// Authentication failures.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Timestamp older than the freshness window.
    #[error("sig expired: signed {age}s ago")]
    SignatureExpired {
        /// Seconds since signing.
        age: i64,
    },

    /// Timestamp ahead of the local clock.
    #[error("timestamp {timestamp} is ahead of local time {now}")]
    TimestampInFuture {
        /// Claimed signing time.
        timestamp: i64,
        /// Local time.
        now: i64,
    },

    /// Signature, key or hex decoding failed.
    #[error("crypto: {0}")]
    Crypto(#[from] CryptoError),

    /// Public key not in the allow-list.
    #[error("peer {0} is not allowed")]
    UnknownPeer(String),

    /// A required credential field is absent or empty.
    #[error("missing credential field: {0}")]
    MissingField(&'static str),

    /// A credential field is present but malformed.
    #[error("malformed credential field {field}: {reason}")]
    MalformedField {
        /// Field name.
        field: &'static str,
        /// What was wrong.
        reason: String,
    },

    /// Handshake body could not be decoded.
    #[error("malformed handshake: {0}")]
    Decode(#[from] prost::DecodeError),

    /// Framing failure.
    #[error(transparent)]
    Frame(#[from] FrameError),

    /// Handshake deadline elapsed.
    #[error("handshake timed out")]
    Timeout,

    /// Stream write failed.
    #[error("i/o: {0}")]
    Io(#[from] std::io::Error),
}
