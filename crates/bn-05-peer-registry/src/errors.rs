//! # Peer Errors

use std::io;

use bn_02_peer_auth::{AuthError, FrameError};
use bn_04_partition_sync::SyncError;
use shared_crypto::CryptoError;
use shared_types::IdError;
use thiserror::Error;

/// Peer transport failures.
#[derive(Debug, Error)]
pub enum PeerError {
    /// Handshake or call authentication failed.
    #[error("auth: {0}")]
    Auth(#[from] AuthError),

    /// Framing failed.
    #[error("frame: {0}")]
    Frame(#[from] FrameError),

    /// Socket failure.
    #[error("i/o: {0}")]
    Io(#[from] io::Error),

    /// Frame body is not a valid message.
    #[error("decode: {0}")]
    Decode(#[from] prost::DecodeError),

    /// Configured pubkey is not a valid key.
    #[error("invalid peer key: {0}")]
    InvalidPubkey(#[from] CryptoError),

    /// A txid on the wire has the wrong length.
    #[error("invalid txid: {0}")]
    InvalidId(#[from] IdError),

    /// The peer answered with an error.
    #[error("remote error: {0}")]
    Remote(String),

    /// The peer answered with the wrong body kind.
    #[error("unexpected response, wanted {0}")]
    UnexpectedResponse(&'static str),

    /// Dial or call deadline passed.
    #[error("timed out")]
    Timeout,

    /// The serving side failed.
    #[error("sync: {0}")]
    Sync(#[from] SyncError),

    /// Some configured peers could not be reached.
    #[error("failed to connect to {} peer(s): {}", failed.len(), failed.join(", "))]
    PartialConnect {
        /// Pubkeys that failed.
        failed: Vec<String>,
    },
}

impl PeerError {
    /// True when the stream must be dropped and redialed.
    pub fn breaks_stream(&self) -> bool {
        matches!(
            self,
            PeerError::Frame(_) | PeerError::Io(_) | PeerError::Decode(_) | PeerError::Timeout
        )
    }
}
