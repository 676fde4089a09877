//! # Connection Handshake
//!
//! Performed once, right after the transport connects and before any RPC:
//!
//! ```text
//! initiator                                acceptor
//!     | u32 LE len | AuthRequest{sig,pk,ts} |
//!     |--------------------------------------->  read 4 bytes, len <= 1000
//!                                                read len bytes, decode
//!                                                pk allowed? ts fresh? sig ok?
//! ```
//!
//! The acceptor bounds the whole exchange with [`HANDSHAKE_TIMEOUT`]. The
//! initiator gets no reply; a rejected connection is simply closed.

use std::time::Duration;

use prost::Message;
use shared_crypto::{Secp256k1KeyPair, Secp256k1PublicKey, Secp256k1Signature};
use shared_types::wire::AuthRequest;
use shared_types::TimeSource;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::allow_list::AllowList;
use crate::errors::AuthError;
use crate::frame::{write_frame, FrameReader};
use crate::timestamp::{sign_timestamp, verify_timestamp_signature};

/// Largest accepted handshake body.
pub const MAX_HANDSHAKE_BODY: usize = 1000;

/// Deadline for the acceptor side of the handshake.
pub const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Identity established by a successful handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthInfo {
    /// The authenticated peer.
    pub peer: Secp256k1PublicKey,
}

/// Build the signed handshake body for `now`.
pub fn build_auth_request(keypair: &Secp256k1KeyPair, now: i64) -> Result<AuthRequest, AuthError> {
    Ok(AuthRequest {
        signature: sign_timestamp(keypair, now)?.as_bytes().to_vec(),
        pubkey: keypair.public_key().as_bytes().to_vec(),
        timestamp: now,
    })
}

/// Initiator side: send the signed handshake frame.
pub async fn client_handshake<W: AsyncWrite + Unpin>(
    writer: &mut W,
    keypair: &Secp256k1KeyPair,
    now: i64,
) -> Result<(), AuthError> {
    let request = build_auth_request(keypair, now)?;
    write_frame(writer, &request.encode_to_vec()).await?;
    Ok(())
}

/// Acceptor side: read and verify the handshake under the deadline.
pub async fn server_handshake<R: AsyncRead + Unpin>(
    reader: &mut FrameReader<R>,
    allow_list: &AllowList,
    clock: &dyn TimeSource,
) -> Result<AuthInfo, AuthError> {
    server_handshake_with_timeout(reader, allow_list, clock, HANDSHAKE_TIMEOUT).await
}

/// [`server_handshake`] with an explicit deadline.
pub async fn server_handshake_with_timeout<R: AsyncRead + Unpin>(
    reader: &mut FrameReader<R>,
    allow_list: &AllowList,
    clock: &dyn TimeSource,
    deadline: Duration,
) -> Result<AuthInfo, AuthError> {
    let body = tokio::time::timeout(deadline, reader.read_frame(MAX_HANDSHAKE_BODY))
        .await
        .map_err(|_| AuthError::Timeout)??;
    let request = AuthRequest::decode(body.as_slice())?;
    let info = verify_auth_request(&request, allow_list, clock.now())?;
    tracing::debug!("[bn-02] handshake accepted from {}", info.peer);
    Ok(info)
}

/// Verify a decoded handshake body.
pub fn verify_auth_request(
    request: &AuthRequest,
    allow_list: &AllowList,
    now: i64,
) -> Result<AuthInfo, AuthError> {
    let peer = Secp256k1PublicKey::from_slice(&request.pubkey)?;
    if !allow_list.contains(&peer) {
        return Err(AuthError::UnknownPeer(peer.to_hex()));
    }
    let signature = Secp256k1Signature::from_der(&request.signature)?;
    verify_timestamp_signature(&peer, request.timestamp, &signature, now)?;
    Ok(AuthInfo { peer })
}
