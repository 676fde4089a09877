//! # Per-Call Credential
//!
//! Every RPC carries freshly signed metadata, verified by the server-side
//! interceptor independently of the connection handshake.

use std::sync::Arc;

use shared_crypto::{Secp256k1KeyPair, Secp256k1PublicKey, Secp256k1Signature};
use shared_types::wire::CallMetadata;
use shared_types::TimeSource;

use crate::allow_list::AllowList;
use crate::errors::AuthError;
use crate::timestamp::{sign_timestamp, verify_timestamp_signature};

/// Sign call metadata for `now`.
pub fn sign_call(keypair: &Secp256k1KeyPair, now: i64) -> Result<CallMetadata, AuthError> {
    Ok(CallMetadata {
        pubkey: keypair.public_key().to_hex(),
        timestamp: now.to_string(),
        signature: sign_timestamp(keypair, now)?.to_hex(),
    })
}

/// Server-side interceptor authorizing each call.
#[derive(Clone)]
pub struct CallAuthenticator {
    allow_list: AllowList,
    clock: Arc<dyn TimeSource>,
}

impl CallAuthenticator {
    /// Authenticator over the configured peers.
    pub fn new(allow_list: AllowList, clock: Arc<dyn TimeSource>) -> Self {
        Self { allow_list, clock }
    }

    /// Verify call metadata; returns the caller's key.
    pub fn authorize(&self, metadata: Option<&CallMetadata>) -> Result<Secp256k1PublicKey, AuthError> {
        let metadata = metadata.ok_or(AuthError::MissingField("metadata"))?;

        let pubkey_hex = required(&metadata.pubkey, "pubkey")?;
        let timestamp = required(&metadata.timestamp, "timestamp")?;
        let signature_hex = required(&metadata.signature, "signature")?;

        let pubkey = Secp256k1PublicKey::from_hex(pubkey_hex)?;
        if !self.allow_list.contains(&pubkey) {
            return Err(AuthError::UnknownPeer(pubkey.to_hex()));
        }
        let timestamp: i64 = timestamp.parse().map_err(|e: std::num::ParseIntError| {
            AuthError::MalformedField {
                field: "timestamp",
                reason: e.to_string(),
            }
        })?;
        let signature = Secp256k1Signature::from_hex(signature_hex)?;

        verify_timestamp_signature(&pubkey, timestamp, &signature, self.clock.now())?;
        Ok(pubkey)
    }
}

fn required<'a>(value: &'a str, field: &'static str) -> Result<&'a str, AuthError> {
    if value.is_empty() {
        return Err(AuthError::MissingField(field));
    }
    Ok(value)
}
