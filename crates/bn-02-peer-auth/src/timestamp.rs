//! Signed timestamps.
//!
//! Both authentication layers sign the same message: the unix timestamp as
//! 8 little-endian bytes, signed as a raw prehash (left-padded to 32 bytes)
//! rather than hashed first. Verifiers rebuild exactly this layout.

use shared_crypto::{Secp256k1KeyPair, Secp256k1PublicKey, Secp256k1Signature};

use crate::errors::AuthError;

/// Maximum age of a signed timestamp, in seconds.
pub const FRESHNESS_WINDOW_SECS: i64 = 10;

/// The signed message for `timestamp`.
pub fn timestamp_message(timestamp: i64) -> [u8; 8] {
    timestamp.to_le_bytes()
}

/// Sign `timestamp` with the node key.
pub fn sign_timestamp(
    keypair: &Secp256k1KeyPair,
    timestamp: i64,
) -> Result<Secp256k1Signature, AuthError> {
    Ok(keypair.sign_prehash(&timestamp_message(timestamp))?)
}

/// Check freshness against `now`, then the signature.
pub fn verify_timestamp_signature(
    pubkey: &Secp256k1PublicKey,
    timestamp: i64,
    signature: &Secp256k1Signature,
    now: i64,
) -> Result<(), AuthError> {
    if timestamp > now {
        return Err(AuthError::TimestampInFuture { timestamp, now });
    }
    let age = now - timestamp;
    if age > FRESHNESS_WINDOW_SECS {
        return Err(AuthError::SignatureExpired { age });
    }
    pubkey.verify_prehash(&timestamp_message(timestamp), signature)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000;

    #[test]
    fn test_message_layout() {
        assert_eq!(timestamp_message(1), [1, 0, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_signature_is_over_padded_raw_bytes() {
        let keypair = Secp256k1KeyPair::from_bytes([0x11u8; 32]).unwrap();
        let sig = sign_timestamp(&keypair, NOW).unwrap();

        let mut padded = [0u8; 32];
        padded[24..].copy_from_slice(&NOW.to_le_bytes());
        assert_eq!(sig, keypair.sign_prehash(&padded).unwrap());
        assert!(keypair.public_key().verify_prehash(&padded, &sig).is_ok());
        assert!(keypair.public_key().verify(&timestamp_message(NOW), &sig).is_err());

        // A SHA-256 signature over the same bytes is refused.
        let hashed = keypair.sign(&timestamp_message(NOW));
        assert!(matches!(
            verify_timestamp_signature(&keypair.public_key(), NOW, &hashed, NOW),
            Err(AuthError::Crypto(_))
        ));
    }

    #[test]
    fn test_fresh_signature_accepted_at_window_edge() {
        let keypair = Secp256k1KeyPair::generate();
        let sig = sign_timestamp(&keypair, NOW - FRESHNESS_WINDOW_SECS).unwrap();
        assert!(verify_timestamp_signature(&keypair.public_key(), NOW - 10, &sig, NOW).is_ok());
    }

    #[test]
    fn test_expired_signature_rejected() {
        let keypair = Secp256k1KeyPair::generate();
        let sig = sign_timestamp(&keypair, NOW - 11).unwrap();
        assert!(matches!(
            verify_timestamp_signature(&keypair.public_key(), NOW - 11, &sig, NOW),
            Err(AuthError::SignatureExpired { age: 11 })
        ));
    }

    #[test]
    fn test_future_timestamp_rejected() {
        let keypair = Secp256k1KeyPair::generate();
        let sig = sign_timestamp(&keypair, NOW + 1).unwrap();
        assert!(matches!(
            verify_timestamp_signature(&keypair.public_key(), NOW + 1, &sig, NOW),
            Err(AuthError::TimestampInFuture { .. })
        ));
    }

    #[test]
    fn test_signature_over_other_timestamp_rejected() {
        let keypair = Secp256k1KeyPair::generate();
        let sig = sign_timestamp(&keypair, NOW - 1).unwrap();
        assert!(matches!(
            verify_timestamp_signature(&keypair.public_key(), NOW, &sig, NOW),
            Err(AuthError::Crypto(_))
        ));
    }
}
