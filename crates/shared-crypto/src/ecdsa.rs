//! # ECDSA Signatures (secp256k1)
//!
//! Node identity keys and DER-encoded signatures on the secp256k1 curve.
//!
//! ## Security Properties
//!
//! - RFC 6979 deterministic nonces (no RNG dependency for signing)
//! - Messages are hashed with SHA-256 before signing, except through the
//!   prehash pair, which signs short digests left-padded to 32 bytes
//! - Low-S normalization on sign and on verify
//!
//! ## Use Cases
//!
//! - Peer handshake and per-call credentials
//! - Signed requests to the fee/broadcast oracle

use crate::CryptoError;
use k256::ecdsa::{
    signature::{
        hazmat::{PrehashSigner, PrehashVerifier},
        Signer, Verifier,
    },
    Signature, SigningKey, VerifyingKey,
};
use zeroize::Zeroize;

/// Width of a secp256k1 prehash.
pub const PREHASH_LEN: usize = 32;

/// Left-pad `prehash` with zeros to the scalar width, so a short message
/// reads as the same big-endian integer.
pub fn pad_prehash(prehash: &[u8]) -> Result<[u8; PREHASH_LEN], CryptoError> {
    if prehash.len() > PREHASH_LEN {
        return Err(CryptoError::InvalidPrehash(prehash.len()));
    }
    let mut padded = [0u8; PREHASH_LEN];
    padded[PREHASH_LEN - prehash.len()..].copy_from_slice(prehash);
    Ok(padded)
}

/// Compressed secp256k1 public key (33 bytes).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Secp256k1PublicKey([u8; 33]);

impl Secp256k1PublicKey {
    /// Create from compressed bytes (33 bytes, starting with 0x02 or 0x03).
    pub fn from_bytes(bytes: [u8; 33]) -> Result<Self, CryptoError> {
        VerifyingKey::from_sec1_bytes(&bytes).map_err(|_| CryptoError::InvalidPublicKey)?;
        Ok(Self(bytes))
    }

    /// Create from a slice that must hold exactly one compressed key.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        let array: [u8; 33] = bytes.try_into().map_err(|_| CryptoError::InvalidPublicKey)?;
        Self::from_bytes(array)
    }

    /// Parse from lowercase or uppercase hex.
    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        let bytes = hex::decode(s).map_err(|e| CryptoError::InvalidHex(e.to_string()))?;
        Self::from_slice(&bytes)
    }

    /// Get raw compressed bytes.
    pub fn as_bytes(&self) -> &[u8; 33] {
        &self.0
    }

    /// Lowercase hex of the compressed key.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Verify a signature over `message`.
    pub fn verify(
        &self,
        message: &[u8],
        signature: &Secp256k1Signature,
    ) -> Result<(), CryptoError> {
        let verifying_key =
            VerifyingKey::from_sec1_bytes(&self.0).map_err(|_| CryptoError::InvalidPublicKey)?;

        let sig = Signature::from_der(&signature.0).map_err(|_| CryptoError::InvalidSignature)?;
        let sig = sig.normalize_s().unwrap_or(sig);

        verifying_key
            .verify(message, &sig)
            .map_err(|_| CryptoError::SignatureVerificationFailed)
    }

    /// Verify a signature over `prehash` taken as-is, without hashing.
    pub fn verify_prehash(
        &self,
        prehash: &[u8],
        signature: &Secp256k1Signature,
    ) -> Result<(), CryptoError> {
        let padded = pad_prehash(prehash)?;
        let verifying_key =
            VerifyingKey::from_sec1_bytes(&self.0).map_err(|_| CryptoError::InvalidPublicKey)?;

        let sig = Signature::from_der(&signature.0).map_err(|_| CryptoError::InvalidSignature)?;
        let sig = sig.normalize_s().unwrap_or(sig);

        verifying_key
            .verify_prehash(&padded, &sig)
            .map_err(|_| CryptoError::SignatureVerificationFailed)
    }
}

impl std::fmt::Display for Secp256k1PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// DER-encoded ECDSA signature.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Secp256k1Signature(Vec<u8>);

impl Secp256k1Signature {
    /// Wrap DER bytes after checking they parse.
    pub fn from_der(bytes: &[u8]) -> Result<Self, CryptoError> {
        Signature::from_der(bytes).map_err(|_| CryptoError::InvalidSignature)?;
        Ok(Self(bytes.to_vec()))
    }

    /// Parse hex-encoded DER.
    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        let bytes = hex::decode(s).map_err(|e| CryptoError::InvalidHex(e.to_string()))?;
        Self::from_der(&bytes)
    }

    /// Get DER bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Hex of the DER bytes.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }
}

/// secp256k1 ECDSA keypair.
pub struct Secp256k1KeyPair {
    signing_key: SigningKey,
}

impl Secp256k1KeyPair {
    /// Generate random keypair.
    pub fn generate() -> Self {
        let signing_key = SigningKey::random(&mut rand::thread_rng());
        Self { signing_key }
    }

    /// Create from secret key bytes (32 bytes).
    pub fn from_bytes(bytes: [u8; 32]) -> Result<Self, CryptoError> {
        let signing_key =
            SigningKey::from_bytes((&bytes).into()).map_err(|_| CryptoError::InvalidPrivateKey)?;
        Ok(Self { signing_key })
    }

    /// Create from a 64-character hex secret key.
    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        let mut bytes = hex::decode(s.trim()).map_err(|e| CryptoError::InvalidHex(e.to_string()))?;
        let array: Result<[u8; 32], _> = bytes.as_slice().try_into();
        bytes.zeroize();
        Self::from_bytes(array.map_err(|_| CryptoError::InvalidPrivateKey)?)
    }

    /// Get public key (compressed, 33 bytes).
    pub fn public_key(&self) -> Secp256k1PublicKey {
        let encoded = self.signing_key.verifying_key().to_encoded_point(true);
        let mut bytes = [0u8; 33];
        bytes.copy_from_slice(encoded.as_bytes());
        Secp256k1PublicKey(bytes)
    }

    /// Sign SHA-256(`message`) (deterministic RFC 6979), DER-encoded.
    pub fn sign(&self, message: &[u8]) -> Secp256k1Signature {
        let sig: Signature = self.signing_key.sign(message);
        Secp256k1Signature(sig.to_der().as_bytes().to_vec())
    }

    /// Sign `prehash` directly (at most 32 bytes, left-padded), DER-encoded.
    pub fn sign_prehash(&self, prehash: &[u8]) -> Result<Secp256k1Signature, CryptoError> {
        let padded = pad_prehash(prehash)?;
        let sig: Signature = self
            .signing_key
            .sign_prehash(&padded)
            .map_err(|_| CryptoError::SigningFailed)?;
        Ok(Secp256k1Signature(sig.to_der().as_bytes().to_vec()))
    }

    /// Get secret key bytes (for serialization).
    pub fn to_bytes(&self) -> [u8; 32] {
        self.signing_key.to_bytes().into()
    }
}

impl Clone for Secp256k1KeyPair {
    fn clone(&self) -> Self {
        Self {
            signing_key: self.signing_key.clone(),
        }
    }
}

impl std::fmt::Debug for Secp256k1KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secp256k1KeyPair")
            .field("public_key", &self.public_key())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_verify() {
        let keypair = Secp256k1KeyPair::generate();
        let message = b"Hello, secp256k1!";

        let signature = keypair.sign(message);
        let result = keypair.public_key().verify(message, &signature);

        assert!(result.is_ok());
    }

    #[test]
    fn test_wrong_message_fails() {
        let keypair = Secp256k1KeyPair::generate();

        let signature = keypair.sign(b"message1");
        let result = keypair.public_key().verify(b"message2", &signature);

        assert_eq!(result, Err(CryptoError::SignatureVerificationFailed));
    }

    #[test]
    fn test_deterministic_signatures() {
        let keypair = Secp256k1KeyPair::from_bytes([0xABu8; 32]).unwrap();
        let message = b"deterministic test";

        assert_eq!(keypair.sign(message), keypair.sign(message));
    }

    #[test]
    fn test_clone_outlives_original() {
        let keypair = Secp256k1KeyPair::from_bytes([0x42u8; 32]).unwrap();
        let copy = keypair.clone();
        drop(keypair);
        assert_eq!(copy.to_bytes(), [0x42u8; 32]);
        let sig = copy.sign(b"after drop");
        assert!(copy.public_key().verify(b"after drop", &sig).is_ok());
    }

    #[test]
    fn test_hex_roundtrip() {
        let keypair = Secp256k1KeyPair::generate();
        let restored = Secp256k1KeyPair::from_hex(&hex::encode(keypair.to_bytes())).unwrap();
        assert_eq!(keypair.public_key(), restored.public_key());

        let pubkey = Secp256k1PublicKey::from_hex(&keypair.public_key().to_hex()).unwrap();
        assert_eq!(pubkey, keypair.public_key());

        let sig = keypair.sign(b"x");
        assert_eq!(Secp256k1Signature::from_hex(&sig.to_hex()).unwrap(), sig);
    }

    #[test]
    fn test_short_prehash_is_left_padded() {
        let keypair = Secp256k1KeyPair::from_bytes([0xABu8; 32]).unwrap();
        let message = 1_700_000_000i64.to_le_bytes();
        let mut padded = [0u8; 32];
        padded[24..].copy_from_slice(&message);

        let signature = keypair.sign_prehash(&message).unwrap();
        assert_eq!(signature, keypair.sign_prehash(&padded).unwrap());

        // Raw k256 over the padded integer agrees.
        let sig = Signature::from_der(signature.as_bytes()).unwrap();
        let verifying_key = keypair.signing_key.verifying_key();
        assert!(verifying_key.verify_prehash(&padded, &sig).is_ok());
        assert!(keypair.public_key().verify_prehash(&message, &signature).is_ok());

        // Not a signature over SHA-256 of the message.
        assert_eq!(
            keypair.public_key().verify(&message, &signature),
            Err(CryptoError::SignatureVerificationFailed)
        );
        assert!(keypair.public_key().verify_prehash(&[1u8; 8], &signature).is_err());
    }

    #[test]
    fn test_oversized_prehash_rejected() {
        let keypair = Secp256k1KeyPair::generate();
        assert_eq!(
            keypair.sign_prehash(&[0u8; 33]),
            Err(CryptoError::InvalidPrehash(33))
        );
        assert_eq!(pad_prehash(&[7]).unwrap()[31], 7);
    }

    #[test]
    fn test_rejects_malformed_inputs() {
        assert!(Secp256k1PublicKey::from_slice(&[2u8; 32]).is_err());
        assert!(Secp256k1Signature::from_der(&[0x30, 0x01]).is_err());
        assert!(Secp256k1KeyPair::from_hex("abcd").is_err());
        assert!(matches!(
            Secp256k1PublicKey::from_hex("zz"),
            Err(CryptoError::InvalidHex(_))
        ));
    }
}
