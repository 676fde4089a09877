//! Crypto error types.

use thiserror::Error;

/// Cryptographic operation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    /// Signature verification failed
    #[error("Signature verification failed")]
    SignatureVerificationFailed,

    /// Invalid public key
    #[error("Invalid public key")]
    InvalidPublicKey,

    /// Invalid private key
    #[error("Invalid private key")]
    InvalidPrivateKey,

    /// Invalid signature encoding
    #[error("Invalid signature")]
    InvalidSignature,

    /// Hex input could not be decoded
    #[error("Invalid hex: {0}")]
    InvalidHex(String),

    /// Prehash wider than the curve scalar
    #[error("Prehash too long: {0} bytes")]
    InvalidPrehash(usize),

    /// The signer produced no signature
    #[error("Signing failed")]
    SigningFailed,
}
