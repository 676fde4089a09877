//! # SHA-256 Hashing
//!
//! One-shot and streaming SHA-256, used for partition digests and for the
//! message digests fed to ECDSA.

use sha2::{Digest, Sha256};

/// SHA-256 output.
pub type Hash = [u8; 32];

/// Streaming SHA-256 hasher.
#[derive(Clone, Default)]
pub struct Sha256Hasher {
    inner: Sha256,
}

impl Sha256Hasher {
    /// Create new hasher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed data.
    pub fn update(&mut self, data: &[u8]) -> &mut Self {
        self.inner.update(data);
        self
    }

    /// Consume the hasher and return the digest.
    pub fn finalize(self) -> Hash {
        self.inner.finalize().into()
    }
}

/// Hash data with SHA-256 (one-shot).
pub fn sha256(data: &[u8]) -> Hash {
    Sha256::digest(data).into()
}
