//! Partition digest.

use shared_crypto::Sha256Hasher;
use shared_types::{txid_to_raw, IdError};

/// SHA-256 over the raw bytes of `txids`, in the order given.
///
/// Callers pass the sorted, deduplicated hex ids of the partition's
/// `CLOSED` transactions.
pub fn digest_txids(txids: &[String]) -> Result<Vec<u8>, IdError> {
    let mut hasher = Sha256Hasher::new();
    for txid in txids {
        hasher.update(&txid_to_raw(txid)?);
    }
    Ok(hasher.finalize().to_vec())
}
