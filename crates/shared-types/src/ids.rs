//! Txid encodings.
//!
//! Txids are handled as display-order hex strings everywhere except on the
//! wire and in partition digests, where the hex-decoded bytes are used.

use crate::errors::IdError;

/// Length in bytes of a raw txid.
pub const TXID_LEN: usize = 32;

/// Decode a display-order hex txid into its 32 raw bytes.
pub fn txid_to_raw(txid: &str) -> Result<Vec<u8>, IdError> {
    let raw = hex::decode(txid).map_err(|_| IdError::NotHex(txid.to_string()))?;
    if raw.len() != TXID_LEN {
        return Err(IdError::WrongLength(raw.len()));
    }
    Ok(raw)
}

/// Encode raw txid bytes as display-order hex.
pub fn raw_to_txid(raw: &[u8]) -> Result<String, IdError> {
    if raw.len() != TXID_LEN {
        return Err(IdError::WrongLength(raw.len()));
    }
    Ok(hex::encode(raw))
}
