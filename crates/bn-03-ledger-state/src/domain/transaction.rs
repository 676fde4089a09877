//! Raw transaction decoding.

use bitcoin::consensus::deserialize;
use bitcoin::Transaction;

use super::errors::LedgerError;

/// Decode consensus-serialized transaction bytes.
pub fn decode_tx(raw: &[u8]) -> Result<Transaction, LedgerError> {
    deserialize(raw).map_err(|e| LedgerError::MalformedTransaction(e.to_string()))
}
