//! Txid conversion between hex strings and wire bytes.

use shared_types::{raw_to_txid, txid_to_raw, IdError};

/// Hex txids to raw wire bytes.
pub fn encode_txids(txids: &[String]) -> Result<Vec<Vec<u8>>, IdError> {
    txids.iter().map(|txid| txid_to_raw(txid)).collect()
}

/// Raw wire bytes to hex txids.
pub fn decode_txids(raw: &[Vec<u8>]) -> Result<Vec<String>, IdError> {
    raw.iter().map(|bytes| raw_to_txid(bytes)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrong_length_rejected() {
        assert!(decode_txids(&[vec![1, 2, 3]]).is_err());
        assert!(encode_txids(&["abcd".to_string()]).is_err());
    }

    #[test]
    fn test_display_order_preserved() {
        let txid = format!("01{}", "00".repeat(31));
        let raw = encode_txids(&[txid.clone()]).unwrap();
        assert_eq!(raw[0][0], 0x01);
        assert_eq!(decode_txids(&raw).unwrap(), vec![txid]);
    }
}
