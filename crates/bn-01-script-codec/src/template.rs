//! # Badge Locking Script Template
//!
//! ```text
//! offset  0  prefix        13 bytes
//! offset 13  hash160       20 bytes   owner of the output
//! offset 33  suffix        40 bytes   spend conditions, ends the code part
//! offset 73  6a 08          2 bytes   OP_RETURN, push 8
//! offset 75  amount         8 bytes   little-endian i64
//! ```
//!
//! Decoding is all-or-nothing: any deviation from the template means the
//! output is a plain output, never a partially parsed badge.

use bitcoin::hashes::Hash;
use bitcoin::{Address, PubkeyHash, ScriptBuf};

use shared_types::Network;

use crate::address::to_bitcoin_network;
use crate::errors::ScriptError;

/// Bytes preceding the owner hash.
pub const BADGE_SCRIPT_PREFIX: [u8; 13] = [
    0x51, 0x01, 0x40, 0x01, 0x00, 0x01, 0x51, 0x01, 0xb1, 0x01, 0xb2, 0x61, 0x14,
];

/// Bytes following the owner hash.
pub const BADGE_SCRIPT_SUFFIX: [u8; 40] = [
    0x00, 0x51, 0x79, 0x51, 0x7a, 0x75, 0x61, 0x58, 0x79, 0x05, 0x62, 0x61, 0x64, 0x67, 0x65,
    0x87, 0x69, 0x59, 0x79, 0xa9, 0x51, 0x79, 0x87, 0x69, 0x5a, 0x79, 0x5a, 0x79, 0xac, 0x77,
    0x77, 0x77, 0x77, 0x77, 0x77, 0x77, 0x77, 0x77, 0x77, 0x77,
];

/// OP_RETURN followed by a push of the 8 amount bytes.
pub const BADGE_DATA_MARKER: [u8; 2] = [0x6a, 0x08];

/// Length of the owner hash.
pub const PUBKEY_HASH_LEN: usize = 20;

/// Length of the code part (prefix, hash, suffix).
pub const BADGE_CODE_PART_LEN: usize =
    BADGE_SCRIPT_PREFIX.len() + PUBKEY_HASH_LEN + BADGE_SCRIPT_SUFFIX.len();

/// Total script length.
pub const BADGE_SCRIPT_LEN: usize = BADGE_CODE_PART_LEN + BADGE_DATA_MARKER.len() + 8;

/// Unlocking-script suffix marking an input as spending a badge output.
pub const BADGE_INPUT_FLAG: &[u8] = b"badge";

const HASH_START: usize = BADGE_SCRIPT_PREFIX.len();
const SUFFIX_START: usize = HASH_START + PUBKEY_HASH_LEN;
const AMOUNT_START: usize = BADGE_CODE_PART_LEN + BADGE_DATA_MARKER.len();

/// A decoded badge output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BadgeOutput {
    /// Owner of the output.
    pub address: Address,
    /// Transferred badge amount.
    pub amount: i64,
}

/// Build the locking script paying `amount` to `pubkey_hash`.
pub fn encode_pubkey_hash(pubkey_hash: &PubkeyHash, amount: i64) -> Result<ScriptBuf, ScriptError> {
    if amount < 0 {
        return Err(ScriptError::NegativeAmount(amount));
    }
    let mut script = Vec::with_capacity(BADGE_SCRIPT_LEN);
    script.extend_from_slice(&BADGE_SCRIPT_PREFIX);
    script.extend_from_slice(&pubkey_hash.to_byte_array());
    script.extend_from_slice(&BADGE_SCRIPT_SUFFIX);
    script.extend_from_slice(&BADGE_DATA_MARKER);
    script.extend_from_slice(&amount.to_le_bytes());
    Ok(ScriptBuf::from_bytes(script))
}

/// Build the locking script paying `amount` to a P2PKH `address`.
pub fn encode(address: &Address, amount: i64) -> Result<ScriptBuf, ScriptError> {
    let pubkey_hash = address
        .pubkey_hash()
        .ok_or_else(|| ScriptError::UnsupportedAddress(address.to_string()))?;
    encode_pubkey_hash(&pubkey_hash, amount)
}

/// Strictly decode a badge locking script.
pub fn decode(script: &[u8], network: Network) -> Result<BadgeOutput, ScriptError> {
    if script.len() != BADGE_SCRIPT_LEN {
        return Err(ScriptError::WrongLength(script.len()));
    }
    if script[..HASH_START] != BADGE_SCRIPT_PREFIX {
        return Err(ScriptError::TemplateMismatch("prefix"));
    }
    if script[SUFFIX_START..BADGE_CODE_PART_LEN] != BADGE_SCRIPT_SUFFIX {
        return Err(ScriptError::TemplateMismatch("suffix"));
    }
    if script[BADGE_CODE_PART_LEN..AMOUNT_START] != BADGE_DATA_MARKER {
        return Err(ScriptError::TemplateMismatch("data marker"));
    }

    let mut hash = [0u8; PUBKEY_HASH_LEN];
    hash.copy_from_slice(&script[HASH_START..SUFFIX_START]);
    let mut amount_bytes = [0u8; 8];
    amount_bytes.copy_from_slice(&script[AMOUNT_START..]);
    let amount = i64::from_le_bytes(amount_bytes);
    if amount < 0 {
        return Err(ScriptError::NegativeAmount(amount));
    }

    let address = Address::p2pkh(PubkeyHash::from_byte_array(hash), to_bitcoin_network(network));
    Ok(BadgeOutput { address, amount })
}

/// Whether an unlocking script flags its input as a badge spend.
pub fn is_badge_input(script_sig: &[u8]) -> bool {
    script_sig.ends_with(BADGE_INPUT_FLAG)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn owner() -> PubkeyHash {
        PubkeyHash::from_byte_array([7u8; 20])
    }

    #[test]
    fn test_template_lengths() {
        assert_eq!(BADGE_CODE_PART_LEN, 73);
        assert_eq!(BADGE_SCRIPT_LEN, 83);
    }

    #[test]
    fn test_encoded_layout() {
        let script = encode_pubkey_hash(&owner(), 1).unwrap();
        let hex = hex::encode(script.as_bytes());
        assert!(hex.starts_with("5101400100015101b101b26114"));
        assert_eq!(&hex[146..150], "6a08");
        assert!(hex.ends_with("0100000000000000"));
    }

    #[test]
    fn test_encode_rejects_negative_amount() {
        assert_eq!(
            encode_pubkey_hash(&owner(), -1),
            Err(ScriptError::NegativeAmount(-1))
        );
    }

    #[test]
    fn test_decode_rejects_tampered_marker() {
        let mut script = encode_pubkey_hash(&owner(), 5).unwrap().into_bytes();
        script[BADGE_CODE_PART_LEN] = 0x6b;
        assert_eq!(
            decode(&script, Network::Regtest),
            Err(ScriptError::TemplateMismatch("data marker"))
        );
    }

    #[test]
    fn test_decode_rejects_negative_amount() {
        let mut script = encode_pubkey_hash(&owner(), 0).unwrap().into_bytes();
        script[BADGE_SCRIPT_LEN - 1] = 0x80;
        assert!(matches!(
            decode(&script, Network::Mainnet),
            Err(ScriptError::NegativeAmount(_))
        ));
    }

    #[test]
    fn test_badge_input_flag() {
        assert!(is_badge_input(b"\x47sig\x21keybadge"));
        assert!(!is_badge_input(b"badgeX"));
        assert!(!is_badge_input(b""));
    }

    proptest! {
        #[test]
        fn prop_decode_inverts_encode(hash in any::<[u8; 20]>(), amount in 0i64..=i64::MAX) {
            let pkh = PubkeyHash::from_byte_array(hash);
            let script = encode_pubkey_hash(&pkh, amount).unwrap();
            let decoded = decode(script.as_bytes(), Network::Mainnet).unwrap();
            prop_assert_eq!(decoded.amount, amount);
            prop_assert_eq!(decoded.address.pubkey_hash(), Some(pkh));
        }

        #[test]
        fn prop_decode_never_panics(bytes in proptest::collection::vec(any::<u8>(), 0..120)) {
            let _ = decode(&bytes, Network::Regtest);
        }

        #[test]
        fn prop_tampered_template_byte_is_rejected(position in 0usize..BADGE_SCRIPT_LEN, flip in 1u8..=255) {
            prop_assume!(!(HASH_START..SUFFIX_START).contains(&position));
            prop_assume!(position < AMOUNT_START);
            let mut script = encode_pubkey_hash(&owner(), 42).unwrap().into_bytes();
            script[position] ^= flip;
            prop_assert!(decode(&script, Network::Mainnet).is_err());
        }

        #[test]
        fn prop_wrong_length_is_rejected(extra in 1usize..16) {
            let mut script = encode_pubkey_hash(&owner(), 42).unwrap().into_bytes();
            script.extend(std::iter::repeat(0u8).take(extra));
            prop_assert_eq!(decode(&script, Network::Mainnet), Err(ScriptError::WrongLength(BADGE_SCRIPT_LEN + extra)));
            script.truncate(BADGE_SCRIPT_LEN - extra);
            prop_assert!(decode(&script, Network::Mainnet).is_err());
        }
    }
}
