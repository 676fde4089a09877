//! Transaction builders for tests across the workspace.

use bitcoin::absolute::LockTime;
use bitcoin::consensus::serialize;
use bitcoin::hashes::Hash;
use bitcoin::transaction::Version;
use bitcoin::{
    Address, Amount, OutPoint, PubkeyHash, ScriptBuf, Sequence, Transaction, TxIn, TxOut, Txid,
    Witness,
};
use bn_01_script_codec::{encode_pubkey_hash, to_bitcoin_network, BADGE_INPUT_FLAG};
use shared_types::Network;

/// Satoshis carried by fixture outputs.
pub const FIXTURE_OUTPUT_SATS: u64 = 888;

/// Owner hash `[byte; 20]`.
pub fn owner(byte: u8) -> PubkeyHash {
    PubkeyHash::from_byte_array([byte; 20])
}

/// Address string of [`owner`] on `network`.
pub fn owner_address(byte: u8, network: Network) -> String {
    Address::p2pkh(owner(byte), to_bitcoin_network(network)).to_string()
}

/// Badge output paying `amount` to `owner(byte)`.
pub fn badge_output(byte: u8, amount: i64) -> TxOut {
    TxOut {
        value: Amount::from_sat(FIXTURE_OUTPUT_SATS),
        script_pubkey: encode_pubkey_hash(&owner(byte), amount).unwrap_or_default(),
    }
}

/// Non-badge output.
pub fn plain_output(sats: u64) -> TxOut {
    TxOut {
        value: Amount::from_sat(sats),
        script_pubkey: ScriptBuf::from_bytes(vec![0x51]),
    }
}

/// Input flagged as spending a badge output.
pub fn badge_input(prev: Txid, vout: u32) -> TxIn {
    let mut script = vec![0x01, 0x00];
    script.extend_from_slice(BADGE_INPUT_FLAG);
    input(prev, vout, script)
}

/// Input without the badge flag.
pub fn plain_input(prev: Txid, vout: u32) -> TxIn {
    input(prev, vout, vec![0x01, 0x00])
}

fn input(prev: Txid, vout: u32, script: Vec<u8>) -> TxIn {
    TxIn {
        previous_output: OutPoint::new(prev, vout),
        script_sig: ScriptBuf::from_bytes(script),
        sequence: Sequence::MAX,
        witness: Witness::new(),
    }
}

/// Arbitrary funding outpoint distinguished by `salt`.
pub fn funding_txid(salt: u32) -> Txid {
    let mut bytes = [0xeeu8; 32];
    bytes[..4].copy_from_slice(&salt.to_le_bytes());
    Txid::from_byte_array(bytes)
}

/// Version-2 transaction.
pub fn transaction(input: Vec<TxIn>, output: Vec<TxOut>) -> Transaction {
    Transaction {
        version: Version::TWO,
        lock_time: LockTime::ZERO,
        input,
        output,
    }
}

/// Mint of `amounts` to `owner(byte)`, funded by a plain input.
pub fn mint(byte: u8, amounts: &[i64], salt: u32) -> Transaction {
    transaction(
        vec![plain_input(funding_txid(salt), 0)],
        amounts.iter().map(|a| badge_output(byte, *a)).collect(),
    )
}

/// Consensus bytes of `tx`.
pub fn raw(tx: &Transaction) -> Vec<u8> {
    serialize(tx)
}
