//! # Key Layout
//!
//! Every table lives under a short prefix. Signed integers are encoded
//! big-endian with the sign bit flipped so that lexicographic key order is
//! numeric order, which lets range scans serve height and time queries.

use shared_types::PointKind;

/// Transaction sentinel and chunk rows.
pub const TX: &[u8] = b"tx/";
/// Height index.
pub const TX_HEIGHT: &[u8] = b"th/";
/// Points by unique key.
pub const POINT: &[u8] = b"pt/";
/// Points by address.
pub const POINT_ADDR: &[u8] = b"pa/";
/// `MayBeUnspent` VINs by timestamp.
pub const POINT_UNSETTLED: &[u8] = b"pv/";
/// Partition digests.
pub const PARTITION: &[u8] = b"pi/";
/// Address metadata.
pub const ADDR: &[u8] = b"ai/";
/// Addresses by user slot.
pub const ADDR_USER: &[u8] = b"au/";

const SEP: u8 = b'/';

/// Order-preserving encoding of an `i64`.
pub fn ordered_i64(value: i64) -> [u8; 8] {
    ((value as u64) ^ (1 << 63)).to_be_bytes()
}

/// Order-preserving encoding of an `i32`.
pub fn ordered_i32(value: i32) -> [u8; 4] {
    ((value as u32) ^ (1 << 31)).to_be_bytes()
}

fn key(parts: &[&[u8]]) -> Vec<u8> {
    let mut out = Vec::with_capacity(parts.iter().map(|p| p.len()).sum());
    for part in parts {
        out.extend_from_slice(part);
    }
    out
}

/// All rows of one transaction.
pub fn tx_prefix(txid: &str) -> Vec<u8> {
    key(&[TX, txid.as_bytes(), &[SEP]])
}

/// One row of a transaction; index -1 is the sentinel.
pub fn tx_row(txid: &str, index: i32) -> Vec<u8> {
    key(&[TX, txid.as_bytes(), &[SEP], &ordered_i32(index)])
}

/// Height index entry.
pub fn tx_height(height: i64, txid: &str) -> Vec<u8> {
    key(&[TX_HEIGHT, &ordered_i64(height), txid.as_bytes()])
}

/// First height index key at or above `height`.
pub fn tx_height_bound(height: i64) -> Vec<u8> {
    key(&[TX_HEIGHT, &ordered_i64(height)])
}

/// Txid part of a height index key.
pub fn txid_of_height_key(raw: &[u8]) -> Option<&str> {
    let offset = TX_HEIGHT.len() + 8;
    raw.get(offset..).and_then(|rest| std::str::from_utf8(rest).ok())
}

/// Points of one transaction.
pub fn point_prefix(txid: &str) -> Vec<u8> {
    key(&[POINT, txid.as_bytes(), &[SEP]])
}

/// One point. Sorts VINs before VOUTs, each by index.
pub fn point(txid: &str, kind: PointKind, index: i32) -> Vec<u8> {
    key(&[POINT, txid.as_bytes(), &[SEP, kind.tag()], &ordered_i32(index)])
}

/// Address index entries of `addr`.
pub fn point_addr_prefix(addr: &str) -> Vec<u8> {
    key(&[POINT_ADDR, addr.as_bytes(), &[SEP]])
}

/// Address index entry; the tail is the point key.
pub fn point_addr(addr: &str, txid: &str, kind: PointKind, index: i32) -> Vec<u8> {
    key(&[
        point_addr_prefix(addr).as_slice(),
        point(txid, kind, index).as_slice(),
    ])
}

/// Unsettled VIN index entry; the tail is the point key.
pub fn point_unsettled(timestamp: i64, txid: &str, index: i32) -> Vec<u8> {
    key(&[
        POINT_UNSETTLED,
        &ordered_i64(timestamp),
        point(txid, PointKind::Vin, index).as_slice(),
    ])
}

/// First unsettled VIN key at or above `timestamp`.
pub fn point_unsettled_bound(timestamp: i64) -> Vec<u8> {
    key(&[POINT_UNSETTLED, &ordered_i64(timestamp)])
}

/// Point key embedded at the end of an index entry.
pub fn embedded_point_key<'a>(entry: &'a [u8], prefix_len: usize) -> Option<&'a [u8]> {
    entry.get(prefix_len..).filter(|rest| rest.starts_with(POINT))
}

/// Partition digest.
pub fn partition(id: i64) -> Vec<u8> {
    key(&[PARTITION, &ordered_i64(id)])
}

/// Address metadata row.
pub fn addr(addr: &str) -> Vec<u8> {
    key(&[ADDR, addr.as_bytes()])
}

/// Addresses of one user slot.
pub fn addr_user_prefix(appid: &str, user_id: i64, user_index: i64) -> Vec<u8> {
    let len = (appid.len() as u32).to_be_bytes();
    key(&[
        ADDR_USER,
        &len,
        appid.as_bytes(),
        &ordered_i64(user_id),
        &ordered_i64(user_index),
    ])
}

/// User index entry; the tail is the address.
pub fn addr_user(appid: &str, user_id: i64, user_index: i64, addr: &str) -> Vec<u8> {
    key(&[
        addr_user_prefix(appid, user_id, user_index).as_slice(),
        addr.as_bytes(),
    ])
}

/// Printable form of a key for error messages.
pub fn display(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).into_owned()
}
