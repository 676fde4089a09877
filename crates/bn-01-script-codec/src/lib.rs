//! # BN-01 Badge Script Codec
//!
//! Encodes and strictly decodes the fixed-template "badge" locking script.
//!
//! **Subsystem ID:** 1
//!
//! ## Purpose
//!
//! A badge output is a base-chain output whose locking script follows one
//! exact byte template: the owner's hash160 spliced between a fixed prefix
//! and suffix, then an OP_RETURN payload carrying the amount. Inputs spending
//! such outputs flag themselves with an unlocking script ending in `badge`.
//!
//! Callers must read a decode failure as "plain output, ignore", never as
//! corruption.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod address;
pub mod errors;
pub mod template;

// Re-exports
pub use address::{parse_address, to_bitcoin_network};
pub use errors::ScriptError;
pub use template::{
    decode, encode, encode_pubkey_hash, is_badge_input, BadgeOutput, BADGE_INPUT_FLAG,
    BADGE_SCRIPT_LEN,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
