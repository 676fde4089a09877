//! Script codec errors.

use thiserror::Error;

/// Reasons a script is not a badge script, or cannot become one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScriptError {
    /// Amount below zero.
    #[error("badge amount must not be negative: {0}")]
    NegativeAmount(i64),

    /// Script length differs from the template.
    #[error("not a badge script: length {0}")]
    WrongLength(usize),

    /// A fixed template section differs.
    #[error("not a badge script: {0} mismatch")]
    TemplateMismatch(&'static str),

    /// Address string could not be parsed for this network.
    #[error("invalid address {0}")]
    InvalidAddress(String),

    /// Address is valid but not pay-to-pubkey-hash.
    #[error("address is not P2PKH: {0}")]
    UnsupportedAddress(String),
}
