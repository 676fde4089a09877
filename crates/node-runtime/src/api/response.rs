//! # Response Envelope
//!
//! Every route answers HTTP 200 with `{code, msg, data}`; failures carry a
//! negative code and `data: null`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::services::QueryError;

/// Result codes of the HTTP API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ResponseCode {
    /// Success.
    Ok = 0,
    /// The request body could not be read.
    ReadBody = -1,
    /// The body is not JSON of the expected shape.
    WrongFormat = -2,
    /// Internal failure.
    Service = -3,
    /// A badge input spends an output without a VOUT point.
    UnknownUtxo = -4,
    /// Unknown or unresolved transaction.
    UnknownTx = -5,
    /// Badge inputs cannot be summed.
    IllegalVin = -6,
    /// A field value is out of range or malformed.
    Parameters = -7,
    /// The user's UTXOs do not cover the transfer.
    NotEnoughBadge = -8,
}

impl ResponseCode {
    /// Wire value.
    pub fn value(self) -> i32 {
        self as i32
    }
}

impl From<&QueryError> for ResponseCode {
    fn from(e: &QueryError) -> Self {
        match e {
            QueryError::NotFound(_) => ResponseCode::UnknownTx,
            QueryError::InvalidParameter(_) => ResponseCode::Parameters,
            QueryError::NotEnoughBadge { .. } => ResponseCode::NotEnoughBadge,
            QueryError::UnknownUtxo(_) => ResponseCode::UnknownUtxo,
            QueryError::IllegalVin(_) => ResponseCode::IllegalVin,
            QueryError::Service(_) => ResponseCode::Service,
        }
    }
}

/// JSON body of every response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse {
    /// [`ResponseCode`] value.
    pub code: i32,
    /// Error text; empty on success.
    pub msg: String,
    /// Result, `null` on failure.
    pub data: Value,
}

impl ApiResponse {
    /// Successful response.
    pub fn ok(data: Value) -> Self {
        Self {
            code: ResponseCode::Ok.value(),
            msg: String::new(),
            data,
        }
    }

    /// Failed response.
    pub fn error(code: ResponseCode, msg: impl Into<String>) -> Self {
        Self {
            code: code.value(),
            msg: msg.into(),
            data: Value::Null,
        }
    }
}

impl From<QueryError> for ApiResponse {
    fn from(e: QueryError) -> Self {
        ApiResponse::error(ResponseCode::from(&e), e.to_string())
    }
}
