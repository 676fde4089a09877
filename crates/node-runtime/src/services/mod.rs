//! Application services behind the HTTP API.

pub mod errors;
pub mod query;

pub use errors::QueryError;
pub use query::{
    AddrAmount, AddrInventory, Page, QueryService, TransferRequest, UnsignedTransfer, UserRef,
    BADGE_OUTPUT_SATS,
};
