//! Domain layer for partition sync.

pub mod digest;
pub mod dirty;
pub mod errors;
pub mod oracle;
pub mod report;

pub use digest::digest_txids;
pub use dirty::DirtyPartitions;
pub use errors::SyncError;
pub use oracle::{
    FeeQuote, OracleError, SubmitResult, TxStatus, ORACLE_FAILURE_RESULT, ORACLE_NOT_FOUND_PHRASE,
};
pub use report::{ReconcileReport, SyncReport};
