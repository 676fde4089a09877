//! Domain layer for the ledger state machine.

pub mod classification;
pub mod errors;
pub mod ordering;
pub mod transaction;
pub mod utxo;

pub use classification::{BatchResult, Classification, ProcessOutcome, MINT_RUNNING_VALUE};
pub use errors::LedgerError;
pub use ordering::dependency_order;
pub use transaction::decode_tx;
pub use utxo::{compute_utxos, total_value};
