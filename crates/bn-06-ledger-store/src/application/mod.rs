//! Application layer: repository implementations.

pub mod ledger_store;

pub use ledger_store::{open_store, LedgerStore};
