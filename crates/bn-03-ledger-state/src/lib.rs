//! # BN-03 Ledger State Machine
//!
//! Classifies base-chain transactions into badge ledger entries.
//!
//! **Subsystem ID:** 3
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Purpose
//!
//! A badge transaction spends badge outputs (inputs flagged by the unlocking
//! script) and creates badge outputs (locking scripts matching the template
//! of `bn-01`). Classification turns one transaction into a [`TxInventory`]:
//!
//! - one negative-valued VIN point per consumed badge output;
//! - one positive-valued VOUT point per created badge output.
//!
//! A transaction whose badge input references an output that is not known
//! yet is *deferred* (stored `OPEN`) and retried when its ancestor arrives.
//!
//! ## Conservation Rules
//!
//! | Situation | Outcome |
//! |-----------|---------|
//! | No badge inputs | Mint: badge code is the txid, value unbounded |
//! | Inputs of several badge codes | Empty inventory |
//! | Outputs exceed inputs | VINs kept, VOUTs dropped (value burned) |
//! | Source tx `CLOSED` but output unknown | `UnknownUtxo` integrity error |
//!
//! ## Module Structure
//!
//! ```text
//! bn-03-ledger-state/
//! ├── domain/          # Classification, ordering, UTXO netting, errors
//! ├── ports/           # Repository traits + in-memory mock
//! ├── application/     # LedgerService
//! └── config.rs        # LedgerConfig
//! ```
//!
//! [`TxInventory`]: shared_types::TxInventory

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod application;
pub mod config;
pub mod domain;
pub mod fixtures;
pub mod ports;

// Re-exports
pub use application::LedgerService;
pub use config::LedgerConfig;
pub use domain::{
    compute_utxos, decode_tx, dependency_order, total_value, BatchResult, Classification,
    LedgerError, ProcessOutcome, MINT_RUNNING_VALUE,
};
pub use ports::{
    AddrInfoRepository, InMemoryLedgerRepository, TxInfoRepository, TxPointRepository,
};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
