//! # BN-06 Ledger Store
//!
//! Persistence for the ledger and partition repositories on top of an
//! ordered key-value store.
//!
//! **Subsystem ID:** 6
//!
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Tables
//!
//! | Prefix | Key | Value |
//! |--------|-----|-------|
//! | `tx/` | txid, chunk index | sentinel metadata (index -1) or raw chunk |
//! | `th/` | height, txid | empty (height index) |
//! | `pt/` | txid, kind, index | `TxPoint` |
//! | `pa/` | addr, txid, kind, index | empty (address index) |
//! | `pv/` | timestamp, txid, index | empty (unsettled VIN index) |
//! | `pi/` | partition id | digest |
//! | `ai/` | addr | `AddrInfo` |
//! | `au/` | appid, user id, user index, addr | empty (user index) |
//!
//! Integers in keys are big-endian with the sign bit flipped, so byte order
//! matches numeric order. Every logical write is one atomic batch.
//!
//! ## Backends
//!
//! - `InMemoryKVStore`: ordered map, always available.
//! - `RocksDbStore`: behind the `rocksdb` feature.
//!
//! ## Module Structure
//!
//! ```text
//! bn-06-ledger-store/
//! ├── domain/        # keys, chunking, errors
//! ├── ports/         # KeyValueStore + in-memory store
//! ├── adapters/      # RocksDB
//! ├── application/   # LedgerStore (repository implementations)
//! └── config.rs      # backend selection
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

// Re-exports
#[cfg(feature = "rocksdb")]
pub use adapters::{RocksDbConfig, RocksDbStore};
pub use application::{open_store, LedgerStore};
pub use config::{StorageBackend, StorageConfig};
pub use domain::StoreError;
pub use ports::{BatchOperation, InMemoryKVStore, KeyValueStore};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
