//! # BN-04 Partition Sync
//!
//! Anti-entropy replication of the badge ledger between trusted peers.
//!
//! **Subsystem ID:** 4
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Partitions
//!
//! Confirmed heights are bucketed into partitions of 10 blocks, counted
//! from the network's start height. The digest of a partition is the
//! SHA-256 of the raw ids of its `CLOSED` transactions in hex-id order, so
//! two nodes holding the same closed set agree on every digest.
//!
//! ```text
//!   node B                                   node A
//!     | flush dirty digests                    |
//!     |---- GetPartitionsHash(off, 10) ------->|
//!     |<--- [h_off .. h_off+9] ----------------|
//!     | compare positionally                   |
//!     |---- GetTxidsByPartitions(diff) ------->|
//!     |<--- closed txids ----------------------|
//!     | SyncTxs: oracle status, fetch lacking  |
//!     |---- GetTxs(lack) --------------------->|
//!     |<--- raw txs ---------------------------|
//!     | persist NEW, classify, flush digests   |
//! ```
//!
//! ## Loops
//!
//! | Loop | Period | Work |
//! |------|--------|------|
//! | state sync | 5 min | oracle tip, unconfirmed sync, reconcile trailing window |
//! | unconfirmed sync | 5 min | pull every peer's unconfirmed txids |
//! | tx state repair | 1 min | fix height/hash drift, drop vanished txs |
//! | spentness aging | 10 min | flip deeply confirmed spends to `PrettySureSpent` |
//!
//! ## Module Structure
//!
//! ```text
//! bn-04-partition-sync/
//! ├── domain/          # Dirty set, digests, oracle types, errors
//! ├── ports/           # TxSource, Oracle, PeerClient, PeerDirectory, PartitionRepository
//! ├── adapters/        # In-process peer client
//! ├── application/     # SyncService + periodic loops
//! └── config.rs        # SyncConfig
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

// Re-exports
pub use adapters::{InProcessPeer, LocalSingleTxSource, PeerTxSource};
pub use application::{spawn_loops, SyncDependencies, SyncService};
pub use config::SyncConfig;
pub use domain::{
    digest_txids, DirtyPartitions, FeeQuote, OracleError, ReconcileReport, SubmitResult,
    SyncError, SyncReport, TxStatus, ORACLE_FAILURE_RESULT, ORACLE_NOT_FOUND_PHRASE,
};
pub use ports::{
    InMemoryPartitionRepository, MockOracle, Oracle, PartitionRepository, PeerClient,
    PeerDirectory, StaticPeerDirectory, TxSource,
};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
