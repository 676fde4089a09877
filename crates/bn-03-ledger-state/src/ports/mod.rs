//! Ports layer: the ledger's storage dependencies.

pub mod outbound;

pub use outbound::{
    AddrInfoRepository, InMemoryLedgerRepository, TxInfoRepository, TxPointRepository,
};
