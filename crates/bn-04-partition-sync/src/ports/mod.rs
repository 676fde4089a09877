//! Ports layer: what partition sync needs from storage, the chain oracle
//! and the peer network.

pub mod outbound;

pub use outbound::{
    InMemoryPartitionRepository, MockOracle, Oracle, PartitionRepository, PeerClient,
    PeerDirectory, StaticPeerDirectory, TxSource,
};
