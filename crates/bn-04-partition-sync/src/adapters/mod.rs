//! Adapters: transaction sources and an in-process peer client.

pub mod in_process;
pub mod local_source;
pub mod peer_source;

pub use in_process::InProcessPeer;
pub use local_source::LocalSingleTxSource;
pub use peer_source::PeerTxSource;
