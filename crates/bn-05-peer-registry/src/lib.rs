//! # BN-05 Peer Registry
//!
//! Authenticated connections to the configured peers and the RPC server
//! answering theirs.
//!
//! **Subsystem ID:** 5
//!
//! ## Transport
//!
//! Plain TCP. The dialing side sends one handshake frame (see `bn-02`),
//! then request/response frames:
//!
//! ```text
//! client                                        server
//!   |-- u32 LE len | AuthRequest --------------->|  allow-list, freshness, signature
//!   |-- u32 LE len | RpcRequest{metadata,body} ->|  per-call credential
//!   |<- u32 LE len | RpcResponse{error,body} ----|  dispatch to SyncService
//! ```
//!
//! One request is in flight per connection. A transport failure drops the
//! stream; the next call redials.
//!
//! ## Registry
//!
//! | Operation | Behavior |
//! |-----------|----------|
//! | `connect` | keep still-configured connections, dial the rest, `PartialConnect` if any failed |
//! | `connect_until_complete` | retry `connect` every minute until complete or shutdown |

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod codec;
pub mod config;
pub mod connection;
pub mod errors;
pub mod registry;
pub mod server;

// Re-exports
pub use codec::{decode_txids, encode_txids};
pub use config::{PeerConfig, RegistryConfig, MAX_RPC_FRAME};
pub use connection::PeerConnection;
pub use errors::PeerError;
pub use registry::PeerRegistry;
pub use server::PeerServer;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
