//! # BN-02 Peer Authentication
//!
//! Two independent signed-authentication layers for the peer network.
//!
//! **Subsystem ID:** 2
//!
//! ## Layers
//!
//! | Layer | When | Verifies |
//! |-------|------|----------|
//! | Connection handshake | once, before any RPC | allow-list, signature, timestamp freshness |
//! | Per-call credential | every RPC | allow-list, signature, timestamp freshness |
//!
//! Both sign the unix timestamp as 8 little-endian bytes with the node's
//! secp256k1 key and accept it for [`FRESHNESS_WINDOW_SECS`] seconds.
//!
//! ## Module Structure
//!
//! ```text
//! bn-02-peer-auth/
//! ├── frame.rs       # FrameReader: exact reads, u32 LE framing
//! ├── timestamp.rs   # sign / verify the timestamp message
//! ├── handshake.rs   # connection-level handshake
//! ├── credential.rs  # per-call metadata + CallAuthenticator
//! └── allow_list.rs  # configured peer keys
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod allow_list;
pub mod credential;
pub mod errors;
pub mod frame;
pub mod handshake;
pub mod timestamp;

// Re-exports
pub use allow_list::AllowList;
pub use credential::{sign_call, CallAuthenticator};
pub use errors::AuthError;
pub use frame::{write_frame, FrameError, FrameReader};
pub use handshake::{
    build_auth_request, client_handshake, server_handshake, AuthInfo, HANDSHAKE_TIMEOUT,
    MAX_HANDSHAKE_BODY,
};
pub use timestamp::{sign_timestamp, verify_timestamp_signature, FRESHNESS_WINDOW_SECS};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
