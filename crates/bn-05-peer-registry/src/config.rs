//! Peer and transport configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Largest accepted RPC frame.
pub const MAX_RPC_FRAME: usize = 64 * 1024 * 1024;

/// One configured peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerConfig {
    /// `host:port` of the peer's P2P listener.
    pub host: String,
    /// Hex compressed secp256k1 public key.
    pub pubkey: String,
}

/// Transport settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Seconds between reconnect attempts.
    pub reconnect_interval_secs: u64,
    /// Deadline for dialing a peer.
    pub dial_timeout_secs: u64,
    /// Deadline for one request/response exchange.
    pub call_timeout_secs: u64,
    /// Largest accepted RPC frame in bytes.
    pub max_rpc_frame: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            reconnect_interval_secs: 60,
            dial_timeout_secs: 10,
            call_timeout_secs: 60,
            max_rpc_frame: MAX_RPC_FRAME,
        }
    }
}

impl RegistryConfig {
    /// Short deadlines for tests.
    pub fn for_testing() -> Self {
        Self {
            reconnect_interval_secs: 1,
            dial_timeout_secs: 2,
            call_timeout_secs: 5,
            max_rpc_frame: MAX_RPC_FRAME,
        }
    }

    /// Reconnect period.
    pub fn reconnect_interval(&self) -> Duration {
        Duration::from_secs(self.reconnect_interval_secs)
    }

    /// Dial deadline.
    pub fn dial_timeout(&self) -> Duration {
        Duration::from_secs(self.dial_timeout_secs)
    }

    /// Call deadline.
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }
}
