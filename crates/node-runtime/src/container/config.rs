//! # Node Configuration
//!
//! Unified configuration for the node: identity, listeners, oracle, storage,
//! peers and loop periods.
//!
//! ## Sources
//!
//! 1. TOML file at `$BADGE_CONFIG` (default `./badge-node.toml`); a missing
//!    file yields the defaults.
//! 2. `BADGE_*` environment variables override individual fields.
//!
//! ## Security Requirements
//!
//! - `private_key` MUST be set; it is the node's peer identity.
//! - Every configured peer pubkey must parse, since it also feeds the
//!   inbound allow-list.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use bn_04_partition_sync::SyncConfig;
use bn_05_peer_registry::{PeerConfig, RegistryConfig};
use bn_06_ledger_store::{StorageBackend, StorageConfig};
use serde::{Deserialize, Serialize};
use shared_crypto::{Secp256k1KeyPair, Secp256k1PublicKey};
use shared_types::Network;
use thiserror::Error;

/// Environment variable naming the config file.
pub const CONFIG_PATH_ENV: &str = "BADGE_CONFIG";

/// Config file used when `BADGE_CONFIG` is unset.
pub const DEFAULT_CONFIG_PATH: &str = "./badge-node.toml";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file exists but could not be read.
    #[error("cannot read {path}: {source}")]
    Read {
        /// File path.
        path: PathBuf,
        /// Underlying failure.
        source: std::io::Error,
    },

    /// The config file is not valid TOML for [`NodeConfig`].
    #[error("cannot parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// An environment override has an unusable value.
    #[error("invalid value for {key}: {message}")]
    InvalidValue {
        /// Variable or field name.
        key: String,
        /// What is wrong with it.
        message: String,
    },

    /// No node private key configured.
    #[error("private_key is not set; provide it in the config file or BADGE_PRIVATE_KEY")]
    MissingPrivateKey,

    /// A configured peer is unusable.
    #[error("invalid peer {host}: {reason}")]
    InvalidPeer {
        /// Peer address.
        host: String,
        /// What is wrong with it.
        reason: String,
    },
}

/// Chain oracle client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    /// Base URL, e.g. `https://mapi.example.com`.
    pub host: String,
    /// Hex secret key signing oracle requests; the node key when empty.
    pub private_key: String,
    /// Per-request deadline.
    pub timeout_secs: u64,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            host: "http://127.0.0.1:3000".to_string(),
            private_key: String::new(),
            timeout_secs: 30,
        }
    }
}

impl OracleConfig {
    /// Per-request deadline.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Loop periods.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncIntervals {
    /// State-sync loop.
    pub state_interval_secs: u64,
    /// Unconfirmed-sync loop.
    pub unconfirmed_interval_secs: u64,
    /// Tx-state repair loop.
    pub tx_state_interval_secs: u64,
    /// Spentness aging loop.
    pub spent_interval_secs: u64,
    /// Peer reconnect attempts.
    pub reconnect_interval_secs: u64,
}

impl Default for SyncIntervals {
    fn default() -> Self {
        let sync = SyncConfig::default();
        Self {
            state_interval_secs: sync.state_interval_secs,
            unconfirmed_interval_secs: sync.unconfirmed_interval_secs,
            tx_state_interval_secs: sync.tx_state_interval_secs,
            spent_interval_secs: sync.spent_interval_secs,
            reconnect_interval_secs: RegistryConfig::default().reconnect_interval_secs,
        }
    }
}

/// Complete node configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Base chain network.
    pub network: Network,
    /// Peer RPC listener.
    pub p2p_listen: String,
    /// HTTP API listener.
    pub http_listen: String,
    /// Hex secp256k1 secret key; the node's peer identity.
    pub private_key: String,
    /// Chain oracle.
    pub oracle: OracleConfig,
    /// Ledger storage.
    pub storage: StorageConfig,
    /// Trusted peers; also the inbound allow-list.
    pub peers: Vec<PeerConfig>,
    /// Loop periods.
    pub sync: SyncIntervals,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            network: Network::Mainnet,
            p2p_listen: "0.0.0.0:9000".to_string(),
            http_listen: "0.0.0.0:8080".to_string(),
            private_key: String::new(),
            oracle: OracleConfig::default(),
            storage: StorageConfig::default(),
            peers: Vec::new(),
            sync: SyncIntervals::default(),
        }
    }
}

impl NodeConfig {
    /// Regtest node on ephemeral localhost ports with a fresh key.
    pub fn for_testing() -> Self {
        Self {
            network: Network::Regtest,
            p2p_listen: "127.0.0.1:0".to_string(),
            http_listen: "127.0.0.1:0".to_string(),
            private_key: hex::encode(Secp256k1KeyPair::generate().to_bytes()),
            storage: StorageConfig::for_testing(),
            sync: SyncIntervals {
                state_interval_secs: 1,
                unconfirmed_interval_secs: 1,
                tx_state_interval_secs: 1,
                spent_interval_secs: 1,
                reconnect_interval_secs: 1,
            },
            ..Default::default()
        }
    }

    /// Load from `$BADGE_CONFIG` (or the default path) plus environment
    /// overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());
        let mut config = Self::from_file(Path::new(&path))?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Parse a TOML file; a missing file yields the defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::from_toml(&text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Parse TOML text.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Apply `BADGE_*` overrides read through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("BADGE_NETWORK") {
            self.network = value.parse().map_err(|message| ConfigError::InvalidValue {
                key: "BADGE_NETWORK".into(),
                message,
            })?;
        }
        if let Some(value) = lookup("BADGE_P2P_LISTEN") {
            self.p2p_listen = value;
        }
        if let Some(value) = lookup("BADGE_HTTP_LISTEN") {
            self.http_listen = value;
        }
        if let Some(value) = lookup("BADGE_PRIVATE_KEY") {
            self.private_key = value;
        }
        if let Some(value) = lookup("BADGE_ORACLE_HOST") {
            self.oracle.host = value;
        }
        if let Some(value) = lookup("BADGE_ORACLE_PRIVATE_KEY") {
            self.oracle.private_key = value;
        }
        if let Some(value) = lookup("BADGE_STORAGE_BACKEND") {
            self.storage.backend = match value.to_ascii_lowercase().as_str() {
                "memory" => StorageBackend::Memory,
                "rocksdb" => StorageBackend::Rocksdb,
                other => {
                    return Err(ConfigError::InvalidValue {
                        key: "BADGE_STORAGE_BACKEND".into(),
                        message: format!("unknown backend {other}"),
                    })
                }
            };
        }
        if let Some(value) = lookup("BADGE_STORAGE_PATH") {
            self.storage.path = value.into();
        }
        Ok(())
    }

    /// Reject configurations the node cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.private_key.trim().is_empty() {
            return Err(ConfigError::MissingPrivateKey);
        }
        self.keypair()?;
        self.oracle_keypair()?;
        self.p2p_addr()?;
        self.http_addr()?;
        if self.oracle.host.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "oracle.host".into(),
                message: "must not be empty".into(),
            });
        }
        for peer in &self.peers {
            Secp256k1PublicKey::from_hex(&peer.pubkey).map_err(|e| ConfigError::InvalidPeer {
                host: peer.host.clone(),
                reason: e.to_string(),
            })?;
            if peer.host.trim().is_empty() {
                return Err(ConfigError::InvalidPeer {
                    host: peer.host.clone(),
                    reason: "empty host".into(),
                });
            }
        }
        Ok(())
    }

    /// The node identity.
    pub fn keypair(&self) -> Result<Secp256k1KeyPair, ConfigError> {
        Secp256k1KeyPair::from_hex(self.private_key.trim()).map_err(|e| ConfigError::InvalidValue {
            key: "private_key".into(),
            message: e.to_string(),
        })
    }

    /// Key signing oracle requests.
    pub fn oracle_keypair(&self) -> Result<Secp256k1KeyPair, ConfigError> {
        if self.oracle.private_key.trim().is_empty() {
            return self.keypair();
        }
        Secp256k1KeyPair::from_hex(self.oracle.private_key.trim()).map_err(|e| {
            ConfigError::InvalidValue {
                key: "oracle.private_key".into(),
                message: e.to_string(),
            }
        })
    }

    /// Peer RPC listen address.
    pub fn p2p_addr(&self) -> Result<SocketAddr, ConfigError> {
        parse_addr("p2p_listen", &self.p2p_listen)
    }

    /// HTTP API listen address.
    pub fn http_addr(&self) -> Result<SocketAddr, ConfigError> {
        parse_addr("http_listen", &self.http_listen)
    }

    /// Settings for the partition sync subsystem.
    pub fn sync_config(&self) -> SyncConfig {
        SyncConfig {
            network: self.network,
            state_interval_secs: self.sync.state_interval_secs,
            unconfirmed_interval_secs: self.sync.unconfirmed_interval_secs,
            tx_state_interval_secs: self.sync.tx_state_interval_secs,
            spent_interval_secs: self.sync.spent_interval_secs,
            ..SyncConfig::default()
        }
    }

    /// Settings for the peer transport.
    pub fn registry_config(&self) -> RegistryConfig {
        RegistryConfig {
            reconnect_interval_secs: self.sync.reconnect_interval_secs,
            ..RegistryConfig::default()
        }
    }
}

fn parse_addr(key: &str, value: &str) -> Result<SocketAddr, ConfigError> {
    value.parse().map_err(|e: std::net::AddrParseError| ConfigError::InvalidValue {
        key: key.into(),
        message: e.to_string(),
    })
}
