//! # Sync Configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};
use shared_types::Network;

/// Timing and window settings for partition sync.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Network, for start height and addresses.
    pub network: Network,
    /// Seconds between state sync runs.
    pub state_interval_secs: u64,
    /// Seconds between unconfirmed sync runs.
    pub unconfirmed_interval_secs: u64,
    /// Seconds between tx state repair runs.
    pub tx_state_interval_secs: u64,
    /// Seconds between spentness aging runs.
    pub spent_interval_secs: u64,
    /// Heights below the tip re-checked by tx state repair.
    pub tx_state_window: i64,
    /// Minimum age of a spend before it may be aged.
    pub spent_min_age_secs: i64,
    /// Confirmations a spend needs before it is aged.
    pub spent_min_confirmations: i64,
    /// Trailing stored partitions re-verified by a regular state sync.
    pub recompute_trailing: i64,
    /// Partitions compared per digest request.
    pub digest_chunk: i64,
    /// Most digests served for one range request.
    pub max_hash_count: i64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            network: Network::Mainnet,
            state_interval_secs: 300,
            unconfirmed_interval_secs: 300,
            tx_state_interval_secs: 60,
            spent_interval_secs: 600,
            tx_state_window: 8,
            spent_min_age_secs: 3600,
            spent_min_confirmations: 20,
            recompute_trailing: 1,
            digest_chunk: 10,
            max_hash_count: 1000,
        }
    }
}

impl SyncConfig {
    /// Regtest configuration with short periods.
    pub fn for_testing() -> Self {
        Self {
            network: Network::Regtest,
            state_interval_secs: 1,
            unconfirmed_interval_secs: 1,
            tx_state_interval_secs: 1,
            spent_interval_secs: 1,
            ..Default::default()
        }
    }

    /// State sync period.
    pub fn state_interval(&self) -> Duration {
        Duration::from_secs(self.state_interval_secs)
    }

    /// Unconfirmed sync period.
    pub fn unconfirmed_interval(&self) -> Duration {
        Duration::from_secs(self.unconfirmed_interval_secs)
    }

    /// Tx state repair period.
    pub fn tx_state_interval(&self) -> Duration {
        Duration::from_secs(self.tx_state_interval_secs)
    }

    /// Spentness aging period.
    pub fn spent_interval(&self) -> Duration {
        Duration::from_secs(self.spent_interval_secs)
    }
}
