//! Ledger configuration.

use serde::{Deserialize, Serialize};
use shared_types::Network;

/// Settings for the ledger state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Network used to render badge output addresses.
    pub network: Network,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            network: Network::Mainnet,
        }
    }
}

impl LedgerConfig {
    /// Regtest configuration for tests.
    pub fn for_testing() -> Self {
        Self {
            network: Network::Regtest,
        }
    }
}
