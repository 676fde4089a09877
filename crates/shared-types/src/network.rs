//! Network selection and partition geometry.

use serde::{Deserialize, Serialize};

/// Number of chain heights covered by one partition.
pub const PARTITION_BLOCK_COUNT: i64 = 10;

/// Base chain the node follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    /// Main network.
    #[default]
    Mainnet,
    /// Local regression-test network (test address prefix).
    Regtest,
}

impl Network {
    /// First height covered by partition 0.
    pub fn start_height(self) -> i64 {
        match self {
            Network::Mainnet => 650_000,
            Network::Regtest => 0,
        }
    }
}

impl std::str::FromStr for Network {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mainnet" | "main" => Ok(Network::Mainnet),
            "regtest" => Ok(Network::Regtest),
            other => Err(format!("unknown network: {other}")),
        }
    }
}

/// Height range bookkeeping for partitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkParams {
    /// Height of partition 0.
    pub start_height: i64,
    /// Heights per partition.
    pub partition_block_count: i64,
}

impl NetworkParams {
    /// Parameters for a network.
    pub fn for_network(network: Network) -> Self {
        Self {
            start_height: network.start_height(),
            partition_block_count: PARTITION_BLOCK_COUNT,
        }
    }

    /// Partition holding `height`, or `None` for heights below the start
    /// height (which includes unconfirmed transactions).
    pub fn partition_of(&self, height: i64) -> Option<i64> {
        if height < self.start_height {
            return None;
        }
        Some((height - self.start_height) / self.partition_block_count)
    }

    /// Half-open height range `[start, end)` of partition `id`, or `None`
    /// when the range does not fit in an `i64`.
    pub fn height_range(&self, id: i64) -> Option<(i64, i64)> {
        let start = id
            .checked_mul(self.partition_block_count)?
            .checked_add(self.start_height)?;
        Some((start, start.checked_add(self.partition_block_count)?))
    }

    /// Number of partitions needed to cover heights up to `tip`.
    pub fn expected_partitions(&self, tip: i64) -> i64 {
        if tip < self.start_height {
            return 0;
        }
        (tip - self.start_height) / self.partition_block_count + 1
    }
}
