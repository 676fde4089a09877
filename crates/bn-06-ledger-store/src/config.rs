//! Storage backend selection.

use serde::{Deserialize, Serialize};

/// Key-value backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Process memory; lost on exit.
    #[default]
    Memory,
    /// RocksDB at [`StorageConfig::path`]. Needs the `rocksdb` feature.
    Rocksdb,
}

/// Storage configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Backend to open.
    pub backend: StorageBackend,
    /// Database directory for persistent backends.
    pub path: String,
    /// fsync every write batch.
    pub sync_writes: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Memory,
            path: "./data/badge".to_string(),
            sync_writes: true,
        }
    }
}

impl StorageConfig {
    /// In-memory storage.
    pub fn for_testing() -> Self {
        Self {
            sync_writes: false,
            ..Self::default()
        }
    }
}
