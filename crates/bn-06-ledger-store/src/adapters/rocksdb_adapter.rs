//! # RocksDB Storage Adapter
//!
//! RocksDB implementation of [`KeyValueStore`].
//!
//! ## Features
//!
//! - Atomic batch writes (`WriteBatch`)
//! - Snappy compression
//! - Bloom filters for point lookups
//! - Optional fsync per batch

use std::path::Path;

use rocksdb::{Direction, IteratorMode, Options, WriteBatch, WriteOptions, DB};

use crate::config::StorageConfig;
use crate::domain::StoreError;
use crate::ports::{BatchOperation, KeyValueStore};

/// RocksDB tuning.
#[derive(Debug, Clone)]
pub struct RocksDbConfig {
    /// Path to the database directory
    pub path: String,
    /// Block cache size in bytes (default: 128MB)
    pub block_cache_size: usize,
    /// Write buffer size in bytes (default: 64MB)
    pub write_buffer_size: usize,
    /// Maximum number of write buffers (default: 3)
    pub max_write_buffer_number: i32,
    /// Enable fsync after each write (default: true for durability)
    pub sync_writes: bool,
}

impl Default for RocksDbConfig {
    fn default() -> Self {
        Self {
            path: "./data/badge".to_string(),
            block_cache_size: 128 * 1024 * 1024,
            write_buffer_size: 64 * 1024 * 1024,
            max_write_buffer_number: 3,
            sync_writes: true,
        }
    }
}

impl RocksDbConfig {
    /// Small buffers, no sync.
    pub fn for_testing(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            block_cache_size: 8 * 1024 * 1024,
            write_buffer_size: 4 * 1024 * 1024,
            max_write_buffer_number: 2,
            sync_writes: false,
        }
    }
}

impl From<&StorageConfig> for RocksDbConfig {
    fn from(config: &StorageConfig) -> Self {
        Self {
            path: config.path.clone(),
            sync_writes: config.sync_writes,
            ..Self::default()
        }
    }
}

/// RocksDB-backed key-value store.
pub struct RocksDbStore {
    db: DB,
    config: RocksDbConfig,
}

fn io_error(op: &str, e: rocksdb::Error) -> StoreError {
    StoreError::IOError {
        message: format!("RocksDB {} failed: {}", op, e),
    }
}

impl RocksDbStore {
    /// Open or create a database.
    pub fn open(config: RocksDbConfig) -> Result<Self, StoreError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.set_write_buffer_size(config.write_buffer_size);
        opts.set_max_write_buffer_number(config.max_write_buffer_number);
        opts.set_compression_type(rocksdb::DBCompressionType::Snappy);

        let mut block_opts = rocksdb::BlockBasedOptions::default();
        block_opts.set_bloom_filter(10.0, false);
        block_opts.set_block_cache(&rocksdb::Cache::new_lru_cache(config.block_cache_size));
        opts.set_block_based_table_factory(&block_opts);

        let db = DB::open(&opts, Path::new(&config.path)).map_err(|e| io_error("open", e))?;
        tracing::info!("[bn-06] opened RocksDB at {}", config.path);
        Ok(Self { db, config })
    }

    fn write_options(&self) -> WriteOptions {
        let mut write_opts = WriteOptions::default();
        write_opts.set_sync(self.config.sync_writes);
        write_opts
    }

    fn scan_from(
        &self,
        start: &[u8],
        keep: impl Fn(&[u8]) -> bool,
    ) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError> {
        let mut results = Vec::new();
        for item in self.db.iterator(IteratorMode::From(start, Direction::Forward)) {
            let (key, value) = item.map_err(|e| io_error("scan", e))?;
            if !keep(&key) {
                break;
            }
            results.push((key.to_vec(), value.to_vec()));
        }
        Ok(results)
    }
}

impl KeyValueStore for RocksDbStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        self.db.get(key).map_err(|e| io_error("get", e))
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        self.db
            .put_opt(key, value, &self.write_options())
            .map_err(|e| io_error("put", e))
    }

    fn delete(&self, key: &[u8]) -> Result<(), StoreError> {
        self.db
            .delete_opt(key, &self.write_options())
            .map_err(|e| io_error("delete", e))
    }

    fn atomic_batch_write(&self, operations: Vec<BatchOperation>) -> Result<(), StoreError> {
        let mut batch = WriteBatch::default();
        for op in operations {
            match op {
                BatchOperation::Put { key, value } => batch.put(&key, &value),
                BatchOperation::Delete { key } => batch.delete(&key),
            }
        }
        self.db
            .write_opt(batch, &self.write_options())
            .map_err(|e| io_error("batch write", e))
    }

    fn exists(&self, key: &[u8]) -> Result<bool, StoreError> {
        self.db
            .get_pinned(key)
            .map(|v| v.is_some())
            .map_err(|e| io_error("exists check", e))
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError> {
        self.scan_from(prefix, |key| key.starts_with(prefix))
    }

    fn range_scan(&self, start: &[u8], end: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError> {
        if start >= end {
            return Ok(Vec::new());
        }
        self.scan_from(start, |key| key < end)
    }
}
