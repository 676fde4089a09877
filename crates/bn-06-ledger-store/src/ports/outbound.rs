//! # Outbound Ports
//!
//! The ordered key-value store the ledger tables are laid out on.

use std::collections::BTreeMap;
use std::ops::Bound;

use parking_lot::RwLock;

use crate::domain::StoreError;

/// Abstract interface for an ordered key-value store.
///
/// Implementations synchronize internally; every method takes `&self`.
pub trait KeyValueStore: Send + Sync {
    /// Get a value by key.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError>;

    /// Put a single key-value pair.
    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StoreError>;

    /// Delete a key.
    fn delete(&self, key: &[u8]) -> Result<(), StoreError>;

    /// Execute an atomic batch write.
    ///
    /// Either all operations in the batch are applied, or none are.
    fn atomic_batch_write(&self, operations: Vec<BatchOperation>) -> Result<(), StoreError>;

    /// Check if a key exists.
    fn exists(&self, key: &[u8]) -> Result<bool, StoreError>;

    /// Entries whose key starts with `prefix`, in key order.
    fn prefix_scan(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError>;

    /// Entries with `start <= key < end`, in key order.
    fn range_scan(&self, start: &[u8], end: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError>;
}

/// Batch operation for atomic writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOperation {
    /// Put a key-value pair.
    Put {
        /// Key.
        key: Vec<u8>,
        /// Value.
        value: Vec<u8>,
    },
    /// Delete a key.
    Delete {
        /// Key.
        key: Vec<u8>,
    },
}

impl BatchOperation {
    /// Create a Put operation.
    pub fn put(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        BatchOperation::Put {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Create a Delete operation.
    pub fn delete(key: impl Into<Vec<u8>>) -> Self {
        BatchOperation::Delete { key: key.into() }
    }
}

// =============================================================================
// ADAPTER IMPLEMENTATIONS
// Production: RocksDbStore in adapters/rocksdb.rs
// Testing and ephemeral nodes: in-memory store below
// =============================================================================

/// In-memory ordered key-value store.
#[derive(Default)]
pub struct InMemoryKVStore {
    data: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl InMemoryKVStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// True when nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }
}

impl KeyValueStore for InMemoryKVStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.data.read().get(key).cloned())
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        self.data.write().insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> Result<(), StoreError> {
        self.data.write().remove(key);
        Ok(())
    }

    fn atomic_batch_write(&self, operations: Vec<BatchOperation>) -> Result<(), StoreError> {
        // One write guard for the whole batch.
        let mut data = self.data.write();
        for op in operations {
            match op {
                BatchOperation::Put { key, value } => {
                    data.insert(key, value);
                }
                BatchOperation::Delete { key } => {
                    data.remove(&key);
                }
            }
        }
        Ok(())
    }

    fn exists(&self, key: &[u8]) -> Result<bool, StoreError> {
        Ok(self.data.read().contains_key(key))
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError> {
        let data = self.data.read();
        Ok(data
            .range::<[u8], _>((Bound::Included(prefix), Bound::Unbounded))
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    fn range_scan(&self, start: &[u8], end: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError> {
        if start >= end {
            return Ok(Vec::new());
        }
        let data = self.data.read();
        Ok(data
            .range::<[u8], _>((Bound::Included(start), Bound::Excluded(end)))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_applies_in_order() {
        let store = InMemoryKVStore::new();
        store
            .atomic_batch_write(vec![
                BatchOperation::put(b"a".to_vec(), b"1".to_vec()),
                BatchOperation::put(b"b".to_vec(), b"2".to_vec()),
                BatchOperation::delete(b"a".to_vec()),
            ])
            .unwrap();
        assert!(!store.exists(b"a").unwrap());
        assert_eq!(store.get(b"b").unwrap(), Some(b"2".to_vec()));
    }

    #[test]
    fn test_prefix_scan_is_ordered_and_bounded() {
        let store = InMemoryKVStore::new();
        for key in [b"p/2".as_slice(), b"p/1", b"q/0", b"o/9"] {
            store.put(key, b"").unwrap();
        }
        let keys: Vec<_> = store
            .prefix_scan(b"p/")
            .unwrap()
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        assert_eq!(keys, vec![b"p/1".to_vec(), b"p/2".to_vec()]);
    }

    #[test]
    fn test_range_scan_excludes_end() {
        let store = InMemoryKVStore::new();
        for key in [b"k1".as_slice(), b"k2", b"k3"] {
            store.put(key, b"").unwrap();
        }
        assert_eq!(store.range_scan(b"k1", b"k3").unwrap().len(), 2);
        assert!(store.range_scan(b"k3", b"k1").unwrap().is_empty());
    }
}
