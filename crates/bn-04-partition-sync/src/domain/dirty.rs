//! # Dirty Partition Set
//!
//! Partitions whose digest must be recomputed before the next comparison.
//! Guarded by its own mutex, independent of the ingest lock; flushes take
//! the whole set in one swap.

use std::collections::BTreeSet;

use parking_lot::Mutex;
use shared_types::NetworkParams;

/// Set of partition ids awaiting digest recomputation.
pub struct DirtyPartitions {
    params: NetworkParams,
    ids: Mutex<BTreeSet<i64>>,
}

impl DirtyPartitions {
    /// Empty set for the given partition geometry.
    pub fn new(params: NetworkParams) -> Self {
        Self {
            params,
            ids: Mutex::new(BTreeSet::new()),
        }
    }

    /// Mark partition `id`. Negative ids are ignored.
    pub fn mark(&self, id: i64) {
        if id >= 0 {
            self.ids.lock().insert(id);
        }
    }

    /// Mark the partitions `[start, end)`.
    pub fn mark_range(&self, start: i64, end: i64) {
        let mut ids = self.ids.lock();
        ids.extend(start.max(0)..end);
    }

    /// Mark the partition holding `height`.
    ///
    /// Heights below the start height, including unconfirmed (-1), belong to
    /// no partition and are ignored. Returns the marked id.
    pub fn mark_height(&self, height: i64) -> Option<i64> {
        let id = self.params.partition_of(height)?;
        self.ids.lock().insert(id);
        Some(id)
    }

    /// Take every marked id, leaving the set empty.
    pub fn drain(&self) -> Vec<i64> {
        std::mem::take(&mut *self.ids.lock()).into_iter().collect()
    }

    /// Whether `id` is marked.
    pub fn contains(&self, id: i64) -> bool {
        self.ids.lock().contains(&id)
    }

    /// Number of marked ids.
    pub fn len(&self) -> usize {
        self.ids.lock().len()
    }

    /// True when nothing is marked.
    pub fn is_empty(&self) -> bool {
        self.ids.lock().is_empty()
    }
}
