//! Key-value backend abstraction
//!
//! The directory store talks to its primary storage only through
//! [`KvBackend`]: ordered byte keys, point reads, prefix scans and atomic
//! write batches. A batch is applied entirely or not at all, which lets the
//! store write a record, its index blobs and the sequence as one unit.

use std::collections::BTreeMap;
use std::fmt::Debug;

use gds_core::Result;
use serde::{Deserialize, Serialize};

/// A single mutation inside a [`WriteBatch`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BatchOp {
    /// Insert or replace a key
    Put {
        /// Key to write
        key: Vec<u8>,
        /// Value to store
        value: Vec<u8>,
    },
    /// Remove a key; removing an absent key is not an error
    Delete {
        /// Key to remove
        key: Vec<u8>,
    },
}

/// Ordered set of mutations applied atomically
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteBatch {
    ops: Vec<BatchOp>,
}

impl WriteBatch {
    /// Create an empty batch
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a put
    pub fn put(&mut self, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> &mut Self {
        self.ops.push(BatchOp::Put {
            key: key.into(),
            value: value.into(),
        });
        self
    }

    /// Queue a delete
    pub fn delete(&mut self, key: impl Into<Vec<u8>>) -> &mut Self {
        self.ops.push(BatchOp::Delete { key: key.into() });
        self
    }

    /// Number of queued mutations
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// True if nothing is queued
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Queued mutations in application order
    pub fn ops(&self) -> &[BatchOp] {
        &self.ops
    }

    /// Consume the batch, yielding its mutations
    pub fn into_ops(self) -> Vec<BatchOp> {
        self.ops
    }
}

impl From<Vec<BatchOp>> for WriteBatch {
    fn from(ops: Vec<BatchOp>) -> Self {
        WriteBatch { ops }
    }
}

/// Ordered key-value storage used as the primary store
pub trait KvBackend: Send + Sync + Debug {
    /// Point lookup
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Apply every mutation in the batch atomically
    fn write(&mut self, batch: WriteBatch) -> Result<()>;

    /// Snapshot of every pair whose key starts with `prefix`, in key order
    ///
    /// An empty prefix scans the whole store.
    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>>;

    /// True if at least one key starts with `prefix`
    fn has_prefix(&self, prefix: &[u8]) -> Result<bool> {
        Ok(!self.scan_prefix(prefix)?.is_empty())
    }

    /// Make every applied batch durable
    fn sync(&mut self) -> Result<()>;

    /// Insert or replace a single key
    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        let mut batch = WriteBatch::new();
        batch.put(key, value);
        self.write(batch)
    }

    /// Remove a single key
    fn delete(&mut self, key: &[u8]) -> Result<()> {
        let mut batch = WriteBatch::new();
        batch.delete(key);
        self.write(batch)
    }
}

/// Apply a batch to an ordered map
pub(crate) fn apply_ops(data: &mut BTreeMap<Vec<u8>, Vec<u8>>, ops: Vec<BatchOp>) -> usize {
    let n = ops.len();
    for op in ops {
        match op {
            BatchOp::Put { key, value } => {
                data.insert(key, value);
            }
            BatchOp::Delete { key } => {
                data.remove(&key);
            }
        }
    }
    n
}

/// Collect the pairs under `prefix` from an ordered map
pub(crate) fn scan_map(
    data: &BTreeMap<Vec<u8>, Vec<u8>>,
    prefix: &[u8],
) -> Vec<(Vec<u8>, Vec<u8>)> {
    data.range(prefix.to_vec()..)
        .take_while(|(k, _)| k.starts_with(prefix))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// True if any key in the map starts with `prefix`
pub(crate) fn map_has_prefix(data: &BTreeMap<Vec<u8>, Vec<u8>>, prefix: &[u8]) -> bool {
    data.range(prefix.to_vec()..)
        .next()
        .map_or(false, |(k, _)| k.starts_with(prefix))
}
