//! In-memory backend
//!
//! A `BTreeMap` without persistence. Used for ephemeral stores and tests.

use std::collections::BTreeMap;

use gds_core::Result;

use crate::backend::{apply_ops, map_has_prefix, scan_map, KvBackend, WriteBatch};

/// Ephemeral ordered key-value backend
#[derive(Debug, Default)]
pub struct MemoryBackend {
    data: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl MemoryBackend {
    /// Create an empty backend
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True if no keys are stored
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl KvBackend for MemoryBackend {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.data.get(key).cloned())
    }

    fn write(&mut self, batch: WriteBatch) -> Result<()> {
        apply_ops(&mut self.data, batch.into_ops());
        Ok(())
    }

    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        Ok(scan_map(&self.data, prefix))
    }

    fn has_prefix(&self, prefix: &[u8]) -> Result<bool> {
        Ok(map_has_prefix(&self.data, prefix))
    }

    fn sync(&mut self) -> Result<()> {
        Ok(())
    }
}
