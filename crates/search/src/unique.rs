//! Unique index: one normalized key maps to exactly one value
//!
//! Used for the names and websites indices, where the value is the id of the
//! record that owns the key.

use std::collections::BTreeMap;

use gds_core::Result;

use crate::blob;
use crate::normalize::{apply, Normalizer};

/// Single-valued secondary index
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UniqueIndex {
    entries: BTreeMap<String, String>,
}

impl UniqueIndex {
    /// Create an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `key -> value` unless the key is empty or already present
    pub fn add(&mut self, key: &str, value: &str, norm: Option<Normalizer>) -> bool {
        let key = apply(norm, key);
        if key.is_empty() || self.entries.contains_key(&key) {
            return false;
        }
        self.entries.insert(key, value.to_string());
        true
    }

    /// Set `key -> value`, replacing any existing value
    pub fn overwrite(&mut self, key: &str, value: &str, norm: Option<Normalizer>) -> bool {
        let key = apply(norm, key);
        if key.is_empty() {
            return false;
        }
        self.entries.insert(key, value.to_string());
        true
    }

    /// Delete the key
    ///
    /// The value is not compared; a unique key is removed regardless of the
    /// id it points at.
    pub fn remove(&mut self, key: &str, _value: &str, norm: Option<Normalizer>) -> bool {
        let key = apply(norm, key);
        self.entries.remove(&key).is_some()
    }

    /// Value stored for the key
    pub fn find(&self, key: &str, norm: Option<Normalizer>) -> Option<&str> {
        self.entries.get(&apply(norm, key)).map(String::as_str)
    }

    /// Every key whose value equals `value`, in key order
    ///
    /// Values are stored verbatim, so the normalizer is not applied.
    pub fn reverse(&self, value: &str, _norm: Option<Normalizer>) -> Option<Vec<String>> {
        let keys: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, v)| v.as_str() == value)
            .map(|(k, _)| k.clone())
            .collect();
        if keys.is_empty() {
            None
        } else {
            Some(keys)
        }
    }

    /// True if the key maps to `value`
    pub fn contains(&self, key: &str, value: &str, norm: Option<Normalizer>) -> bool {
        self.find(key, norm) == Some(value)
    }

    /// Every key starting with `prefix` and its value, in key order
    pub fn prefixed<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
        self.entries
            .range(prefix.to_string()..)
            .take_while(move |(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of keys
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the index holds no keys
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over every entry in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Serialize as gzip-compressed JSON
    pub fn dump(&self) -> Result<Vec<u8>> {
        blob::dump(&self.entries)
    }

    /// Replace the contents with a blob produced by [`UniqueIndex::dump`]
    ///
    /// On failure the index is left unchanged.
    pub fn load(&mut self, data: &[u8]) -> Result<()> {
        self.entries = blob::load(data)?;
        Ok(())
    }
}
