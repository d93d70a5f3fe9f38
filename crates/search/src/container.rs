//! Container index: one normalized key maps to a sorted set of values
//!
//! Used for the countries and categories indices. Each value list is kept
//! strictly increasing with no duplicates; an emptied list stays in the index.

use std::collections::BTreeMap;

use gds_core::{Error, Result};

use crate::blob;
use crate::normalize::{apply, Normalizer};
use crate::sorted;

/// Multi-valued secondary index
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerIndex {
    entries: BTreeMap<String, Vec<String>>,
}

impl ContainerIndex {
    /// Create an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `value` to the set for `key`
    ///
    /// Returns false if the normalized key is empty or the value is already
    /// present.
    pub fn add(&mut self, key: &str, value: &str, norm: Option<Normalizer>) -> bool {
        let key = apply(norm, key);
        if key.is_empty() {
            return false;
        }
        sorted::insort(self.entries.entry(key).or_default(), value)
    }

    /// Remove `value` from the set for `key`, leaving an empty set behind
    pub fn remove(&mut self, key: &str, value: &str, norm: Option<Normalizer>) -> bool {
        match self.entries.get_mut(&apply(norm, key)) {
            Some(arr) => sorted::remove(arr, value),
            None => false,
        }
    }

    /// Values stored for the key, in sorted order
    pub fn find(&self, key: &str, norm: Option<Normalizer>) -> Option<&[String]> {
        self.entries.get(&apply(norm, key)).map(Vec::as_slice)
    }

    /// Every key whose set contains `value`, in key order
    ///
    /// Values are stored verbatim, so the normalizer is not applied.
    pub fn reverse(&self, value: &str, _norm: Option<Normalizer>) -> Option<Vec<String>> {
        let keys: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, arr)| sorted::contains(arr, value))
            .map(|(k, _)| k.clone())
            .collect();
        if keys.is_empty() {
            None
        } else {
            Some(keys)
        }
    }

    /// True if the set for `key` contains `value`
    pub fn contains(&self, key: &str, value: &str, norm: Option<Normalizer>) -> bool {
        self.find(key, norm)
            .map_or(false, |arr| sorted::contains(arr, value))
    }

    /// Every key starting with `prefix` and its values, in key order
    pub fn prefixed<'a>(
        &'a self,
        prefix: &'a str,
    ) -> impl Iterator<Item = (&'a str, &'a [String])> + 'a {
        self.entries
            .range(prefix.to_string()..)
            .take_while(move |(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Number of keys, including keys whose set is empty
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the index holds no keys
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over every entry in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Serialize as gzip-compressed JSON
    pub fn dump(&self) -> Result<Vec<u8>> {
        blob::dump(&self.entries)
    }

    /// Replace the contents with a blob produced by [`ContainerIndex::dump`]
    ///
    /// A blob whose value lists are not strictly increasing is rejected as
    /// corruption. On failure the index is left unchanged.
    pub fn load(&mut self, data: &[u8]) -> Result<()> {
        let entries: BTreeMap<String, Vec<String>> = blob::load(data)?;
        if let Some((key, _)) = entries.iter().find(|(_, arr)| !sorted::is_sorted_dedup(arr)) {
            return Err(Error::corruption(format!(
                "container index values for {:?} are not sorted and unique",
                key
            )));
        }
        self.entries = entries;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const COUNTRY: Option<Normalizer> = Some(Normalizer::Country);

    fn strs(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_add_keeps_sorted_unique() {
        let mut idx = ContainerIndex::new();
        assert!(idx.add("United States", "c", COUNTRY));
        assert!(idx.add("US", "a", COUNTRY));
        assert!(idx.add("usa", "b", COUNTRY));
        assert!(!idx.add("840", "a", COUNTRY));
        assert_eq!(idx.find("US", None), Some(strs(&["a", "b", "c"]).as_slice()));
        assert_eq!(idx.len(), 1);
    }

    #[test]
    fn test_empty_key_rejected() {
        let mut idx = ContainerIndex::new();
        assert!(!idx.add("  ", "a", COUNTRY));
        assert!(idx.is_empty());
    }

    #[test]
    fn test_remove_leaves_empty_list() {
        let mut idx = ContainerIndex::new();
        idx.add("GY", "a", None);
        assert!(idx.remove("GY", "a", None));
        assert_eq!(idx.find("GY", None), Some(&[][..]));
        assert!(!idx.remove("GY", "a", None));
        assert!(!idx.remove("missing", "a", None));
        assert_eq!(idx.len(), 1);
    }

    #[test]
    fn test_add_remove_symmetry() {
        let mut idx = ContainerIndex::new();
        idx.add("US", "a", None);
        idx.add("US", "c", None);
        let before = idx.clone();
        assert!(idx.add("US", "b", None));
        assert!(idx.remove("US", "b", None));
        assert_eq!(idx, before);
    }

    #[test]
    fn test_reverse_and_contains() {
        let mut idx = ContainerIndex::new();
        idx.add("exchange", "id1", None);
        idx.add("kiosk", "id1", None);
        idx.add("kiosk", "id2", None);
        assert_eq!(
            idx.reverse("id1", None),
            Some(strs(&["exchange", "kiosk"]))
        );
        assert_eq!(idx.reverse("id3", None), None);
        assert!(idx.contains("kiosk", "id2", None));
        assert!(!idx.contains("exchange", "id2", None));
    }

    #[test]
    fn test_dump_load_fidelity() {
        let mut idx = ContainerIndex::new();
        idx.add("US", "idA", None);
        idx.add("US", "idB", None);
        idx.add("GY", "idC", None);
        idx.add("FR", "idD", None);
        idx.remove("FR", "idD", None);

        let dumped = idx.dump().unwrap();
        let mut restored = ContainerIndex::new();
        restored.load(&dumped).unwrap();
        assert_eq!(restored, idx);
        assert_eq!(restored.dump().unwrap(), dumped);
    }

    #[test]
    fn test_load_rejects_unsorted_lists() {
        let mut bad = BTreeMap::new();
        bad.insert("US".to_string(), strs(&["b", "a"]));
        let blob = blob::dump(&bad).unwrap();

        let mut idx = ContainerIndex::new();
        let err = idx.load(&blob).unwrap_err();
        assert!(matches!(err, Error::Corruption(_)));
        assert!(idx.is_empty());
    }

    #[derive(Debug, Clone)]
    enum Op {
        Add(u8, u8),
        Remove(u8, u8),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0u8..4, 0u8..16).prop_map(|(k, v)| Op::Add(k, v)),
            (0u8..4, 0u8..16).prop_map(|(k, v)| Op::Remove(k, v)),
        ]
    }

    proptest! {
        #[test]
        fn prop_lists_stay_sorted_and_unique(ops in proptest::collection::vec(op(), 0..200)) {
            let mut idx = ContainerIndex::new();
            for op in ops {
                match op {
                    Op::Add(k, v) => idx.add(&format!("k{}", k), &format!("v{:02}", v), None),
                    Op::Remove(k, v) => idx.remove(&format!("k{}", k), &format!("v{:02}", v), None),
                };
                for (_, arr) in idx.iter() {
                    prop_assert!(sorted::is_sorted_dedup(arr));
                }
            }
        }

        #[test]
        fn prop_dump_load_is_byte_identical(ops in proptest::collection::vec(op(), 0..100)) {
            let mut idx = ContainerIndex::new();
            for op in ops {
                if let Op::Add(k, v) = op {
                    idx.add(&format!("k{}", k), &format!("{}", v), None);
                }
            }
            let dumped = idx.dump().unwrap();
            let mut restored = ContainerIndex::new();
            restored.load(&dumped).unwrap();
            prop_assert_eq!(restored.dump().unwrap(), dumped);
        }
    }
}
