//! Sorted, deduplicated string lists
//!
//! Container value lists and search results are kept strictly increasing.
//! Mutations binary-search for the position and shift neighbours in place;
//! the list is never re-sorted as a whole.

/// Insert `item` at its sorted position; returns false if already present.
pub fn insort(arr: &mut Vec<String>, item: impl Into<String>) -> bool {
    let item = item.into();
    match arr.binary_search(&item) {
        Ok(_) => false,
        Err(i) => {
            arr.insert(i, item);
            true
        }
    }
}

/// Remove `item`; returns false if it was not present.
pub fn remove(arr: &mut Vec<String>, item: &str) -> bool {
    match arr.binary_search_by(|entry| entry.as_str().cmp(item)) {
        Ok(i) => {
            arr.remove(i);
            true
        }
        Err(_) => false,
    }
}

/// Binary-search membership test.
pub fn contains(arr: &[String], item: &str) -> bool {
    arr.binary_search_by(|entry| entry.as_str().cmp(item)).is_ok()
}

/// True if every element is strictly greater than the one before it.
pub fn is_sorted_dedup(arr: &[String]) -> bool {
    arr.windows(2).all(|w| w[0] < w[1])
}

/// Merge every element of `other` into `arr`, keeping `arr` sorted and unique.
pub fn merge(arr: &mut Vec<String>, other: &[String]) {
    for item in other {
        if !contains(arr, item) {
            insort(arr, item.as_str());
        }
    }
}

/// Elements present in both sorted lists.
pub fn intersect(a: &[String], b: &[String]) -> Vec<String> {
    let (mut i, mut j) = (0, 0);
    let mut out = Vec::with_capacity(a.len().min(b.len()));
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                out.push(a[i].clone());
                i += 1;
                j += 1;
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strs(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_insort() {
        let mut arr = Vec::new();
        for item in ["c", "a", "d", "b", "a", "c"] {
            insort(&mut arr, item);
        }
        assert_eq!(arr, strs(&["a", "b", "c", "d"]));
        assert!(!insort(&mut arr, "d"));
        assert!(insort(&mut arr, "e"));
    }

    #[test]
    fn test_remove() {
        let mut arr = strs(&["a", "b", "c"]);
        assert!(remove(&mut arr, "b"));
        assert!(!remove(&mut arr, "b"));
        assert_eq!(arr, strs(&["a", "c"]));
        assert!(remove(&mut arr, "a"));
        assert!(remove(&mut arr, "c"));
        assert!(arr.is_empty());
    }

    #[test]
    fn test_contains() {
        let arr = strs(&["a", "c", "e"]);
        assert!(contains(&arr, "c"));
        assert!(!contains(&arr, "d"));
        assert!(!contains(&[], "a"));
    }

    #[test]
    fn test_is_sorted_dedup() {
        assert!(is_sorted_dedup(&strs(&["a", "b"])));
        assert!(!is_sorted_dedup(&strs(&["a", "a"])));
        assert!(!is_sorted_dedup(&strs(&["b", "a"])));
        assert!(is_sorted_dedup(&[]));
    }

    #[test]
    fn test_merge_and_intersect() {
        let mut arr = strs(&["a", "c"]);
        merge(&mut arr, &strs(&["b", "c", "d"]));
        assert_eq!(arr, strs(&["a", "b", "c", "d"]));
        assert_eq!(intersect(&arr, &strs(&["b", "d", "z"])), strs(&["b", "d"]));
        assert!(intersect(&arr, &[]).is_empty());
    }
}
