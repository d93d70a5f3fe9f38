//! Query parsing and search strategies
//!
//! A query is a JSON object mapping a field name to a string or a list of
//! strings. Each field is answered by a [`Searcher`]: a [`SearchStrategy`]
//! bound to a field name and normalizer. Every strategy returns record ids
//! sorted ascending with no duplicates.
//!
//! # Usage
//!
//! ```ignore
//! let names = NormalizedUnique::new(Normalizer::Fold);
//! let searcher = names.prefix_match("name", 3);
//! let ids = searcher.search(&names, &query);
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::container::ContainerIndex;
use crate::normalize::{apply, Normalizer};
use crate::sorted;
use crate::unique::UniqueIndex;

/// Generic query: field name to a string or list of strings
pub type Query = Map<String, Value>;

/// Default minimum term length for prefix fallback
pub const SEARCH_PREFIX_MIN_LENGTH: usize = 3;

/// Extract the normalized terms for `field` from the query
///
/// Terms are sorted and deduplicated. Returns `None` if the field is missing
/// or is anything other than a string or a list of strings.
pub fn parse_query(field: &str, query: &Query, norm: Option<Normalizer>) -> Option<Vec<String>> {
    match query.get(field)? {
        Value::String(term) => Some(vec![apply(norm, term)]),
        Value::Array(items) => {
            let mut terms = Vec::with_capacity(items.len());
            for item in items {
                sorted::insort(&mut terms, apply(norm, item.as_str()?));
            }
            Some(terms)
        }
        _ => None,
    }
}

/// Read-only view of an index a strategy can evaluate against
#[derive(Debug, Clone, Copy)]
pub enum IndexView<'a> {
    /// Single-valued index
    Unique(&'a UniqueIndex),
    /// Multi-valued index
    Container(&'a ContainerIndex),
}

impl<'a> From<&'a UniqueIndex> for IndexView<'a> {
    fn from(index: &'a UniqueIndex) -> Self {
        IndexView::Unique(index)
    }
}

impl<'a> From<&'a ContainerIndex> for IndexView<'a> {
    fn from(index: &'a ContainerIndex) -> Self {
        IndexView::Container(index)
    }
}

impl<'a> From<&'a NormalizedUnique> for IndexView<'a> {
    fn from(index: &'a NormalizedUnique) -> Self {
        IndexView::Unique(&index.index)
    }
}

impl<'a> From<&'a NormalizedContainer> for IndexView<'a> {
    fn from(index: &'a NormalizedContainer) -> Self {
        IndexView::Container(&index.index)
    }
}

/// How terms are matched against an index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchStrategy {
    /// Each term must equal an index key
    ExactMatch,
    /// Exact match, falling back to a key-prefix scan for terms of at least
    /// `min_len` bytes
    PrefixMatch {
        /// Shortest term eligible for the prefix fallback
        min_len: usize,
    },
    /// Each term selects every id in the matching key's set
    ContainsMembership,
}

impl SearchStrategy {
    /// Evaluate already-normalized terms against an index
    ///
    /// On a container index every matched key contributes its whole set, so
    /// `ExactMatch` and `ContainsMembership` agree there.
    pub fn evaluate(&self, index: IndexView<'_>, terms: &[String]) -> Vec<String> {
        let mut results = Vec::new();
        for term in terms {
            let exact = match index {
                IndexView::Unique(idx) => match idx.find(term, None) {
                    Some(id) => {
                        sorted::insort(&mut results, id);
                        true
                    }
                    None => false,
                },
                IndexView::Container(idx) => match idx.find(term, None) {
                    Some(ids) => {
                        sorted::merge(&mut results, ids);
                        true
                    }
                    None => false,
                },
            };

            if let SearchStrategy::PrefixMatch { min_len } = *self {
                if !exact && term.len() >= min_len {
                    match index {
                        IndexView::Unique(idx) => {
                            for (_, id) in idx.prefixed(term) {
                                sorted::insort(&mut results, id);
                            }
                        }
                        IndexView::Container(idx) => {
                            for (_, ids) in idx.prefixed(term) {
                                sorted::merge(&mut results, ids);
                            }
                        }
                    }
                }
            }
        }
        results
    }

    fn name(&self) -> &'static str {
        match self {
            SearchStrategy::ExactMatch => "exact match",
            SearchStrategy::PrefixMatch { .. } => "prefix match",
            SearchStrategy::ContainsMembership => "contains record",
        }
    }
}

/// A strategy bound to a query field and normalizer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Searcher {
    field: String,
    strategy: SearchStrategy,
    norm: Option<Normalizer>,
}

impl Searcher {
    /// Bind a strategy to a field
    pub fn new(field: impl Into<String>, strategy: SearchStrategy, norm: Option<Normalizer>) -> Self {
        Searcher {
            field: field.into(),
            strategy,
            norm,
        }
    }

    /// Query field this searcher answers
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Strategy used to match terms
    pub fn strategy(&self) -> SearchStrategy {
        self.strategy
    }

    /// Matching ids, or `None` if the query does not constrain this field
    pub fn search<'a>(&self, index: impl Into<IndexView<'a>>, query: &Query) -> Option<Vec<String>> {
        let terms = parse_query(&self.field, query, self.norm)?;
        debug!(
            target: "gds::index",
            index = %self.field,
            terms = ?terms,
            "{} search",
            self.strategy.name()
        );
        Some(self.strategy.evaluate(index.into(), &terms))
    }
}

/// A unique index with its normalizer bound at construction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedUnique {
    index: UniqueIndex,
    norm: Normalizer,
}

impl NormalizedUnique {
    /// Create an empty index using `norm` for every key
    pub fn new(norm: Normalizer) -> Self {
        NormalizedUnique {
            index: UniqueIndex::new(),
            norm,
        }
    }

    /// The bound normalizer
    pub fn normalizer(&self) -> Normalizer {
        self.norm
    }

    /// The underlying index
    pub fn inner(&self) -> &UniqueIndex {
        &self.index
    }

    /// See [`UniqueIndex::add`]
    pub fn add(&mut self, key: &str, value: &str) -> bool {
        self.index.add(key, value, Some(self.norm))
    }

    /// See [`UniqueIndex::overwrite`]
    pub fn overwrite(&mut self, key: &str, value: &str) -> bool {
        self.index.overwrite(key, value, Some(self.norm))
    }

    /// See [`UniqueIndex::remove`]
    pub fn remove(&mut self, key: &str, value: &str) -> bool {
        self.index.remove(key, value, Some(self.norm))
    }

    /// See [`UniqueIndex::find`]
    pub fn find(&self, key: &str) -> Option<&str> {
        self.index.find(key, Some(self.norm))
    }

    /// See [`UniqueIndex::reverse`]
    pub fn reverse(&self, value: &str) -> Option<Vec<String>> {
        self.index.reverse(value, Some(self.norm))
    }

    /// See [`UniqueIndex::contains`]
    pub fn contains(&self, key: &str, value: &str) -> bool {
        self.index.contains(key, value, Some(self.norm))
    }

    /// Number of keys
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// True if the index holds no keys
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// See [`UniqueIndex::dump`]
    pub fn dump(&self) -> gds_core::Result<Vec<u8>> {
        self.index.dump()
    }

    /// See [`UniqueIndex::load`]
    pub fn load(&mut self, data: &[u8]) -> gds_core::Result<()> {
        self.index.load(data)
    }

    /// Searcher answering `field` with exact key matches
    pub fn exact_match(&self, field: &str) -> Searcher {
        Searcher::new(field, SearchStrategy::ExactMatch, Some(self.norm))
    }

    /// Searcher answering `field` with exact or prefix key matches
    pub fn prefix_match(&self, field: &str, min_len: usize) -> Searcher {
        Searcher::new(field, SearchStrategy::PrefixMatch { min_len }, Some(self.norm))
    }
}

/// A container index with its normalizer bound at construction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedContainer {
    index: ContainerIndex,
    norm: Normalizer,
}

impl NormalizedContainer {
    /// Create an empty index using `norm` for every key
    pub fn new(norm: Normalizer) -> Self {
        NormalizedContainer {
            index: ContainerIndex::new(),
            norm,
        }
    }

    /// The bound normalizer
    pub fn normalizer(&self) -> Normalizer {
        self.norm
    }

    /// The underlying index
    pub fn inner(&self) -> &ContainerIndex {
        &self.index
    }

    /// See [`ContainerIndex::add`]
    pub fn add(&mut self, key: &str, value: &str) -> bool {
        self.index.add(key, value, Some(self.norm))
    }

    /// See [`ContainerIndex::remove`]
    pub fn remove(&mut self, key: &str, value: &str) -> bool {
        self.index.remove(key, value, Some(self.norm))
    }

    /// See [`ContainerIndex::find`]
    pub fn find(&self, key: &str) -> Option<&[String]> {
        self.index.find(key, Some(self.norm))
    }

    /// See [`ContainerIndex::reverse`]
    pub fn reverse(&self, value: &str) -> Option<Vec<String>> {
        self.index.reverse(value, Some(self.norm))
    }

    /// See [`ContainerIndex::contains`]
    pub fn contains(&self, key: &str, value: &str) -> bool {
        self.index.contains(key, value, Some(self.norm))
    }

    /// Number of keys
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// True if the index holds no keys
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// See [`ContainerIndex::dump`]
    pub fn dump(&self) -> gds_core::Result<Vec<u8>> {
        self.index.dump()
    }

    /// See [`ContainerIndex::load`]
    pub fn load(&mut self, data: &[u8]) -> gds_core::Result<()> {
        self.index.load(data)
    }

    /// Searcher answering `field` with every id under the matching keys
    pub fn contains_record(&self, field: &str) -> Searcher {
        Searcher::new(field, SearchStrategy::ContainsMembership, Some(self.norm))
    }
}
