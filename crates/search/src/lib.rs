//! Secondary indices and search for the directory store
//!
//! This crate provides:
//! - Normalizer: fold, ISO 3166 country and URL host normalization
//! - UniqueIndex: one key to one record id (names, websites)
//! - ContainerIndex: one key to a sorted set of record ids (countries, categories)
//! - NormalizedUnique / NormalizedContainer: indices with a bound normalizer
//! - SearchStrategy / Searcher: query parsing and exact, prefix and
//!   membership matching
//!
//! Index blobs are gzip-compressed JSON so that `load(dump(x))` reproduces
//! `dump(x)` byte for byte.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod blob;
pub mod container;
pub mod countries;
pub mod normalize;
pub mod search;
pub mod sorted;
pub mod unique;

pub use container::ContainerIndex;
pub use normalize::{normalize, normalize_country, normalize_url, Normalizer};
pub use search::{
    parse_query, IndexView, NormalizedContainer, NormalizedUnique, Query, SearchStrategy,
    Searcher, SEARCH_PREFIX_MIN_LENGTH,
};
pub use sorted::insort;
pub use unique::UniqueIndex;
