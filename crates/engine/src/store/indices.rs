//! The four VASP secondary indices and their checkpoint keys

use gds_core::{Namespace, Result, Vasp};
use gds_search::{NormalizedContainer, NormalizedUnique, Normalizer, Query, SEARCH_PREFIX_MIN_LENGTH};
use gds_storage::WriteBatch;
use tracing::{debug, warn};

/// Identifies one of the persisted index blobs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexName {
    /// Common and legal names to VASP id
    Names,
    /// Website host to VASP id
    Websites,
    /// ISO country code to VASP ids
    Countries,
    /// Business and VASP categories to VASP ids
    Categories,
}

impl IndexName {
    /// Every index, in checkpoint order
    pub const ALL: [IndexName; 4] = [
        IndexName::Names,
        IndexName::Websites,
        IndexName::Countries,
        IndexName::Categories,
    ];

    /// Record key within the index namespace
    pub fn as_str(&self) -> &'static str {
        match self {
            IndexName::Names => "names",
            IndexName::Websites => "websites",
            IndexName::Countries => "countries",
            IndexName::Categories => "categories",
        }
    }

    /// Full primary store key of the blob
    pub fn key(&self) -> Vec<u8> {
        Namespace::Indices.key(self.as_str())
    }
}

/// In-memory secondary indices over the VASP records
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Indices {
    pub names: NormalizedUnique,
    pub websites: NormalizedUnique,
    pub countries: NormalizedContainer,
    pub categories: NormalizedContainer,
}

impl Default for Indices {
    fn default() -> Self {
        Indices {
            names: NormalizedUnique::new(Normalizer::Fold),
            websites: NormalizedUnique::new(Normalizer::Url),
            countries: NormalizedContainer::new(Normalizer::Country),
            categories: NormalizedContainer::new(Normalizer::Fold),
        }
    }
}

impl Indices {
    /// Index every searchable field of the record
    pub fn insert(&mut self, vasp: &Vasp) {
        let id = vasp.id.as_str();
        self.names.add(&vasp.common_name, id);
        for name in vasp.entity.names() {
            self.names.add(name, id);
        }

        self.websites.add(&vasp.website, id);
        self.countries.add(&vasp.entity.country_of_registration, id);

        self.categories.add(vasp.business_category.as_str(), id);
        for category in &vasp.vasp_categories {
            self.categories.add(category, id);
        }
    }

    /// Drop every index entry contributed by the record
    ///
    /// Unique keys are only removed while they still point at this record.
    pub fn remove(&mut self, vasp: &Vasp) {
        let id = vasp.id.as_str();
        for name in std::iter::once(vasp.common_name.as_str()).chain(vasp.entity.names()) {
            if self.names.contains(name, id) {
                self.names.remove(name, id);
            }
        }
        if self.websites.contains(&vasp.website, id) {
            self.websites.remove(&vasp.website, id);
        }

        self.countries.remove(&vasp.entity.country_of_registration, id);

        self.categories.remove(vasp.business_category.as_str(), id);
        for category in &vasp.vasp_categories {
            self.categories.remove(category, id);
        }
    }

    /// Id of the record that owns `name`, if any
    pub fn name_owner(&self, name: &str) -> Option<&str> {
        self.names.find(name)
    }

    /// True if any index holds no keys
    pub fn is_any_empty(&self) -> bool {
        self.names.is_empty()
            || self.websites.is_empty()
            || self.countries.is_empty()
            || self.categories.is_empty()
    }

    /// Replace one index with a decoded blob
    pub fn load(&mut self, name: IndexName, data: &[u8]) -> Result<()> {
        match name {
            IndexName::Names => self.names.load(data),
            IndexName::Websites => self.websites.load(data),
            IndexName::Countries => self.countries.load(data),
            IndexName::Categories => self.categories.load(data),
        }
    }

    /// Serialize one index
    pub fn dump(&self, name: IndexName) -> Result<Vec<u8>> {
        match name {
            IndexName::Names => self.names.dump(),
            IndexName::Websites => self.websites.dump(),
            IndexName::Countries => self.countries.dump(),
            IndexName::Categories => self.categories.dump(),
        }
    }

    /// Add every index blob to the batch
    pub fn checkpoint(&self, batch: &mut WriteBatch) -> Result<()> {
        for name in IndexName::ALL {
            batch.put(name.key(), self.dump(name)?);
        }
        debug!(
            target: "gds::index",
            names = self.names.len(),
            websites = self.websites.len(),
            countries = self.countries.len(),
            categories = self.categories.len(),
            "indices checkpointed"
        );
        Ok(())
    }

    /// Ids matching every field present in the query
    ///
    /// Fields are intersected; terms within a field are OR'd. A query that
    /// constrains no indexed field matches nothing.
    pub fn search(&self, query: &Query) -> Vec<String> {
        let results = [
            self.names
                .prefix_match("name", SEARCH_PREFIX_MIN_LENGTH)
                .search(&self.names, query),
            self.websites.exact_match("website").search(&self.websites, query),
            self.countries
                .contains_record("country")
                .search(&self.countries, query),
            self.categories
                .contains_record("category")
                .search(&self.categories, query),
        ];

        let mut matched: Option<Vec<String>> = None;
        for ids in results.into_iter().flatten() {
            matched = Some(match matched {
                None => ids,
                Some(acc) => gds_search::sorted::intersect(&acc, &ids),
            });
        }
        matched.unwrap_or_default()
    }
}

/// Load an index blob, treating undecodable data as empty
pub(crate) fn load_or_empty(indices: &mut Indices, name: IndexName, data: Option<&[u8]>) -> bool {
    let Some(data) = data else {
        return false;
    };
    match indices.load(name, data) {
        Ok(()) => true,
        Err(e) => {
            warn!(target: "gds::index", index = name.as_str(), error = %e, "could not load index, starting empty");
            false
        }
    }
}
