//! Shared test utilities for all integration test suites.
//!
//! Import via `mod common;` from any test's main.rs.

#![allow(dead_code)]
#![allow(unused_imports)]

use std::path::PathBuf;

pub use gdsdb::{
    Error, LegalPerson, ObjectStore, ReplicaConfig, Store, StoreConfig, Vasp, VaspFilter,
    VerificationState,
};
pub use serde_json::json;
use tempfile::TempDir;

/// Create a StoreConfig with always durability mode.
pub fn always_config(path: impl Into<PathBuf>) -> StoreConfig {
    StoreConfig {
        durability: "always".to_string(),
        ..StoreConfig::at(path.into())
    }
}

// ============================================================================
// TestStore - durable store in a temporary directory
// ============================================================================

/// Durable test store that can be closed and reopened in place.
pub struct TestStore {
    pub store: Store,
    pub config: StoreConfig,
    pub dir: TempDir,
}

impl TestStore {
    /// Create a new durable store with standard durability.
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let config = StoreConfig::at(dir.path().join("db"));
        let store = Store::open(config.clone()).expect("Failed to open store");
        TestStore { store, config, dir }
    }

    /// Create a new durable store that fsyncs every write.
    pub fn new_strict() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let config = always_config(dir.path().join("db"));
        let store = Store::open(config.clone()).expect("Failed to open store");
        TestStore { store, config, dir }
    }

    /// Close the store and open it again from disk.
    pub fn reopen(&mut self) {
        self.store.close().expect("Failed to close store");
        self.store = Store::open(self.config.clone()).expect("Failed to reopen store");
    }
}

/// A VASP with every indexed field populated.
pub fn vasp(name: &str, country: &str) -> Vasp {
    Vasp {
        common_name: name.to_string(),
        website: format!("https://{}/", name),
        vasp_categories: vec!["Exchange".to_string()],
        trisa_endpoint: format!("{}:443", name),
        entity: LegalPerson {
            name_identifiers: vec![format!("{} Ltd", name)],
            country_of_registration: country.to_string(),
            ..Default::default()
        },
        ..Default::default()
    }
}

/// Ids of the search results for a JSON query.
pub fn search_ids(store: &Store, query: serde_json::Value) -> Vec<String> {
    let query = query.as_object().cloned().unwrap_or_default();
    store
        .search(&query)
        .expect("search failed")
        .into_iter()
        .map(|v| v.id)
        .collect()
}
