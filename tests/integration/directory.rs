//! Directory lifecycle tests
//!
//! Registration, update, deletion and search across reopen cycles.

use crate::common::*;

// ============================================================================
// Lifecycle
// ============================================================================

#[test]
fn register_update_delete_survives_reopen() {
    let mut ts = TestStore::new();
    let alice = ts.store.create_vasp(vasp("alice.example.com", "US")).unwrap();
    let bob = ts.store.create_vasp(vasp("bob.example.com", "DE")).unwrap();

    let mut record = ts.store.retrieve_vasp(&alice).unwrap();
    record.verification_status = VerificationState::Verified;
    ts.store.update_vasp(record).unwrap();
    ts.store.delete_vasp(&bob).unwrap();

    ts.reopen();

    let record = ts.store.retrieve_vasp(&alice).unwrap();
    assert_eq!(record.verification_status, VerificationState::Verified);
    assert_eq!(record.metadata_version(), 2);
    assert!(ts.store.retrieve_vasp(&bob).unwrap_err().is_not_found());
    assert_eq!(search_ids(&ts.store, json!({"country": "germany"})), Vec::<String>::new());
    assert_eq!(search_ids(&ts.store, json!({"country": "US"})), vec![alice]);
}

#[test]
fn strict_durability_store_reopens() {
    let mut ts = TestStore::new_strict();
    for i in 0..10 {
        ts.store
            .create_vasp(vasp(&format!("vasp{}.example.com", i), "SG"))
            .unwrap();
    }
    ts.reopen();
    assert_eq!(ts.store.sequence(), 10);
    assert_eq!(search_ids(&ts.store, json!({"country": "singapore"})).len(), 10);
}

// ============================================================================
// Search
// ============================================================================

#[test]
fn search_fields_intersect() {
    let ts = TestStore::new();
    let a = ts.store.create_vasp(vasp("alpha.example.com", "US")).unwrap();
    let b = ts.store.create_vasp(vasp("alphabet.example.com", "GB")).unwrap();
    let c = ts.store.create_vasp(vasp("beta.example.com", "US")).unwrap();

    let mut alphas = vec![a.clone(), b.clone()];
    alphas.sort();
    assert_eq!(search_ids(&ts.store, json!({"name": "alp"})), alphas);
    assert_eq!(search_ids(&ts.store, json!({"name": "alp", "country": "US"})), vec![a.clone()]);

    let mut us = vec![a, c.clone()];
    us.sort();
    assert_eq!(search_ids(&ts.store, json!({"country": "united states", "category": "exchange"})), us);
    assert_eq!(search_ids(&ts.store, json!({"website": "beta.example.com"})), vec![c]);
    assert!(search_ids(&ts.store, json!({"name": "gamma"})).is_empty());
}

#[test]
fn retrieve_all_with_filter() {
    let ts = TestStore::new();
    let id = ts.store.create_vasp(vasp("alice.example.com", "US")).unwrap();
    let mut no_endpoint = vasp("bob.example.com", "US");
    no_endpoint.trisa_endpoint.clear();
    ts.store.create_vasp(no_endpoint).unwrap();

    let filter = VaspFilter {
        require_endpoint: true,
        ..VaspFilter::default()
    };
    let found = ts.store.retrieve_all_vasps(&filter).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, id);
}

trait MetadataVersion {
    fn metadata_version(&self) -> u64;
}

impl MetadataVersion for Vasp {
    fn metadata_version(&self) -> u64 {
        self.extra
            .metadata
            .as_ref()
            .and_then(|m| m.version.as_ref())
            .map_or(0, |v| v.counter)
    }
}
