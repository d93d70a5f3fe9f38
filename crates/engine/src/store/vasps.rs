//! VASP records: CRUD and search

use gds_core::{Error, Record, Result, Vasp, VerificationState};
use gds_search::Query;
use tracing::{debug, warn};
use uuid::Uuid;

use super::{now, Store};
use crate::wire;

/// Filter applied by [`Store::retrieve_all_vasps`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VaspFilter {
    /// Only return VASPs in this verification state
    pub status: Option<VerificationState>,
    /// Only return VASPs with a TRISA endpoint
    pub require_endpoint: bool,
}

impl VaspFilter {
    fn matches(&self, vasp: &Vasp) -> bool {
        if let Some(status) = self.status {
            if vasp.verification_status != status {
                return false;
            }
        }
        !self.require_endpoint || !vasp.trisa_endpoint.is_empty()
    }
}

impl Store {
    /// Register a new VASP and return its id
    ///
    /// The common name must be set and not already registered to another VASP.
    pub fn create_vasp(&self, mut vasp: Vasp) -> Result<String> {
        if !vasp.has_common_name() {
            return Err(Error::IncompleteRecord("common name is required".to_string()));
        }

        let mut inner = self.inner.write();
        if let Some(owner) = inner.indices.name_owner(&vasp.common_name) {
            return Err(Error::DuplicateEntity(format!(
                "common name {:?} is registered to {}",
                vasp.common_name, owner
            )));
        }

        vasp.id = Uuid::new_v4().to_string();
        let ts = now();
        vasp.first_listed = ts.clone();
        vasp.last_updated = ts;
        vasp.extra.deleted_on = None;
        vasp.extra.metadata = None;
        self.advance(&mut vasp)?;

        let data = wire::marshal(&vasp)?;
        inner.commit(|indices, sequence, batch| {
            sequence.next();
            indices.insert(&vasp);
            batch.put(vasp.store_key(), data);
            Ok(())
        })?;

        debug!(target: "gds::store", id = %vasp.id, "vasp created");
        Ok(vasp.id)
    }

    /// Fetch a VASP by id
    pub fn retrieve_vasp(&self, id: &str) -> Result<Vasp> {
        if id.is_empty() {
            return Err(Error::not_found("vasp id is required"));
        }
        match self.inner.read().get_record::<Vasp>(id)? {
            Some(vasp) if !vasp.is_tombstone() => Ok(vasp),
            _ => Err(Error::not_found(format!("vasp {}", id))),
        }
    }

    /// Every live VASP matching the filter, in id order
    pub fn retrieve_all_vasps(&self, filter: &VaspFilter) -> Result<Vec<Vasp>> {
        let vasps = self.inner.read().list_records::<Vasp>()?;
        Ok(vasps.into_iter().filter(|v| filter.matches(v)).collect())
    }

    /// Replace a stored VASP
    ///
    /// The version advances from the stored record's metadata, whatever the
    /// caller supplied.
    pub fn update_vasp(&self, mut vasp: Vasp) -> Result<()> {
        if vasp.id.is_empty() {
            return Err(Error::IncompleteRecord("vasp id is required".to_string()));
        }
        if !vasp.has_common_name() {
            return Err(Error::IncompleteRecord("common name is required".to_string()));
        }

        let mut inner = self.inner.write();
        let old = match inner.get_record::<Vasp>(&vasp.id)? {
            Some(old) if !old.is_tombstone() => old,
            _ => return Err(Error::not_found(format!("vasp {}", vasp.id))),
        };
        if let Some(owner) = inner.indices.name_owner(&vasp.common_name) {
            if owner != vasp.id {
                return Err(Error::DuplicateEntity(format!(
                    "common name {:?} is registered to {}",
                    vasp.common_name, owner
                )));
            }
        }

        if vasp.first_listed.is_empty() {
            vasp.first_listed = old.first_listed.clone();
        }
        vasp.last_updated = now();
        vasp.extra.deleted_on = None;
        vasp.extra.metadata = old.extra.metadata.clone();
        self.advance(&mut vasp)?;

        let data = wire::marshal(&vasp)?;
        inner.commit(|indices, _, batch| {
            indices.remove(&old);
            indices.insert(&vasp);
            batch.put(vasp.store_key(), data);
            Ok(())
        })?;

        debug!(target: "gds::store", id = %vasp.id, "vasp updated");
        Ok(())
    }

    /// Replace a VASP with a versioned tombstone
    ///
    /// Deleting a missing or already deleted VASP does nothing.
    pub fn delete_vasp(&self, id: &str) -> Result<()> {
        let mut inner = self.inner.write();
        let old = match inner.get_record::<Vasp>(id)? {
            Some(old) if !old.is_tombstone() => old,
            _ => return Ok(()),
        };

        let mut tombstone = old.tombstone(now());
        self.advance(&mut tombstone)?;

        let data = wire::marshal(&tombstone)?;
        inner.commit(|indices, _, batch| {
            indices.remove(&old);
            batch.put(tombstone.store_key(), data);
            Ok(())
        })?;

        debug!(target: "gds::store", id, "vasp deleted");
        Ok(())
    }

    /// VASPs matching the query, in id order
    ///
    /// Recognized fields are `name`, `website`, `country` and `category`.
    pub fn search(&self, query: &Query) -> Result<Vec<Vasp>> {
        let inner = self.inner.read();
        let ids = inner.indices.search(query);

        let mut results = Vec::with_capacity(ids.len());
        for id in &ids {
            match inner.get_record::<Vasp>(id) {
                Ok(Some(vasp)) if !vasp.is_tombstone() => results.push(vasp),
                Ok(_) => debug!(target: "gds::store", %id, "search hit has no live record"),
                Err(e @ Error::Corruption(_)) => {
                    warn!(target: "gds::store", %id, error = %e, "skipping undecodable search hit")
                }
                Err(e) => return Err(e),
            }
        }
        debug!(target: "gds::store", matched = results.len(), "search complete");
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::vasp;
    use super::*;
    use crate::config::{ReplicaConfig, StoreConfig};
    use crate::version::VersionManager;
    use gds_core::Namespace;
    use gds_storage::KvBackend;
    use serde_json::json;

    fn store() -> Store {
        Store::open(StoreConfig::memory()).unwrap()
    }

    fn query(value: serde_json::Value) -> Query {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_create_requires_common_name() {
        let store = store();
        let err = store.create_vasp(vasp("  ", "US")).unwrap_err();
        assert!(matches!(err, Error::IncompleteRecord(_)));
        assert_eq!(store.sequence(), 0);
    }

    #[test]
    fn test_create_rejects_duplicate_name() {
        let store = store();
        store.create_vasp(vasp("alice.example.com", "US")).unwrap();
        let err = store.create_vasp(vasp("ALICE.example.com ", "GB")).unwrap_err();
        assert!(matches!(err, Error::DuplicateEntity(_)));
        assert_eq!(store.sequence(), 1);
    }

    #[test]
    fn test_create_stamps_metadata() {
        let store = store();
        let id = store.create_vasp(vasp("alice.example.com", "US")).unwrap();
        let stored = store.retrieve_vasp(&id).unwrap();

        assert_eq!(stored.id, id);
        assert!(!stored.first_listed.is_empty());
        assert_eq!(stored.first_listed, stored.last_updated);
        let meta = stored.metadata().unwrap();
        assert_eq!(meta.key, id);
        assert_eq!(meta.namespace, Namespace::Vasps.as_str());
        assert_eq!(meta.version.as_ref().unwrap().counter, 1);
    }

    #[test]
    fn test_update_advances_from_stored_version() {
        let store = store();
        store.set_version_manager(
            VersionManager::new(&ReplicaConfig {
                pid: 8,
                region: "us-east-1".into(),
                ..ReplicaConfig::default()
            })
            .unwrap(),
        );
        let id = store.create_vasp(vasp("alice.example.com", "US")).unwrap();

        let mut update = store.retrieve_vasp(&id).unwrap();
        update.common_name = "alice.example.org".into();
        update.entity.name_identifiers = vec!["Alice Org".into()];
        update.entity.country_of_registration = "GB".into();
        update.extra.metadata = None;
        store.update_vasp(update).unwrap();

        let stored = store.retrieve_vasp(&id).unwrap();
        let version = stored.metadata().unwrap().version.clone().unwrap();
        assert_eq!(version.counter, 2);
        assert_eq!(version.parent.unwrap().counter, 1);
        assert_eq!(stored.metadata().unwrap().owner, "8:us-east-1");

        assert!(store.search(&query(json!({"country": "US"}))).unwrap().is_empty());
        assert_eq!(store.search(&query(json!({"country": "GB"}))).unwrap().len(), 1);
        assert!(store.search(&query(json!({"name": "alice.example.com"}))).unwrap().is_empty());
        assert_eq!(store.sequence(), 1);
    }

    #[test]
    fn test_update_validation() {
        let store = store();
        let alice = store.create_vasp(vasp("alice.example.com", "US")).unwrap();
        store.create_vasp(vasp("bob.example.com", "US")).unwrap();

        let mut missing_id = vasp("carol.example.com", "US");
        assert!(matches!(
            store.update_vasp(missing_id.clone()),
            Err(Error::IncompleteRecord(_))
        ));

        missing_id.id = "does-not-exist".into();
        assert!(store.update_vasp(missing_id).unwrap_err().is_not_found());

        let mut taken = store.retrieve_vasp(&alice).unwrap();
        taken.common_name = "bob.example.com".into();
        assert!(matches!(
            store.update_vasp(taken),
            Err(Error::DuplicateEntity(_))
        ));
    }

    #[test]
    fn test_delete_writes_tombstone() {
        let store = store();
        let id = store.create_vasp(vasp("alice.example.com", "US")).unwrap();
        store.delete_vasp(&id).unwrap();

        assert!(store.retrieve_vasp(&id).unwrap_err().is_not_found());
        assert!(store.search(&query(json!({"name": "alice"}))).unwrap().is_empty());
        assert!(store.retrieve_all_vasps(&VaspFilter::default()).unwrap().is_empty());

        let inner = store.inner.read();
        let tombstone = inner.get_record::<Vasp>(&id).unwrap().unwrap();
        assert!(tombstone.is_tombstone());
        assert_eq!(tombstone.metadata().unwrap().version.as_ref().unwrap().counter, 2);
        drop(inner);

        // deleting again or deleting a missing id is a no-op
        store.delete_vasp(&id).unwrap();
        store.delete_vasp("missing").unwrap();

        // the name is free again
        store.create_vasp(vasp("alice.example.com", "US")).unwrap();
    }

    #[test]
    fn test_retrieve_all_filters() {
        let store = store();
        let mut verified = vasp("alice.example.com", "US");
        verified.verification_status = VerificationState::Verified;
        verified.trisa_endpoint = "alice.example.com:443".into();
        store.create_vasp(verified).unwrap();

        let mut pending = vasp("bob.example.com", "US");
        pending.verification_status = VerificationState::Verified;
        store.create_vasp(pending).unwrap();
        store.create_vasp(vasp("carol.example.com", "US")).unwrap();

        assert_eq!(store.retrieve_all_vasps(&VaspFilter::default()).unwrap().len(), 3);
        let filter = VaspFilter {
            status: Some(VerificationState::Verified),
            require_endpoint: false,
        };
        assert_eq!(store.retrieve_all_vasps(&filter).unwrap().len(), 2);
        let filter = VaspFilter {
            status: Some(VerificationState::Verified),
            require_endpoint: true,
        };
        let found = store.retrieve_all_vasps(&filter).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].common_name, "alice.example.com");
    }

    #[test]
    fn test_search_returns_id_order() {
        let store = store();
        let mut ids = vec![
            store.create_vasp(vasp("alice.example.com", "US")).unwrap(),
            store.create_vasp(vasp("alicia.example.com", "US")).unwrap(),
            store.create_vasp(vasp("bob.example.com", "GB")).unwrap(),
        ];
        ids.sort();

        let found: Vec<String> = store
            .search(&query(json!({"country": ["US", "GB"]})))
            .unwrap()
            .into_iter()
            .map(|v| v.id)
            .collect();
        assert_eq!(found, ids);

        let found = store.search(&query(json!({"name": "ali", "country": "US"}))).unwrap();
        assert_eq!(found.len(), 2);
        assert!(store.search(&query(json!({}))).unwrap().is_empty());
    }

    #[test]
    fn test_search_skips_undecodable_record() {
        let store = store();
        let healthy = store.create_vasp(vasp("alice.example.com", "US")).unwrap();
        let broken = store.create_vasp(vasp("bob.example.com", "US")).unwrap();
        store
            .inner
            .write()
            .db_mut()
            .unwrap()
            .put(&Namespace::Vasps.key(&broken), b"\xc1\xc1")
            .unwrap();

        let found = store.search(&query(json!({"country": "US"}))).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, healthy);
        assert!(matches!(
            store.retrieve_vasp(&broken),
            Err(Error::Corruption(_))
        ));
    }
}
