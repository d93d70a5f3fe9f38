//! Replication Tests
//!
//! Object exchange between independently opened stores.

use crate::common::*;
use gdsdb::{wire, MergeOutcome, Namespace};

fn replica(pid: u64, region: &str) -> Store {
    Store::open(StoreConfig::memory().with_replica(ReplicaConfig {
        pid,
        region: region.to_string(),
        ..ReplicaConfig::default()
    }))
    .unwrap()
}

#[test]
fn deletes_replicate_as_tombstones() {
    let a = replica(1, "us-east-1");
    let b = replica(2, "europe-west1");

    let id = a.create_vasp(vasp("alice.example.com", "US")).unwrap();
    assert_eq!(b.merge(a.get("vasps", &id, true).unwrap()).unwrap(), MergeOutcome::Inserted);
    assert_eq!(search_ids(&b, json!({"name": "alice"})), vec![id.clone()]);

    a.delete_vasp(&id).unwrap();
    assert_eq!(b.merge(a.get("vasps", &id, true).unwrap()).unwrap(), MergeOutcome::Replaced);
    assert!(b.retrieve_vasp(&id).unwrap_err().is_not_found());
    assert!(search_ids(&b, json!({"name": "alice"})).is_empty());

    // the name can be registered again on either side
    b.create_vasp(vasp("alice.example.com", "US")).unwrap();
}

#[test]
fn local_namespaces_never_leave_the_replica() {
    let a = replica(1, "us-east-1");
    a.create_vasp(vasp("alice.example.com", "US")).unwrap();

    let mut local = 0;
    for entry in a.iter("").unwrap() {
        match entry.namespace().unwrap() {
            Namespace::Indices | Namespace::Sequence => {
                assert!(entry.object(true).unwrap_err().is_cannot_replicate());
                local += 1;
            }
            _ => {
                let obj = entry.object(true).unwrap();
                assert_eq!(wire::decode_key(&wire::encode_key(entry.key())).unwrap(), entry.key());
                assert_eq!(obj.data.unwrap().value, entry.value());
            }
        }
    }
    assert_eq!(local, 5);
}

#[test]
fn remarshal_json_round_trips_through_store() {
    let a = replica(1, "us-east-1");
    let id = a.create_vasp(vasp("alice.example.com", "US")).unwrap();
    let stored = a.get("vasps", &id, true).unwrap().data.unwrap().value;

    let message = wire::unmarshal_proto("vasps", &stored).unwrap();
    let json = serde_json::to_vec(&message.to_json().unwrap()).unwrap();
    assert_eq!(wire::remarshal_json("vasps", &json).unwrap(), stored);
}
