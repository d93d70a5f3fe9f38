//! Operations Tests
//!
//! Configuration files, environment lookup and backups.

use std::fs;

use crate::common::*;
use gdsdb::CONFIG_FILE_NAME;

#[test]
fn store_opens_from_config_file() {
    let ts = TestStore::new();
    let path = ts.dir.path().join(CONFIG_FILE_NAME);
    let config = StoreConfig {
        reindex_on_boot: true,
        ..StoreConfig::at(ts.dir.path().join("other"))
    };
    config.write_to_file(&path).unwrap();

    let loaded = StoreConfig::from_file(&path).unwrap();
    assert_eq!(loaded, config);
    let store = Store::open(loaded).unwrap();
    assert!(matches!(store.index_status(), gdsdb::IndexStatus::Rebuilt { .. }));
}

#[test]
fn default_config_file_is_written_once() {
    let ts = TestStore::new();
    let path = ts.dir.path().join(CONFIG_FILE_NAME);
    StoreConfig::write_default_if_missing(&path).unwrap();
    assert_eq!(fs::read_to_string(&path).unwrap(), StoreConfig::default_toml());
    assert_eq!(StoreConfig::from_file(&path).unwrap(), StoreConfig::default());
}

#[test]
fn environment_lookup_builds_versioned_store() {
    let config = StoreConfig::from_lookup(|key| match key {
        "GDS_DATABASE_URL" => Some("memory:///".to_string()),
        "GDS_REPLICA_PID" => Some("42".to_string()),
        "GDS_REPLICA_REGION" => Some("asia-east1".to_string()),
        "GDS_REPLICA_NAME" => Some("tao".to_string()),
        _ => None,
    })
    .unwrap();

    let store = Store::open(config).unwrap();
    let id = store.create_vasp(vasp("alice.example.com", "TW")).unwrap();
    let obj = store.get("vasps", &id, false).unwrap();
    assert_eq!(obj.owner, "42:tao");
    assert_eq!(obj.region, "asia-east1");
}

#[test]
fn unsupported_scheme_is_rejected() {
    let config = StoreConfig {
        url: "leveldb:///db".to_string(),
        ..StoreConfig::default()
    };
    assert!(matches!(Store::open(config), Err(Error::Config(_))));
}

#[test]
fn backup_archive_is_written() {
    let ts = TestStore::new();
    ts.store.create_vasp(vasp("alice.example.com", "US")).unwrap();
    let archive = ts.store.backup(ts.dir.path().join("backups")).unwrap();
    assert!(archive.exists());
    assert!(fs::metadata(&archive).unwrap().len() > 0);
}
