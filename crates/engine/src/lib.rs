//! Directory store engine
//!
//! This crate ties the lower layers together:
//! - Store: VASP, certificate request and peer records over a key-value backend
//! - Indices: names, websites, countries and categories, checkpointed with
//!   every write and rebuilt when missing or corrupt
//! - VersionManager: lamport versions for anti-entropy replication
//! - Wire codec: stored bytes to replication objects and back
//! - ObjectStore: iterate, get, put and merge replication objects
//!
//! The engine is the only component that knows about:
//! - Which namespaces replicate
//! - How index blobs, the sequence and records are written together
//! - Backups

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod store;
pub mod version;
pub mod wire;

pub use config::{Dsn, ReplicaConfig, StoreConfig, CONFIG_FILE_NAME};
pub use store::{
    IndexName, IndexStatus, MergeOutcome, ObjectEntry, ObjectIter, ObjectStore, Store, VaspFilter,
};
pub use version::VersionManager;
pub use wire::Message;
