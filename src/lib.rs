//! gdsdb - Storage, indexing and versioning for the VASP global directory service
//!
//! gdsdb stores VASP registrations, certificate requests and replica peers in
//! an ordered key-value backend, keeps secondary indices over the VASPs for
//! search, and versions every record for anti-entropy replication.
//!
//! # Quick Start
//!
//! ```ignore
//! use gdsdb::{Store, StoreConfig, Vasp};
//!
//! // Open an in-memory store
//! let store = Store::open(StoreConfig::memory())?;
//!
//! // Register a VASP
//! let id = store.create_vasp(Vasp {
//!     common_name: "alice.example.com".into(),
//!     ..Default::default()
//! })?;
//!
//! // Search by name prefix
//! let query = serde_json::json!({"name": "alice"});
//! let found = store.search(query.as_object().unwrap())?;
//! ```
//!
//! # Architecture
//!
//! The [`Store`] is the entry point. Lower layers are re-exported for tooling
//! that needs them: `storage` for the raw backends, `search` for the indices
//! and normalizers, and `wire` for the record codec.

pub use gds_core::{
    BusinessCategory, CertificateRequest, CertificateRequestLogEntry, CertificateRequestState,
    Error, GdsExtraData, LegalPerson, Namespace, Object, Payload, Peer, Record, Result, Vasp,
    Version, VerificationState,
};
pub use gds_engine::{
    wire, Dsn, IndexName, IndexStatus, Message, MergeOutcome, ObjectEntry, ObjectIter,
    ObjectStore, ReplicaConfig, Store, StoreConfig, VaspFilter, VersionManager, CONFIG_FILE_NAME,
};
pub use gds_search as search;
pub use gds_storage as storage;
