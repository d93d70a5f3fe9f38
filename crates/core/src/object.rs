//! Replication envelope types
//!
//! An [`Object`] is the replication-facing projection of a stored record: it
//! carries the key, namespace, provenance and [`Version`] of the record, and
//! optionally the encoded record itself as a [`Payload`]. Replicas exchange
//! metadata-only objects to compare versions before paying for full payloads.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

/// Lamport-style version of a single object
///
/// The counter is per object, not global. `pid` and `region` identify the
/// replica that produced this version. `parent` is a one-hop snapshot of the
/// previous version: only the last writer's identity is retained, never the
/// full chain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    /// Process id of the replica that wrote this version
    #[serde(default)]
    pub pid: u64,
    /// Monotonic per-object counter
    #[serde(default)]
    pub counter: u64,
    /// Region of the replica that wrote this version
    #[serde(default)]
    pub region: String,
    /// Snapshot of the immediately preceding version, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<Box<Version>>,
}

impl Version {
    /// A version is zero if no replica has ever stamped it
    pub fn is_zero(&self) -> bool {
        self.pid == 0 && self.counter == 0
    }

    /// Copy of this version without ancestry, used as the next parent
    pub fn snapshot(&self) -> Version {
        Version {
            pid: self.pid,
            counter: self.counter,
            region: self.region.clone(),
            parent: None,
        }
    }

    /// Total precedence order used for conflict detection
    ///
    /// Versions compare lexicographically on `(counter, pid, region)`: the
    /// higher counter wins; when two replicas stamped the same counter the
    /// higher pid wins, then the greater region. Parents are ignored.
    pub fn precedence(&self, other: &Version) -> Ordering {
        self.counter
            .cmp(&other.counter)
            .then_with(|| self.pid.cmp(&other.pid))
            .then_with(|| self.region.cmp(&other.region))
    }

    /// True if this version strictly supersedes `other`
    pub fn is_later(&self, other: &Version) -> bool {
        self.precedence(other) == Ordering::Greater
    }

    /// True if both versions occupy the same position in the precedence order
    pub fn is_concurrent_with(&self, other: &Version) -> bool {
        self.precedence(other) == Ordering::Equal
    }
}

/// Opaque encoded record tagged with its type, equivalent to a protobuf `Any`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payload {
    /// Identifies the record type encoded in `value`
    pub type_url: String,
    /// Exact storage bytes of the record
    // written as msgpack `bin` rather than an array of integers
    #[serde(with = "serde_bytes")]
    pub value: Vec<u8>,
}

/// Replication envelope for a stored record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Object {
    /// Record id within the namespace
    #[serde(default)]
    pub key: String,
    /// Namespace prefix of the record
    #[serde(default)]
    pub namespace: String,
    /// Region of the replica that first wrote the object
    #[serde(default)]
    pub region: String,
    /// Owner (`"{pid}:{name}"`) of the replica that first wrote the object
    #[serde(default)]
    pub owner: String,
    /// Current version of the object
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<Version>,
    /// Full record payload, only present when explicitly requested
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Payload>,
}

impl Object {
    /// Create an empty object for a record key in a namespace
    pub fn new(namespace: impl Into<String>, key: impl Into<String>) -> Self {
        Object {
            key: key.into(),
            namespace: namespace.into(),
            ..Default::default()
        }
    }

    /// True if the object has never been versioned
    pub fn has_zero_version(&self) -> bool {
        self.version.as_ref().map_or(true, Version::is_zero)
    }

    /// Copy of the object without its payload
    pub fn metadata_only(&self) -> Object {
        Object {
            data: None,
            ..self.clone()
        }
    }
}
