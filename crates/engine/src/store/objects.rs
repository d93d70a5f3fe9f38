//! Replication surface over the primary store
//!
//! Replicas exchange [`Object`] envelopes. Reads project stored records into
//! envelopes; writes take an envelope's payload and store it verbatim, keeping
//! the VASP indices consistent.

use gds_core::{Error, Namespace, Object, Payload, Record, Result, Vasp, Version};
use tracing::{debug, trace, warn};

use super::{Inner, Store};
use crate::wire::{self, Message};

/// Object-level access used by anti-entropy replication
pub trait ObjectStore {
    /// Iterate every stored pair in a namespace; `""` scans all namespaces
    fn iter(&self, namespace: &str) -> Result<ObjectIter>;

    /// Fetch the envelope for a key, with or without its payload
    fn get(&self, namespace: &str, key: &str, with_data: bool) -> Result<Object>;

    /// Store the envelope's payload unconditionally
    fn put(&self, object: Object) -> Result<()>;

    /// Store the envelope's payload only if it is newer than the local copy
    fn merge(&self, object: Object) -> Result<MergeOutcome>;
}

/// Result of [`ObjectStore::merge`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// No local copy existed
    Inserted,
    /// The incoming version superseded the local copy
    Replaced,
    /// The local copy is as new or newer; nothing was written
    Stale,
}

/// A raw stored pair yielded by [`ObjectIter`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectEntry {
    key: Vec<u8>,
    value: Vec<u8>,
}

impl ObjectEntry {
    /// Full primary store key
    pub fn key(&self) -> &[u8] {
        &self.key
    }

    /// Stored bytes
    pub fn value(&self) -> &[u8] {
        &self.value
    }

    /// Namespace parsed from the key prefix
    pub fn namespace(&self) -> Result<Namespace> {
        Namespace::split_key(&self.key).map(|(ns, _)| ns)
    }

    /// Project the pair into a replication envelope
    ///
    /// Fails with `CannotReplicate` for index and sequence entries.
    pub fn object(&self, with_data: bool) -> Result<Object> {
        let ns = self.namespace()?;
        wire::unmarshal_object(ns.as_str(), &self.value, with_data)
    }
}

/// Snapshot iterator over a key range
///
/// The range is copied when the iterator is created, so it holds no lock.
#[derive(Debug)]
pub struct ObjectIter {
    entries: std::vec::IntoIter<(Vec<u8>, Vec<u8>)>,
}

impl Iterator for ObjectIter {
    type Item = ObjectEntry;

    fn next(&mut self) -> Option<Self::Item> {
        self.entries
            .next()
            .map(|(key, value)| ObjectEntry { key, value })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.entries.size_hint()
    }
}

impl ExactSizeIterator for ObjectIter {}

/// Decoded incoming envelope, validated against its key
struct Incoming {
    namespace: Namespace,
    key: String,
    message: Message,
    value: Vec<u8>,
}

impl Incoming {
    fn decode(object: Object) -> Result<Incoming> {
        let Payload { type_url, value } = object
            .data
            .ok_or_else(|| Error::validation("object has no data"))?;
        let namespace = wire::replicated_namespace(&object.namespace)?;
        let message = wire::unmarshal_proto(namespace.as_str(), &value)?;

        if message.type_url() != type_url {
            return Err(Error::validation(format!(
                "payload type {:?} does not match namespace {}",
                type_url, namespace
            )));
        }
        if message.record_id() != object.key {
            return Err(Error::validation(format!(
                "payload id {:?} does not match object key {:?}",
                message.record_id(),
                object.key
            )));
        }
        Ok(Incoming {
            namespace,
            key: object.key,
            message,
            value,
        })
    }

    fn version(&self) -> Version {
        self.message
            .metadata()
            .and_then(|m| m.version.clone())
            .unwrap_or_default()
    }
}

impl Store {
    fn store_incoming(inner: &mut Inner, incoming: Incoming) -> Result<()> {
        let old = match incoming.namespace {
            Namespace::Vasps => match inner.get_record::<Vasp>(&incoming.key) {
                Ok(old) => old.filter(|v| !v.is_tombstone()),
                Err(e @ Error::Corruption(_)) => {
                    warn!(
                        target: "gds::store",
                        key = %incoming.key,
                        error = %e,
                        "local copy is undecodable, replacing it without index cleanup"
                    );
                    None
                }
                Err(e) => return Err(e),
            },
            _ => None,
        };

        let Incoming {
            namespace,
            key,
            message,
            value,
        } = incoming;
        inner.commit(|indices, _, batch| {
            if let Some(old) = &old {
                indices.remove(old);
            }
            if let Message::Vasp(vasp) = &message {
                if !vasp.is_tombstone() {
                    indices.insert(vasp);
                }
            }
            batch.put(namespace.key(&key), value);
            Ok(())
        })?;
        trace!(target: "gds::store", namespace = %namespace, %key, "object stored");
        Ok(())
    }
}

impl ObjectStore for Store {
    fn iter(&self, namespace: &str) -> Result<ObjectIter> {
        let prefix = if namespace.is_empty() {
            Vec::new()
        } else {
            namespace.parse::<Namespace>()?.prefix()
        };
        let entries = self.inner.read().db()?.scan_prefix(&prefix)?;
        Ok(ObjectIter {
            entries: entries.into_iter(),
        })
    }

    fn get(&self, namespace: &str, key: &str, with_data: bool) -> Result<Object> {
        let ns: Namespace = namespace.parse()?;
        let data = self
            .inner
            .read()
            .get(&ns.key(key))?
            .ok_or_else(|| Error::not_found(format!("{}::{}", namespace, key)))?;
        wire::unmarshal_object(namespace, &data, with_data)
    }

    fn put(&self, object: Object) -> Result<()> {
        let incoming = Incoming::decode(object)?;
        let mut inner = self.inner.write();
        Self::store_incoming(&mut inner, incoming)
    }

    fn merge(&self, object: Object) -> Result<MergeOutcome> {
        let incoming = Incoming::decode(object)?;
        let mut inner = self.inner.write();

        let local = match inner.get(&incoming.namespace.key(&incoming.key))? {
            Some(data) => {
                match wire::unmarshal_object(incoming.namespace.as_str(), &data, false) {
                    Ok(obj) => Some(obj.version.unwrap_or_default()),
                    // stored before replication metadata existed
                    Err(e) if e.is_cannot_replicate() => Some(Version::default()),
                    Err(e @ Error::Corruption(_)) => {
                        warn!(
                            target: "gds::store",
                            key = %incoming.key,
                            error = %e,
                            "local copy is undecodable, treating it as version zero"
                        );
                        Some(Version::default())
                    }
                    Err(e) => return Err(e),
                }
            }
            None => None,
        };

        let outcome = match local {
            None => MergeOutcome::Inserted,
            Some(local) if incoming.version().is_later(&local) => MergeOutcome::Replaced,
            Some(_) => MergeOutcome::Stale,
        };
        debug!(
            target: "gds::store",
            namespace = %incoming.namespace,
            key = %incoming.key,
            outcome = ?outcome,
            "merge"
        );
        if outcome != MergeOutcome::Stale {
            Self::store_incoming(&mut inner, incoming)?;
        }
        Ok(outcome)
    }
}
