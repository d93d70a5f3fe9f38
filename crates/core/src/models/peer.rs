use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::Record;
use crate::namespace::Namespace;
use crate::object::Object;

/// A replica of the directory network
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Peer {
    /// Process id of the peer; unique in the network and used for versions
    pub id: u64,
    /// Network address including the port
    pub addr: String,
    pub name: String,
    pub region: String,
    pub created: String,
    pub modified: String,
    pub deleted: String,
    /// Process-specific information (cloud metadata and the like)
    pub extra: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Object>,
}

impl Peer {
    /// Record key of the peer
    pub fn key(&self) -> String {
        self.id.to_string()
    }
}

impl Record for Peer {
    const NAMESPACE: Namespace = Namespace::Replicas;
    const TYPE_URL: &'static str = "type.trisa.io/gds.peers.v1.Peer";

    fn record_id(&self) -> String {
        self.key()
    }

    fn metadata(&self) -> Option<&Object> {
        self.metadata.as_ref()
    }

    fn metadata_mut(&mut self) -> &mut Option<Object> {
        &mut self.metadata
    }

    fn is_tombstone(&self) -> bool {
        !self.deleted.is_empty()
    }
}
