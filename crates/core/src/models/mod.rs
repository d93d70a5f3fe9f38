//! Record types stored in the replicated namespaces
//!
//! Every record carries its replication [`Object`] metadata so that the wire
//! codec can project it into an envelope without consulting any other key.

mod certreq;
mod peer;
mod vasp;

pub use certreq::{CertificateRequest, CertificateRequestLogEntry, CertificateRequestState};
pub use peer::Peer;
pub use vasp::{BusinessCategory, GdsExtraData, LegalPerson, Vasp, VerificationState};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::namespace::Namespace;
use crate::object::Object;

/// A record that lives in one of the replicated namespaces
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Namespace the record is stored under
    const NAMESPACE: Namespace;

    /// Type tag used for replication payloads
    const TYPE_URL: &'static str;

    /// Record id, the key suffix within the namespace
    fn record_id(&self) -> String;

    /// Replication metadata, if the record has been versioned
    fn metadata(&self) -> Option<&Object>;

    /// Mutable access to the replication metadata slot
    fn metadata_mut(&mut self) -> &mut Option<Object>;

    /// True if the record is a deletion marker
    fn is_tombstone(&self) -> bool;

    /// Full primary store key
    fn store_key(&self) -> Vec<u8> {
        Self::NAMESPACE.key(&self.record_id())
    }
}

pub(crate) fn is_blank(s: &str) -> bool {
    s.trim().is_empty()
}
