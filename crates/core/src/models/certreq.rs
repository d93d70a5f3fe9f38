use serde::{Deserialize, Serialize};

use super::Record;
use crate::namespace::Namespace;
use crate::object::Object;

/// Pipeline state of a certificate request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CertificateRequestState {
    #[default]
    Initialized,
    ReadyToSubmit,
    Processing,
    Downloading,
    Downloaded,
    Completed,
    CrRejected,
    CrErrored,
}

/// One transition in the request audit log
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CertificateRequestLogEntry {
    pub timestamp: String,
    pub previous_state: CertificateRequestState,
    pub current_state: CertificateRequestState,
    pub description: String,
    pub source: String,
}

/// A request to the certificate authority on behalf of a VASP
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CertificateRequest {
    pub id: String,
    pub vasp: String,
    pub common_name: String,
    pub status: CertificateRequestState,
    pub authority_id: i64,
    pub batch_id: i64,
    pub batch_name: String,
    pub batch_status: String,
    pub order_number: i64,
    pub creation_date: String,
    pub profile: String,
    pub reject_reason: String,
    pub created: String,
    pub modified: String,
    pub deleted: String,
    pub audit_log: Vec<CertificateRequestLogEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Object>,
}

impl CertificateRequest {
    /// Build a tombstone that keeps timestamps and replication data
    pub fn tombstone(&self, deleted: String) -> CertificateRequest {
        CertificateRequest {
            id: self.id.clone(),
            created: self.created.clone(),
            modified: self.modified.clone(),
            deleted,
            metadata: self.metadata.clone(),
            ..Default::default()
        }
    }
}

impl Record for CertificateRequest {
    const NAMESPACE: Namespace = Namespace::CertReqs;
    const TYPE_URL: &'static str = "type.trisa.io/gds.models.v1.CertificateRequest";

    fn record_id(&self) -> String {
        self.id.clone()
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
