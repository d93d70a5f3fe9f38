use serde::{Deserialize, Serialize};

use super::{is_blank, Record};
use crate::namespace::Namespace;
use crate::object::Object;

/// Category of the legal entity operating the VASP
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BusinessCategory {
    /// Unspecified
    #[default]
    UnknownEntity,
    /// Privately held organization
    PrivateOrganization,
    /// Government agency or state entity
    GovernmentEntity,
    /// Registered company
    BusinessEntity,
    /// Foundation, association or other non-profit
    NonCommercialEntity,
}

impl BusinessCategory {
    /// Enum name as written in JSON and in the categories index
    pub fn as_str(&self) -> &'static str {
        match self {
            BusinessCategory::UnknownEntity => "UNKNOWN_ENTITY",
            BusinessCategory::PrivateOrganization => "PRIVATE_ORGANIZATION",
            BusinessCategory::GovernmentEntity => "GOVERNMENT_ENTITY",
            BusinessCategory::BusinessEntity => "BUSINESS_ENTITY",
            BusinessCategory::NonCommercialEntity => "NON_COMMERCIAL_ENTITY",
        }
    }
}

/// Position of a VASP in the registration and verification workflow
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerificationState {
    #[default]
    NoVerification,
    Submitted,
    EmailVerified,
    PendingReview,
    Reviewed,
    IssuingCertificate,
    Verified,
    Rejected,
    Appealed,
    Errored,
}

/// Legal person identifying information used by the indices
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LegalPerson {
    pub name_identifiers: Vec<String>,
    pub local_name_identifiers: Vec<String>,
    pub phonetic_name_identifiers: Vec<String>,
    pub country_of_registration: String,
}

impl LegalPerson {
    /// Every name the entity is known by, in declaration order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.name_identifiers
            .iter()
            .chain(self.local_name_identifiers.iter())
            .chain(self.phonetic_name_identifiers.iter())
            .map(String::as_str)
    }
}

/// Directory-specific data attached to a VASP record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GdsExtraData {
    /// Replication metadata
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Object>,
    /// RFC 3339 deletion timestamp; set only on tombstones
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_on: Option<String>,
}

/// A registered virtual asset service provider
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Vasp {
    pub id: String,
    pub registered_directory: String,
    pub common_name: String,
    pub entity: LegalPerson,
    pub website: String,
    pub business_category: BusinessCategory,
    pub vasp_categories: Vec<String>,
    pub trisa_endpoint: String,
    pub verification_status: VerificationState,
    pub first_listed: String,
    pub last_updated: String,
    pub extra: GdsExtraData,
}

impl Vasp {
    /// Build a tombstone that keeps only identity and replication data
    pub fn tombstone(&self, deleted_on: String) -> Vasp {
        Vasp {
            id: self.id.clone(),
            registered_directory: self.registered_directory.clone(),
            first_listed: self.first_listed.clone(),
            last_updated: deleted_on.clone(),
            extra: GdsExtraData {
                metadata: self.extra.metadata.clone(),
                deleted_on: Some(deleted_on),
            },
            ..Default::default()
        }
    }

    /// True if the record has a usable common name
    pub fn has_common_name(&self) -> bool {
        !is_blank(&self.common_name)
    }
}

impl Record for Vasp {
    const NAMESPACE: Namespace = Namespace::Vasps;
    const TYPE_URL: &'static str = "type.trisa.io/gds.models.v1.VASP";

    fn record_id(&self) -> String {
        self.id.clone()
    }

    fn metadata(&self) -> Option<&Object> {
        self.extra.metadata.as_ref()
    }

    fn metadata_mut(&mut self) -> &mut Option<Object> {
        &mut self.extra.metadata
    }

    fn is_tombstone(&self) -> bool {
        self.extra.deleted_on.is_some()
    }
}
