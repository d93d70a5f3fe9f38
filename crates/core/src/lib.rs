//! Core types for the directory store
//!
//! This crate defines the foundational types shared by every layer:
//! - Error: Error taxonomy and `Result` alias
//! - Namespace: Keyspace partitions of the primary store
//! - Version / Object / Payload: Replication envelope and lamport versions
//! - Models: VASP, certificate request and peer records

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
#[allow(missing_docs)]
pub mod models;
pub mod namespace;
pub mod object;

pub use error::{Error, Result};
pub use models::{
    BusinessCategory, CertificateRequest, CertificateRequestLogEntry, CertificateRequestState,
    GdsExtraData, LegalPerson, Peer, Record, Vasp, VerificationState,
};
pub use namespace::{Namespace, KEY_SEPARATOR};
pub use object::{Object, Payload, Version};
