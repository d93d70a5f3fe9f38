//! Error types for the directory store
//!
//! This module defines the error taxonomy shared by every crate in the
//! workspace. We use `thiserror` for automatic `Display` and `Error` trait
//! implementations.
//!
//! Callers are expected to match on variants rather than on messages: a
//! missing record is always [`Error::NotFound`], an object that must not leave
//! the replica is always [`Error::CannotReplicate`].

use std::io;
use thiserror::Error;

/// Result type alias for directory store operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the directory store
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error (file operations, locking, archive creation)
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Requested record, key or index entry does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Required configuration is missing or invalid
    #[error("Configuration error: {0}")]
    Config(String),

    /// Stored bytes could not be decoded
    #[error("Data corruption: {0}")]
    Corruption(String),

    /// The namespace holds local-only data that is never replicated
    #[error("Object in namespace {0:?} cannot be replicated")]
    CannotReplicate(String),

    /// The namespace is not one of the known keyspace partitions
    #[error("Unknown namespace {0:?}")]
    UnknownNamespace(String),

    /// Caller input rejected before any mutation was applied
    #[error("Validation error: {0}")]
    Validation(String),

    /// Record is missing fields required by the store
    #[error("Record is missing required fields: {0}")]
    IncompleteRecord(String),

    /// A unique constraint would be violated
    #[error("Entity unique constraints violated: {0}")]
    DuplicateEntity(String),

    /// Storage layer error
    #[error("Storage error: {0}")]
    StorageError(String),
}

impl Error {
    /// Construct a not-found error for a key
    pub fn not_found(key: impl Into<String>) -> Self {
        Error::NotFound(key.into())
    }

    /// Construct a corruption error
    pub fn corruption(msg: impl Into<String>) -> Self {
        Error::Corruption(msg.into())
    }

    /// Construct a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }

    /// True if this error represents an absent record
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }

    /// True if this error represents a non-replicable namespace
    pub fn is_cannot_replicate(&self) -> bool {
        matches!(self, Error::CannotReplicate(_))
    }
}

impl From<bincode::Error> for Error {
    fn from(e: bincode::Error) -> Self {
        Error::SerializationError(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::SerializationError(e.to_string())
    }
}

impl From<rmp_serde::encode::Error> for Error {
    fn from(e: rmp_serde::encode::Error) -> Self {
        Error::SerializationError(e.to_string())
    }
}

impl From<rmp_serde::decode::Error> for Error {
    fn from(e: rmp_serde::decode::Error) -> Self {
        Error::SerializationError(e.to_string())
    }
}
