//! Keyspace partitions
//!
//! Every key in the primary store begins with a namespace prefix followed by
//! the `::` separator. Each namespace owns a disjoint key range and a fixed
//! value encoding.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Separator between the namespace prefix and the record key
pub const KEY_SEPARATOR: &str = "::";

/// Logical partition of the key-value keyspace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Namespace {
    /// VASP identity records
    Vasps,
    /// Certificate issuance requests
    CertReqs,
    /// Replica peers of the directory network
    Replicas,
    /// Serialized secondary indices (local only)
    Indices,
    /// Primary key sequence (local only)
    Sequence,
}

impl Namespace {
    /// Namespaces whose records are exchanged between replicas
    pub const REPLICATED: [Namespace; 3] =
        [Namespace::Vasps, Namespace::CertReqs, Namespace::Replicas];

    /// All known namespaces
    pub const ALL: [Namespace; 5] = [
        Namespace::Vasps,
        Namespace::CertReqs,
        Namespace::Replicas,
        Namespace::Indices,
        Namespace::Sequence,
    ];

    /// The key prefix used in the primary store
    pub fn as_str(&self) -> &'static str {
        match self {
            Namespace::Vasps => "vasps",
            Namespace::CertReqs => "certreqs",
            Namespace::Replicas => "peers",
            Namespace::Indices => "index",
            Namespace::Sequence => "sequence",
        }
    }

    /// Whether records in this namespace may leave the local replica
    pub fn is_replicated(&self) -> bool {
        matches!(
            self,
            Namespace::Vasps | Namespace::CertReqs | Namespace::Replicas
        )
    }

    /// Byte prefix covering every key in the namespace, separator included
    pub fn prefix(&self) -> Vec<u8> {
        format!("{}{}", self.as_str(), KEY_SEPARATOR).into_bytes()
    }

    /// Full primary store key for a record id
    pub fn key(&self, id: &str) -> Vec<u8> {
        let mut key = self.prefix();
        key.extend_from_slice(id.as_bytes());
        key
    }

    /// Split a primary store key into its namespace and record id
    pub fn split_key(key: &[u8]) -> Result<(Namespace, String), Error> {
        let key = std::str::from_utf8(key)
            .map_err(|e| Error::corruption(format!("non utf-8 key: {}", e)))?;
        let (prefix, id) = key
            .split_once(KEY_SEPARATOR)
            .ok_or_else(|| Error::UnknownNamespace(key.to_string()))?;
        Ok((prefix.parse()?, id.to_string()))
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Namespace {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "vasps" => Ok(Namespace::Vasps),
            "certreqs" => Ok(Namespace::CertReqs),
            "peers" => Ok(Namespace::Replicas),
            "index" => Ok(Namespace::Indices),
            "sequence" => Ok(Namespace::Sequence),
            other => Err(Error::UnknownNamespace(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_roundtrip() {
        for ns in Namespace::ALL {
            assert_eq!(ns.as_str().parse::<Namespace>().unwrap(), ns);
        }
    }

    #[test]
    fn test_unknown_namespace() {
        let err = "widgets".parse::<Namespace>().unwrap_err();
        assert!(matches!(err, Error::UnknownNamespace(ns) if ns == "widgets"));
    }

    #[test]
    fn test_keys() {
        assert_eq!(Namespace::Vasps.key("abc"), b"vasps::abc".to_vec());
        assert_eq!(Namespace::Indices.key("names"), b"index::names".to_vec());
        assert_eq!(Namespace::Sequence.key("pks"), b"sequence::pks".to_vec());

        let (ns, id) = Namespace::split_key(b"certreqs::1234").unwrap();
        assert_eq!(ns, Namespace::CertReqs);
        assert_eq!(id, "1234");
    }

    #[test]
    fn test_split_key_without_separator() {
        assert!(Namespace::split_key(b"vasps").is_err());
    }

    #[test]
    fn test_replicated() {
        assert!(Namespace::Vasps.is_replicated());
        assert!(Namespace::Replicas.is_replicated());
        assert!(!Namespace::Indices.is_replicated());
        assert!(!Namespace::Sequence.is_replicated());
    }
}
