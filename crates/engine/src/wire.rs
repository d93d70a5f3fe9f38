//! Wire codec between stored bytes and replication objects
//!
//! Records are stored as MessagePack with named fields. The replicated
//! namespaces decode to a typed [`Message`]; the local-only namespaces
//! (indices and the sequence) can be inspected but never leave the replica.

use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine as _;
use gds_core::{
    CertificateRequest, Error, Namespace, Object, Payload, Peer, Record, Result, Vasp,
};
use gds_search::blob;
use gds_storage::varint::{decode_varint, encode_varint};
use serde::de::DeserializeOwned;
use tracing::trace;

/// A decoded record from one of the replicated namespaces
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// VASP record
    Vasp(Box<Vasp>),
    /// Certificate request record
    CertReq(Box<CertificateRequest>),
    /// Replica peer record
    Peer(Box<Peer>),
}

impl Message {
    /// Namespace the record belongs to
    pub fn namespace(&self) -> Namespace {
        match self {
            Message::Vasp(_) => Namespace::Vasps,
            Message::CertReq(_) => Namespace::CertReqs,
            Message::Peer(_) => Namespace::Replicas,
        }
    }

    /// Type tag for replication payloads
    pub fn type_url(&self) -> &'static str {
        match self {
            Message::Vasp(_) => Vasp::TYPE_URL,
            Message::CertReq(_) => CertificateRequest::TYPE_URL,
            Message::Peer(_) => Peer::TYPE_URL,
        }
    }

    /// Record id
    pub fn record_id(&self) -> String {
        match self {
            Message::Vasp(r) => r.record_id(),
            Message::CertReq(r) => r.record_id(),
            Message::Peer(r) => r.record_id(),
        }
    }

    /// Replication metadata embedded in the record
    pub fn metadata(&self) -> Option<&Object> {
        match self {
            Message::Vasp(r) => r.metadata(),
            Message::CertReq(r) => r.metadata(),
            Message::Peer(r) => r.metadata(),
        }
    }

    /// True if the record is a deletion marker
    pub fn is_tombstone(&self) -> bool {
        match self {
            Message::Vasp(r) => r.is_tombstone(),
            Message::CertReq(r) => r.is_tombstone(),
            Message::Peer(r) => r.is_tombstone(),
        }
    }

    /// Storage encoding of the record
    pub fn marshal(&self) -> Result<Vec<u8>> {
        match self {
            Message::Vasp(r) => marshal(r.as_ref()),
            Message::CertReq(r) => marshal(r.as_ref()),
            Message::Peer(r) => marshal(r.as_ref()),
        }
    }

    /// Human readable JSON rendering of the record
    pub fn to_json(&self) -> Result<serde_json::Value> {
        let value = match self {
            Message::Vasp(r) => serde_json::to_value(r)?,
            Message::CertReq(r) => serde_json::to_value(r)?,
            Message::Peer(r) => serde_json::to_value(r)?,
        };
        Ok(value)
    }
}

/// Encode a record in its storage format
pub fn marshal<R: Record>(record: &R) -> Result<Vec<u8>> {
    Ok(rmp_serde::to_vec_named(record)?)
}

/// Decode a record from its storage format
pub fn unmarshal<R: Record>(data: &[u8]) -> Result<R> {
    decode(R::NAMESPACE, data)
}

// Stored bytes that do not decode are corrupt, not a caller error.
fn decode<T: DeserializeOwned>(namespace: Namespace, data: &[u8]) -> Result<T> {
    rmp_serde::from_slice(data).map_err(|e| {
        Error::corruption(format!("could not decode {} record: {}", namespace, e))
    })
}

/// Resolve a replicated namespace, rejecting the local-only ones
pub fn replicated_namespace(namespace: &str) -> Result<Namespace> {
    let ns: Namespace = namespace.parse()?;
    if !ns.is_replicated() {
        return Err(Error::CannotReplicate(namespace.to_string()));
    }
    Ok(ns)
}

/// Decode a stored value into the typed record for its namespace
pub fn unmarshal_proto(namespace: &str, data: &[u8]) -> Result<Message> {
    let ns = replicated_namespace(namespace)?;
    let msg = match ns {
        Namespace::Vasps => Message::Vasp(Box::new(decode(ns, data)?)),
        Namespace::CertReqs => Message::CertReq(Box::new(decode(ns, data)?)),
        Namespace::Replicas => Message::Peer(Box::new(decode(ns, data)?)),
        Namespace::Indices | Namespace::Sequence => {
            return Err(Error::CannotReplicate(namespace.to_string()))
        }
    };
    Ok(msg)
}

/// Decode a stored value into its replication object
///
/// With `with_data` the stored bytes are attached unchanged as the payload.
pub fn unmarshal_object(namespace: &str, data: &[u8], with_data: bool) -> Result<Object> {
    let msg = unmarshal_proto(namespace, data)?;
    let mut obj = msg
        .metadata()
        .cloned()
        .ok_or_else(|| Error::CannotReplicate(format!("{} record has no metadata", namespace)))?;

    if obj.key.is_empty() {
        obj.key = msg.record_id();
    }
    if obj.namespace.is_empty() {
        obj.namespace = msg.namespace().as_str().to_string();
    }
    obj.data = with_data.then(|| Payload {
        type_url: msg.type_url().to_string(),
        value: data.to_vec(),
    });
    trace!(target: "gds::wire", namespace, key = %obj.key, with_data, "unmarshaled object");
    Ok(obj)
}

/// Decode an index blob for inspection
pub fn unmarshal_index(data: &[u8]) -> Result<serde_json::Value> {
    blob::load_value(data)
}

/// Decode the primary key sequence
pub fn unmarshal_sequence(data: &[u8]) -> Result<u64> {
    decode_varint(data)
        .map(|(value, _)| value)
        .ok_or_else(|| Error::corruption("could not parse sequence"))
}

/// Convert human-written JSON into the storage encoding for `namespace`
pub fn remarshal_json(namespace: &str, json: &[u8]) -> Result<Vec<u8>> {
    match namespace.parse::<Namespace>()? {
        Namespace::Vasps => marshal(&serde_json::from_slice::<Vasp>(json)?),
        Namespace::CertReqs => marshal(&serde_json::from_slice::<CertificateRequest>(json)?),
        Namespace::Replicas => marshal(&serde_json::from_slice::<Peer>(json)?),
        Namespace::Indices => {
            let value: serde_json::Value = serde_json::from_slice(json)?;
            if !value.is_object() {
                return Err(Error::validation("index must be a JSON object"));
            }
            blob::dump(&value)
        }
        Namespace::Sequence => {
            let value: u64 = serde_json::from_slice(json)?;
            let mut buf = Vec::new();
            encode_varint(value, &mut buf);
            Ok(buf)
        }
    }
}

/// Base64 (standard alphabet, unpadded) rendering of a key
pub fn encode_key(key: &[u8]) -> String {
    STANDARD_NO_PAD.encode(key)
}

/// Inverse of [`encode_key`]
pub fn decode_key(key: &str) -> Result<Vec<u8>> {
    STANDARD_NO_PAD
        .decode(key)
        .map_err(|e| Error::validation(format!("invalid key encoding: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use gds_core::{GdsExtraData, LegalPerson, Version};
    use gds_search::ContainerIndex;

    fn vasp() -> Vasp {
        Vasp {
            id: "b1d3a8e4".into(),
            common_name: "alice.example.com".into(),
            website: "https://alice.example.com/".into(),
            entity: LegalPerson {
                name_identifiers: vec!["Alice VASP".into()],
                country_of_registration: "GB".into(),
                ..Default::default()
            },
            extra: GdsExtraData {
                metadata: Some(Object {
                    region: "us-east-1".into(),
                    owner: "8:mitchell".into(),
                    version: Some(Version {
                        pid: 8,
                        counter: 1,
                        region: "us-east-1".into(),
                        parent: None,
                    }),
                    ..Default::default()
                }),
                deleted_on: None,
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_unmarshal_proto_routes_namespace() {
        let data = marshal(&vasp()).unwrap();
        let msg = unmarshal_proto("vasps", &data).unwrap();
        assert_eq!(msg, Message::Vasp(Box::new(vasp())));
        assert_eq!(msg.marshal().unwrap(), data);

        assert!(matches!(
            unmarshal_proto("index", &data),
            Err(Error::CannotReplicate(_))
        ));
        assert!(matches!(
            unmarshal_proto("sequence", &data),
            Err(Error::CannotReplicate(_))
        ));
        assert!(matches!(
            unmarshal_proto("widgets", &data),
            Err(Error::UnknownNamespace(_))
        ));
        assert!(matches!(
            unmarshal_proto("certreqs", b"\xc1"),
            Err(Error::Corruption(msg)) if msg.contains("certreqs")
        ));
        assert!(matches!(
            unmarshal_object("vasps", b"\xc1\xc1", true),
            Err(Error::Corruption(_))
        ));
        assert!(matches!(unmarshal::<Vasp>(b"\xc1"), Err(Error::Corruption(_))));
    }

    #[test]
    fn test_unmarshal_object_fills_key_and_namespace() {
        let data = marshal(&vasp()).unwrap();

        let obj = unmarshal_object("vasps", &data, false).unwrap();
        assert_eq!(obj.key, "b1d3a8e4");
        assert_eq!(obj.namespace, "vasps");
        assert_eq!(obj.owner, "8:mitchell");
        assert!(obj.data.is_none());

        let obj = unmarshal_object("vasps", &data, true).unwrap();
        let payload = obj.data.unwrap();
        assert_eq!(payload.type_url, Vasp::TYPE_URL);
        assert_eq!(payload.value, data);
    }

    #[test]
    fn test_unmarshal_object_requires_metadata() {
        let mut record = vasp();
        record.extra.metadata = None;
        let data = marshal(&record).unwrap();
        assert!(matches!(
            unmarshal_object("vasps", &data, true),
            Err(Error::CannotReplicate(_))
        ));
    }

    #[test]
    fn test_remarshal_record_matches_marshal() {
        let json = serde_json::to_vec(&vasp()).unwrap();
        let data = remarshal_json("vasps", &json).unwrap();
        assert_eq!(data, marshal(&vasp()).unwrap());

        let peer = Peer {
            id: 8,
            addr: "mitchell:4435".into(),
            ..Default::default()
        };
        let data = remarshal_json("peers", &serde_json::to_vec(&peer).unwrap()).unwrap();
        assert_eq!(unmarshal::<Peer>(&data).unwrap(), peer);
    }

    #[test]
    fn test_remarshal_index_matches_dump() {
        let mut idx = ContainerIndex::new();
        idx.add("US", "b", None);
        idx.add("US", "a", None);
        idx.add("GB", "c", None);
        let dumped = idx.dump().unwrap();

        let json = unmarshal_index(&dumped).unwrap().to_string();
        assert_eq!(remarshal_json("index", json.as_bytes()).unwrap(), dumped);
        assert!(remarshal_json("index", b"[1, 2]").is_err());
    }

    #[test]
    fn test_remarshal_sequence() {
        let data = remarshal_json("sequence", b"300").unwrap();
        assert_eq!(data, vec![0xac, 0x02]);
        assert_eq!(unmarshal_sequence(&data).unwrap(), 300);
        assert!(unmarshal_sequence(&[]).is_err());
    }

    #[test]
    fn test_key_encoding() {
        let key = Namespace::Vasps.key("b1d3a8e4");
        let encoded = encode_key(&key);
        assert!(!encoded.ends_with('='));
        assert_eq!(decode_key(&encoded).unwrap(), key);
        assert!(decode_key("not base64!").is_err());
    }
}
