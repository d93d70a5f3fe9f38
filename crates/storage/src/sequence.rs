//! Persisted monotonic counter
//!
//! The store allocates one value per created record and persists the counter
//! as an unsigned varint under `sequence::pks`. The counter never moves
//! backwards, even when the record that consumed a value is deleted.

use gds_core::{Error, Namespace, Result};

use crate::varint::{decode_varint, encode_varint};

/// Record key of the primary key sequence within the sequence namespace
pub const SEQUENCE_KEY: &str = "pks";

/// Full primary store key of the sequence
pub fn sequence_key() -> Vec<u8> {
    Namespace::Sequence.key(SEQUENCE_KEY)
}

/// Monotonic u64 counter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Sequence(u64);

impl Sequence {
    /// Counter starting at `value`
    pub fn new(value: u64) -> Self {
        Sequence(value)
    }

    /// Advance the counter and return the new value
    ///
    /// Wraps at 2^64.
    pub fn next(&mut self) -> u64 {
        self.0 = self.0.wrapping_add(1);
        self.0
    }

    /// Current value without advancing
    pub fn value(&self) -> u64 {
        self.0
    }

    /// Varint encoding of the counter
    pub fn dump(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(4);
        encode_varint(self.0, &mut buf);
        buf
    }

    /// Restore the counter from its varint encoding
    pub fn load(data: &[u8]) -> Result<Sequence> {
        decode_varint(data)
            .map(|(value, _)| Sequence(value))
            .ok_or_else(|| {
                Error::corruption(format!(
                    "could not parse sequence from {} bytes",
                    data.len()
                ))
            })
    }
}
