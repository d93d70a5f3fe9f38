//! Index blob encoding: JSON followed by a newline, gzip-compressed.
//!
//! Maps are `BTreeMap`s so keys serialize in sorted order and the same index
//! always produces the same bytes.

use std::io::{Read, Write};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use gds_core::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Encode a value as a gzip-compressed JSON blob
pub fn dump<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let mut gz = GzEncoder::new(Vec::new(), Compression::default());
    serde_json::to_writer(&mut gz, value)?;
    gz.write_all(b"\n")?;
    Ok(gz.finish()?)
}

/// Decode a gzip-compressed JSON blob
///
/// Every failure is reported as corruption.
pub fn load<T: DeserializeOwned>(data: &[u8]) -> Result<T> {
    let mut json = Vec::new();
    GzDecoder::new(data)
        .read_to_end(&mut json)
        .map_err(|e| Error::corruption(format!("could not decompress index: {}", e)))?;
    serde_json::from_slice(&json)
        .map_err(|e| Error::corruption(format!("could not decode index: {}", e)))
}

/// Decompress a blob into a generic JSON value, for inspection tooling
pub fn load_value(data: &[u8]) -> Result<serde_json::Value> {
    load(data)
}
