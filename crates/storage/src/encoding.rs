//! Log frame encoding and decoding
//!
//! Each committed write batch is appended to the store log as one frame:
//!
//! ```text
//! [length: u32][type: u8][payload: bytes][crc32: u32]
//! ```
//!
//! - **length**: size of type + payload + crc (not including the length itself)
//! - **type**: frame type tag (1 = write batch)
//! - **payload**: bincode-serialized list of batch operations
//! - **crc32**: CRC32 over \[type\]\[payload\]
//!
//! All integers are little-endian. A frame is either replayed completely or
//! not at all; a short or corrupt frame marks the end of the valid log.

use std::io::{Cursor, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use crc32fast::Hasher;
use gds_core::error::{Error, Result};
use thiserror::Error as ThisError;

use crate::backend::{BatchOp, WriteBatch};

/// Frame type tag for an atomic write batch
pub const TYPE_BATCH: u8 = 1;

/// Bytes used by the length prefix
pub const LEN_SIZE: usize = 4;

/// Bytes used by the type tag and trailing crc
const FRAME_OVERHEAD: usize = 1 + 4;

/// Frames larger than this are treated as corrupt length fields
pub const MAX_FRAME_SIZE: usize = 256 * 1024 * 1024;

/// Why a frame could not be decoded
#[derive(Debug, ThisError, PartialEq, Eq)]
pub enum FrameError {
    /// Not enough bytes for a full frame (torn write at the tail)
    #[error("incomplete frame at offset {offset}: need {needed} bytes, have {available}")]
    Incomplete {
        /// Offset of the frame in the log
        offset: u64,
        /// Bytes the frame claims to need
        needed: usize,
        /// Bytes actually available
        available: usize,
    },

    /// Checksum mismatch, bad length or unknown type
    #[error("corrupt frame at offset {offset}: {reason}")]
    Corrupt {
        /// Offset of the frame in the log
        offset: u64,
        /// What was wrong with it
        reason: String,
    },
}

impl From<FrameError> for Error {
    fn from(e: FrameError) -> Self {
        Error::Corruption(e.to_string())
    }
}

/// Encode a write batch as one log frame
pub fn encode_batch(batch: &WriteBatch) -> Result<Vec<u8>> {
    let payload = bincode::serialize(batch.ops())?;
    let total_len = FRAME_OVERHEAD + payload.len();
    if total_len > MAX_FRAME_SIZE {
        return Err(Error::StorageError(format!(
            "write batch of {} bytes exceeds the frame limit",
            total_len
        )));
    }

    let mut buf = Vec::with_capacity(LEN_SIZE + total_len);
    buf.write_u32::<LittleEndian>(total_len as u32)?;
    buf.write_u8(TYPE_BATCH)?;
    buf.write_all(&payload)?;

    let mut hasher = Hasher::new();
    hasher.update(&[TYPE_BATCH]);
    hasher.update(&payload);
    buf.write_u32::<LittleEndian>(hasher.finalize())?;

    Ok(buf)
}

/// Decode one frame from the front of `buf`
///
/// `offset` is the position of `buf` in the log and is only used for error
/// reporting. Returns the batch and the number of bytes consumed.
pub fn decode_batch(buf: &[u8], offset: u64) -> std::result::Result<(WriteBatch, usize), FrameError> {
    if buf.len() < LEN_SIZE {
        return Err(FrameError::Incomplete {
            offset,
            needed: LEN_SIZE,
            available: buf.len(),
        });
    }

    let mut cursor = Cursor::new(buf);
    let total_len = cursor
        .read_u32::<LittleEndian>()
        .map_err(|e| corrupt(offset, e.to_string()))? as usize;

    if !(FRAME_OVERHEAD..=MAX_FRAME_SIZE).contains(&total_len) {
        return Err(corrupt(offset, format!("invalid frame length {}", total_len)));
    }

    if buf.len() < LEN_SIZE + total_len {
        return Err(FrameError::Incomplete {
            offset,
            needed: LEN_SIZE + total_len,
            available: buf.len(),
        });
    }

    let type_tag = cursor.read_u8().map_err(|e| corrupt(offset, e.to_string()))?;
    let mut payload = vec![0u8; total_len - FRAME_OVERHEAD];
    cursor
        .read_exact(&mut payload)
        .map_err(|e| corrupt(offset, e.to_string()))?;
    let expected_crc = cursor
        .read_u32::<LittleEndian>()
        .map_err(|e| corrupt(offset, e.to_string()))?;

    let mut hasher = Hasher::new();
    hasher.update(&[type_tag]);
    hasher.update(&payload);
    let actual_crc = hasher.finalize();
    if actual_crc != expected_crc {
        return Err(corrupt(
            offset,
            format!(
                "CRC mismatch: expected {:#010x}, got {:#010x}",
                expected_crc, actual_crc
            ),
        ));
    }

    if type_tag != TYPE_BATCH {
        return Err(corrupt(offset, format!("unknown frame type {}", type_tag)));
    }

    let ops: Vec<BatchOp> =
        bincode::deserialize(&payload).map_err(|e| corrupt(offset, e.to_string()))?;

    Ok((WriteBatch::from(ops), LEN_SIZE + total_len))
}

fn corrupt(offset: u64, reason: String) -> FrameError {
    FrameError::Corrupt { offset, reason }
}
