//! Storage layer for the directory store
//!
//! This crate implements the primary key-value backends:
//! - KvBackend: ordered keys, prefix scans and atomic write batches
//! - MemoryBackend: ephemeral BTreeMap backend
//! - LogBackend: BTreeMap backed by a checksummed append-only log with
//!   torn-tail recovery and compaction
//! - Sequence: persisted varint counter used for primary key allocation

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod durability;
pub mod encoding;
pub mod log;
pub mod memory;
pub mod sequence;
pub mod varint;

pub use backend::{BatchOp, KvBackend, WriteBatch};
pub use durability::DurabilityMode;
pub use log::{LogBackend, LogConfig, ReplayStats, DEFAULT_COMPACT_THRESHOLD};
pub use memory::MemoryBackend;
pub use sequence::{sequence_key, Sequence, SEQUENCE_KEY};
