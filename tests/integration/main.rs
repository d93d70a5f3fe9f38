//! Integration Tests
//!
//! Cross-layer tests through the public gdsdb API:
//! - Directory: VASP lifecycle, search and reopen
//! - Replication: object exchange between stores
//! - Operations: configuration files and backups

#[path = "../common/mod.rs"]
mod common;

mod directory;
mod operations;
mod replication;
