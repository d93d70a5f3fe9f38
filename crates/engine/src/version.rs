//! Object versioning for anti-entropy replication
//!
//! A [`VersionManager`] stamps a new lamport version on an object every time
//! the local replica writes it. The previous version is kept as a one-level
//! parent so a peer can tell whether an incoming write descends from the copy
//! it holds.

use gds_core::{Error, Object, Result, Version};
use tracing::debug;

use crate::config::ReplicaConfig;

/// Stamps versions on behalf of the local replica
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionManager {
    pid: u64,
    region: String,
    owner: String,
}

impl VersionManager {
    /// Create a manager for the configured replica
    ///
    /// Fails unless both a non-zero pid and a region are configured.
    pub fn new(replica: &ReplicaConfig) -> Result<Self> {
        if replica.pid == 0 {
            return Err(Error::Config("replica pid is required".to_string()));
        }
        if replica.region.is_empty() {
            return Err(Error::Config("replica region is required".to_string()));
        }
        Ok(VersionManager {
            pid: replica.pid,
            region: replica.region.clone(),
            owner: replica.owner(),
        })
    }

    /// Process id stamped on new versions
    pub fn pid(&self) -> u64 {
        self.pid
    }

    /// Region stamped on new versions
    pub fn region(&self) -> &str {
        &self.region
    }

    /// Owner stamped on genesis objects
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Advance the version of `object`
    ///
    /// Genesis objects also receive this replica's region and owner.
    pub fn update(&self, object: Option<&mut Object>) -> Result<()> {
        let object = object.ok_or_else(|| Error::validation("cannot update version on empty object"))?;

        let parent = match object.version.as_ref() {
            Some(v) if !v.is_zero() => Some(v.snapshot()),
            _ => None,
        };
        if parent.is_none() {
            object.region = self.region.clone();
            object.owner = self.owner.clone();
        }

        let counter = parent.as_ref().map_or(0, |p| p.counter) + 1;
        object.version = Some(Version {
            pid: self.pid,
            counter,
            region: self.region.clone(),
            parent: parent.map(Box::new),
        });
        debug!(target: "gds::store", key = %object.key, counter, "version updated");
        Ok(())
    }
}

/// Advance a version without a manager: bump the counter, remember the parent counter
pub(crate) fn bump_unmanaged(object: &mut Object) {
    let previous = object.version.take().unwrap_or_default();
    let parent = (!previous.is_zero()).then(|| {
        Box::new(Version {
            counter: previous.counter,
            ..Version::default()
        })
    });
    object.version = Some(Version {
        counter: previous.counter + 1,
        parent,
        ..Version::default()
    });
}

/// Advance `object` with the manager if one is attached
pub(crate) fn advance(vm: Option<&VersionManager>, object: &mut Object) -> Result<()> {
    match vm {
        Some(vm) => vm.update(Some(object)),
        None => {
            bump_unmanaged(object);
            Ok(())
        }
    }
}
