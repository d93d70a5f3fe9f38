//! Directory store facade
//!
//! The [`Store`] owns the primary key-value backend, the four VASP secondary
//! indices and the primary key sequence. Every mutation writes the record, the
//! sequence and every index blob in one atomic backend batch; if the batch
//! fails the in-memory indices are restored so memory never runs ahead of disk.
//!
//! # Locking
//!
//! One `RwLock` guards the backend, indices and sequence as a unit. The
//! version manager has its own lock and is always acquired second.

mod backup;
mod certreqs;
mod indices;
mod objects;
mod peers;
mod vasps;

pub use indices::IndexName;
pub use objects::{MergeOutcome, ObjectEntry, ObjectIter, ObjectStore};
pub use vasps::VaspFilter;

use chrono::{SecondsFormat, Utc};
use gds_core::{Error, Namespace, Object, Record, Result, Vasp};
use gds_storage::{sequence_key, KvBackend, LogBackend, MemoryBackend, Sequence, WriteBatch};
use parking_lot::RwLock;
use tracing::{debug, error, info, warn};

use crate::config::{StoreConfig, SCHEME_MEMORY, SCHEME_WAL};
use crate::version::{self, VersionManager};
use crate::wire;
use indices::{load_or_empty, Indices};

/// How the secondary indices were obtained when the store opened
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexStatus {
    /// Empty store, nothing to load
    ColdStart,
    /// Every index blob was loaded from disk
    Loaded,
    /// Indices were rebuilt from the primary records
    Rebuilt {
        /// Why the rebuild ran
        reason: String,
    },
}

/// Storage, indexing and versioning for the directory service
pub struct Store {
    inner: RwLock<Inner>,
    vm: RwLock<Option<VersionManager>>,
    config: StoreConfig,
    status: IndexStatus,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("url", &self.config.url)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
pub(crate) struct Inner {
    db: Option<Box<dyn KvBackend>>,
    indices: Indices,
    sequence: Sequence,
}

impl Store {
    /// Open the backend named by the config DSN and load the indices
    pub fn open(config: StoreConfig) -> Result<Store> {
        config.validate()?;
        let dsn = config.dsn()?;
        let db: Box<dyn KvBackend> = match dsn.scheme.as_str() {
            SCHEME_WAL => Box::new(LogBackend::open(dsn.path_buf(), config.log_config()?)?),
            SCHEME_MEMORY => Box::new(MemoryBackend::new()),
            other => {
                return Err(Error::Config(format!(
                    "unhandled database scheme {:?}",
                    other
                )))
            }
        };
        Self::with_backend(db, config)
    }

    /// Open a store over an already opened backend
    ///
    /// A version manager is attached when the config names a replica pid.
    pub fn with_backend(db: Box<dyn KvBackend>, config: StoreConfig) -> Result<Store> {
        let mut inner = Inner {
            db: Some(db),
            indices: Indices::default(),
            sequence: Sequence::default(),
        };

        if let Some(data) = inner.get(&sequence_key())? {
            inner.sequence = Sequence::load(&data)?;
        }

        let mut loaded = 0;
        for name in IndexName::ALL {
            let data = inner.get(&name.key())?;
            if load_or_empty(&mut inner.indices, name, data.as_deref()) {
                loaded += 1;
            }
        }

        let has_vasps = inner.db()?.has_prefix(&Namespace::Vasps.prefix())?;
        let status = if config.reindex_on_boot {
            IndexStatus::Rebuilt {
                reason: "reindex on boot requested".to_string(),
            }
        } else if has_vasps && inner.indices.is_any_empty() {
            IndexStatus::Rebuilt {
                reason: format!("{} of {} indices loaded, some are empty", loaded, IndexName::ALL.len()),
            }
        } else if !has_vasps && loaded == 0 {
            IndexStatus::ColdStart
        } else {
            IndexStatus::Loaded
        };

        if let IndexStatus::Rebuilt { reason } = &status {
            let count = inner.reindex()?;
            info!(target: "gds::store", %reason, records = count, "indices rebuilt");
        }

        let vm = if config.replica.pid != 0 {
            Some(VersionManager::new(&config.replica)?)
        } else {
            None
        };

        info!(
            target: "gds::store",
            url = %config.url,
            status = ?status,
            sequence = inner.sequence.value(),
            names = inner.indices.names.len(),
            versioned = vm.is_some(),
            "store opened"
        );

        Ok(Store {
            inner: RwLock::new(inner),
            vm: RwLock::new(vm),
            config,
            status,
        })
    }

    /// Configuration the store was opened with
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// How the indices were obtained at open
    pub fn index_status(&self) -> &IndexStatus {
        &self.status
    }

    /// Current value of the primary key sequence
    pub fn sequence(&self) -> u64 {
        self.inner.read().sequence.value()
    }

    /// Version every subsequent write with `vm`
    pub fn set_version_manager(&self, vm: VersionManager) {
        *self.vm.write() = Some(vm);
    }

    /// The attached version manager, if any
    pub fn version_manager(&self) -> Option<VersionManager> {
        self.vm.read().clone()
    }

    /// Rebuild every index from the primary VASP records
    ///
    /// Returns the number of records indexed.
    pub fn reindex(&self) -> Result<usize> {
        let count = self.inner.write().reindex()?;
        info!(target: "gds::store", records = count, "reindex complete");
        Ok(count)
    }

    /// Checkpoint the indices, sync and release the backend
    ///
    /// Every later operation fails with a storage error. Closing twice is a
    /// no-op.
    pub fn close(&self) -> Result<()> {
        let mut inner = self.inner.write();
        if inner.db.is_none() {
            return Ok(());
        }
        let mut batch = WriteBatch::new();
        inner.checkpoint(&mut batch)?;
        let db = inner.db_mut()?;
        db.write(batch)?;
        db.sync()?;
        inner.db = None;
        info!(target: "gds::store", url = %self.config.url, "store closed");
        Ok(())
    }

    /// Stamp the next version on a record, creating its metadata if needed
    pub(crate) fn advance<R: Record>(&self, record: &mut R) -> Result<()> {
        let id = record.record_id();
        let meta = record
            .metadata_mut()
            .get_or_insert_with(|| Object::new(R::NAMESPACE.as_str(), id.clone()));
        if meta.key.is_empty() {
            meta.key = id;
        }
        if meta.namespace.is_empty() {
            meta.namespace = R::NAMESPACE.as_str().to_string();
        }
        let vm = self.vm.read();
        version::advance(vm.as_ref(), meta)
    }
}

impl Inner {
    fn db(&self) -> Result<&dyn KvBackend> {
        self.db
            .as_deref()
            .ok_or_else(|| Error::StorageError("store is closed".to_string()))
    }

    fn db_mut(&mut self) -> Result<&mut (dyn KvBackend + 'static)> {
        self.db
            .as_deref_mut()
            .ok_or_else(|| Error::StorageError("store is closed".to_string()))
    }

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.db()?.get(key)
    }

    /// Decode the record stored under `id`, tombstones included
    fn get_record<R: Record>(&self, id: &str) -> Result<Option<R>> {
        match self.get(&R::NAMESPACE.key(id))? {
            Some(data) => Ok(Some(wire::unmarshal(&data)?)),
            None => Ok(None),
        }
    }

    /// Decode every live record in the namespace, skipping undecodable ones
    fn list_records<R: Record>(&self) -> Result<Vec<R>> {
        let mut records = Vec::new();
        for (key, value) in self.db()?.scan_prefix(&R::NAMESPACE.prefix())? {
            match wire::unmarshal::<R>(&value) {
                Ok(record) if record.is_tombstone() => {}
                Ok(record) => records.push(record),
                Err(e) => warn!(
                    target: "gds::store",
                    key = %String::from_utf8_lossy(&key),
                    error = %e,
                    "skipping undecodable record"
                ),
            }
        }
        Ok(records)
    }

    fn checkpoint(&self, batch: &mut WriteBatch) -> Result<()> {
        batch.put(sequence_key(), self.sequence.dump());
        self.indices.checkpoint(batch)
    }

    /// Run `mutate` and persist its batch together with a checkpoint
    ///
    /// On any failure the indices and sequence are restored.
    fn commit<F>(&mut self, mutate: F) -> Result<()>
    where
        F: FnOnce(&mut Indices, &mut Sequence, &mut WriteBatch) -> Result<()>,
    {
        let indices = self.indices.clone();
        let sequence = self.sequence;
        if let Err(e) = self.try_commit(mutate) {
            error!(target: "gds::store", error = %e, "write failed, restoring in-memory indices");
            self.indices = indices;
            self.sequence = sequence;
            return Err(e);
        }
        Ok(())
    }

    fn try_commit<F>(&mut self, mutate: F) -> Result<()>
    where
        F: FnOnce(&mut Indices, &mut Sequence, &mut WriteBatch) -> Result<()>,
    {
        let mut batch = WriteBatch::new();
        mutate(&mut self.indices, &mut self.sequence, &mut batch)?;
        self.checkpoint(&mut batch)?;
        debug!(target: "gds::store", ops = batch.len(), "writing batch");
        self.db_mut()?.write(batch)
    }

    fn reindex(&mut self) -> Result<usize> {
        let mut rebuilt = Indices::default();
        let vasps = self.list_records::<Vasp>()?;
        for vasp in &vasps {
            rebuilt.insert(vasp);
        }
        self.commit(|indices, _, _| {
            *indices = rebuilt;
            Ok(())
        })?;
        Ok(vasps.len())
    }
}

/// RFC 3339 timestamp with second precision
pub(crate) fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}
