//! Durable log-structured backend
//!
//! The full key space lives in an ordered in-memory map. Every committed
//! [`WriteBatch`] is appended to `store.log` as a single checksummed frame
//! before it is applied to the map, so a batch is durable as a whole or not
//! at all.
//!
//! On open the log is replayed from the start. Replay stops at the first
//! incomplete or corrupt frame, and the file is truncated there: a torn
//! write at the tail only loses the batch that was being written.
//!
//! Compaction rewrites the log as one frame holding the live key set. The
//! new log is written beside the old one and renamed over it.
//!
//! The backend remembers how long the log was after its last good frame.
//! Bytes past that point are cut off before the next append, and a failed
//! append is rolled back to it. If the rollback fails too, the backend
//! refuses further writes until it is reopened.
//!
//! A `LOCK` file in the directory is held with an exclusive advisory lock
//! for the lifetime of the backend, so two processes never append to the
//! same log.

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use gds_core::{Error, Result};
use tracing::{debug, error, info, warn};

use crate::backend::{apply_ops, map_has_prefix, scan_map, BatchOp, KvBackend, WriteBatch};
use crate::durability::DurabilityMode;
use crate::encoding::{decode_batch, encode_batch, FrameError};

/// File name of the append-only log
pub const LOG_FILE: &str = "store.log";

/// File name of the process lock
pub const LOCK_FILE: &str = "LOCK";

const COMPACT_TMP_FILE: &str = "store.log.compact";

/// Default number of frames after which the log is compacted
pub const DEFAULT_COMPACT_THRESHOLD: u64 = 10_000;

/// Tuning for [`LogBackend`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogConfig {
    /// When appended frames are fsynced
    pub durability: DurabilityMode,
    /// Compact once this many frames have been appended since the last
    /// compaction; zero disables automatic compaction
    pub compact_threshold: u64,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            durability: DurabilityMode::Standard,
            compact_threshold: DEFAULT_COMPACT_THRESHOLD,
        }
    }
}

/// What replay found in the log
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplayStats {
    /// Frames decoded and applied
    pub frames_replayed: u64,
    /// Individual put/delete operations applied
    pub ops_applied: u64,
    /// Bytes discarded from the tail
    pub truncated_bytes: u64,
}

/// Backend persisting batches to a checksummed append-only log
#[derive(Debug)]
pub struct LogBackend {
    dir: PathBuf,
    log: File,
    // released when the backend is dropped
    _lock: File,
    data: BTreeMap<Vec<u8>, Vec<u8>>,
    // length of the log up to the end of the last good frame
    log_len: u64,
    // set when a failed append could not be rolled back
    failed: bool,
    config: LogConfig,
    frames_since_compaction: u64,
    replay: ReplayStats,
}

impl LogBackend {
    /// Open or create the log in `dir`
    ///
    /// Fails if another process holds the directory lock.
    pub fn open(dir: impl AsRef<Path>, config: LogConfig) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;

        let lock_path = dir.join(LOCK_FILE);
        let lock = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&lock_path)
            .map_err(|e| Error::StorageError(format!("failed to open lock file: {}", e)))?;
        fs2::FileExt::try_lock_exclusive(&lock).map_err(|_| {
            Error::StorageError(format!(
                "store at '{}' is already in use by another process",
                dir.display()
            ))
        })?;

        let log_path = dir.join(LOG_FILE);
        let mut log = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .append(true)
            .open(&log_path)?;

        let mut data = BTreeMap::new();
        let replay = replay(&mut log, &mut data)?;
        let log_len = log.metadata()?.len();

        info!(
            target: "gds::storage",
            path = %log_path.display(),
            frames = replay.frames_replayed,
            ops = replay.ops_applied,
            truncated_bytes = replay.truncated_bytes,
            keys = data.len(),
            durability = %config.durability,
            "Log replay complete"
        );

        Ok(LogBackend {
            dir,
            log,
            _lock: lock,
            data,
            log_len,
            failed: false,
            config,
            frames_since_compaction: replay.frames_replayed,
            replay,
        })
    }

    /// Directory holding the log
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Statistics from the replay performed at open
    pub fn replay_stats(&self) -> &ReplayStats {
        &self.replay
    }

    /// Frames appended since the last compaction (or since open)
    pub fn frames_since_compaction(&self) -> u64 {
        self.frames_since_compaction
    }

    /// Number of live keys
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True if no keys are live
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Rewrite the log as a single frame holding the live key set
    pub fn compact(&mut self) -> Result<()> {
        let tmp_path = self.dir.join(COMPACT_TMP_FILE);
        let log_path = self.dir.join(LOG_FILE);

        let ops: Vec<BatchOp> = self
            .data
            .iter()
            .map(|(k, v)| BatchOp::Put {
                key: k.clone(),
                value: v.clone(),
            })
            .collect();
        let frames = if ops.is_empty() { 0 } else { 1 };

        {
            let mut tmp = File::create(&tmp_path)?;
            if !ops.is_empty() {
                tmp.write_all(&encode_batch(&WriteBatch::from(ops))?)?;
            }
            tmp.sync_all()?;
        }
        fs::rename(&tmp_path, &log_path)?;

        // The old handle now points at an unlinked file.
        let reopened = OpenOptions::new()
            .read(true)
            .append(true)
            .open(&log_path)
            .and_then(|log| log.metadata().map(|meta| (log, meta.len())));
        match reopened {
            Ok((log, len)) => {
                self.log = log;
                self.log_len = len;
            }
            Err(e) => {
                self.failed = true;
                error!(target: "gds::storage", error = %e, "Could not reopen log after compaction");
                return Err(e.into());
            }
        }
        self.log.sync_all()?;

        debug!(
            target: "gds::storage",
            keys = self.data.len(),
            frames_before = self.frames_since_compaction,
            "Log compacted"
        );
        self.frames_since_compaction = frames;
        Ok(())
    }
}

impl LogBackend {
    fn append(&mut self, frame: &[u8]) -> Result<()> {
        self.log.write_all(frame)?;
        self.log.flush()?;
        if self.config.durability.requires_immediate_fsync() {
            self.log.sync_data()?;
        }
        Ok(())
    }

    /// Cut off bytes written past the last good frame
    fn discard_unacknowledged_tail(&mut self) -> Result<()> {
        let len = self.log.metadata()?.len();
        if len == self.log_len {
            return Ok(());
        }
        if len < self.log_len {
            self.failed = true;
            return Err(Error::Corruption(format!(
                "log at '{}' shrank from {} to {} bytes while open",
                self.dir.display(),
                self.log_len,
                len
            )));
        }
        warn!(
            target: "gds::storage",
            discarded_bytes = len - self.log_len,
            "Discarding unacknowledged bytes at log tail"
        );
        self.log.set_len(self.log_len)?;
        Ok(())
    }

    fn roll_back_append(&mut self, cause: &Error) {
        let rollback = self
            .log
            .set_len(self.log_len)
            .and_then(|_| self.log.sync_data());
        match rollback {
            Ok(()) => {
                warn!(target: "gds::storage", error = %cause, "Append failed, log rolled back")
            }
            Err(e) => {
                self.failed = true;
                error!(
                    target: "gds::storage",
                    error = %cause,
                    rollback_error = %e,
                    "Append failed and could not be rolled back; refusing further writes"
                );
            }
        }
    }
}

impl KvBackend for LogBackend {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.data.get(key).cloned())
    }

    fn write(&mut self, batch: WriteBatch) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }

        if self.failed {
            return Err(Error::StorageError(format!(
                "log at '{}' is unusable after a write failure; reopen the store",
                self.dir.display()
            )));
        }

        let frame = encode_batch(&batch)?;
        self.discard_unacknowledged_tail()?;
        if let Err(e) = self.append(&frame) {
            self.roll_back_append(&e);
            return Err(e);
        }
        self.log_len += frame.len() as u64;

        apply_ops(&mut self.data, batch.into_ops());
        self.frames_since_compaction += 1;

        if self.config.compact_threshold > 0
            && self.frames_since_compaction >= self.config.compact_threshold
        {
            // The batch is already durable; a failed compaction leaves the
            // old log in place.
            if let Err(e) = self.compact() {
                warn!(target: "gds::storage", error = %e, "Log compaction failed");
            }
        }
        Ok(())
    }

    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        Ok(scan_map(&self.data, prefix))
    }

    fn has_prefix(&self, prefix: &[u8]) -> Result<bool> {
        Ok(map_has_prefix(&self.data, prefix))
    }

    fn sync(&mut self) -> Result<()> {
        self.log.flush()?;
        self.log.sync_all()?;
        Ok(())
    }
}

impl Drop for LogBackend {
    fn drop(&mut self) {
        if let Err(e) = self.sync() {
            warn!(target: "gds::storage", error = %e, "Failed to sync log on drop");
        }
    }
}

/// Replay every valid frame into `data`, truncating the log after the last one
fn replay(log: &mut File, data: &mut BTreeMap<Vec<u8>, Vec<u8>>) -> Result<ReplayStats> {
    let mut buf = Vec::new();
    log.read_to_end(&mut buf)?;

    let mut stats = ReplayStats::default();
    let mut offset = 0usize;
    while offset < buf.len() {
        match decode_batch(&buf[offset..], offset as u64) {
            Ok((batch, consumed)) => {
                stats.ops_applied += apply_ops(data, batch.into_ops()) as u64;
                stats.frames_replayed += 1;
                offset += consumed;
            }
            Err(e) => {
                match &e {
                    FrameError::Incomplete { .. } => {
                        warn!(target: "gds::storage", error = %e, "Discarding torn write at log tail")
                    }
                    FrameError::Corrupt { .. } => {
                        warn!(target: "gds::storage", error = %e, "Discarding log after corrupt frame")
                    }
                }
                break;
            }
        }
    }

    if offset < buf.len() {
        stats.truncated_bytes = (buf.len() - offset) as u64;
        log.set_len(offset as u64)?;
        log.sync_all()?;
    }
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open(dir: &Path) -> LogBackend {
        LogBackend::open(dir, LogConfig::default()).unwrap()
    }

    #[test]
    fn test_reopen_replays_batches() {
        let dir = TempDir::new().unwrap();
        {
            let mut db = open(dir.path());
            db.put(b"vasps::a", b"1").unwrap();
            db.put(b"vasps::b", b"2").unwrap();
            db.delete(b"vasps::a").unwrap();
        }

        let db = open(dir.path());
        assert_eq!(db.replay_stats().frames_replayed, 3);
        assert_eq!(db.get(b"vasps::a").unwrap(), None);
        assert_eq!(db.get(b"vasps::b").unwrap(), Some(b"2".to_vec()));
    }

    #[test]
    fn test_torn_tail_is_truncated() {
        let dir = TempDir::new().unwrap();
        {
            let mut db = open(dir.path());
            db.put(b"k1", b"v1").unwrap();
            db.put(b"k2", b"v2").unwrap();
        }

        let log_path = dir.path().join(LOG_FILE);
        let full = fs::metadata(&log_path).unwrap().len();
        let file = OpenOptions::new().write(true).open(&log_path).unwrap();
        file.set_len(full - 3).unwrap();
        drop(file);

        let db = open(dir.path());
        assert_eq!(db.replay_stats().frames_replayed, 1);
        assert!(db.replay_stats().truncated_bytes > 0);
        assert_eq!(db.get(b"k1").unwrap(), Some(b"v1".to_vec()));
        assert_eq!(db.get(b"k2").unwrap(), None);
        let after = fs::metadata(&log_path).unwrap().len();
        assert!(after < full - 3);
    }

    #[test]
    fn test_appends_after_truncation_survive() {
        let dir = TempDir::new().unwrap();
        {
            let mut db = open(dir.path());
            db.put(b"k1", b"v1").unwrap();
        }
        {
            let mut f = OpenOptions::new()
                .append(true)
                .open(dir.path().join(LOG_FILE))
                .unwrap();
            f.write_all(&[0x20, 0x00]).unwrap();
        }
        {
            let mut db = open(dir.path());
            db.put(b"k2", b"v2").unwrap();
        }

        let db = open(dir.path());
        assert_eq!(db.replay_stats().truncated_bytes, 0);
        assert_eq!(db.len(), 2);
    }

    #[test]
    fn test_second_open_is_rejected() {
        let dir = TempDir::new().unwrap();
        let _db = open(dir.path());
        let err = LogBackend::open(dir.path(), LogConfig::default()).unwrap_err();
        assert!(err.to_string().contains("already in use"));
    }

    #[test]
    fn test_compaction_preserves_live_keys() {
        let dir = TempDir::new().unwrap();
        let config = LogConfig {
            durability: DurabilityMode::Always,
            compact_threshold: 4,
        };
        {
            let mut db = LogBackend::open(dir.path(), config).unwrap();
            for i in 0..10u8 {
                db.put(&[b'k', i % 3], &[i]).unwrap();
            }
            assert!(db.frames_since_compaction() < 4);
        }

        let db = LogBackend::open(dir.path(), config).unwrap();
        assert_eq!(db.len(), 3);
        assert_eq!(db.get(&[b'k', 0]).unwrap(), Some(vec![9]));
        assert_eq!(db.get(&[b'k', 1]).unwrap(), Some(vec![7]));
        assert_eq!(db.get(&[b'k', 2]).unwrap(), Some(vec![8]));
    }

    #[test]
    fn test_compact_empty_store() {
        let dir = TempDir::new().unwrap();
        let mut db = open(dir.path());
        db.put(b"k", b"v").unwrap();
        db.delete(b"k").unwrap();
        db.compact().unwrap();
        assert_eq!(db.frames_since_compaction(), 0);
        assert_eq!(fs::metadata(dir.path().join(LOG_FILE)).unwrap().len(), 0);
    }
}
