//! Point-in-time backups as compressed archives of a fresh log

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use chrono::Utc;
use flate2::write::GzEncoder;
use flate2::Compression;
use gds_core::Result;
use gds_storage::log::LOG_FILE;
use gds_storage::{KvBackend, LogBackend, LogConfig, WriteBatch};
use tracing::info;

use super::Store;

impl Store {
    /// Archive every key/value pair as `gdsdb-YYYYMMDDHHMM.tgz` in `dir`
    ///
    /// The pairs are copied into a compacted log in a working directory
    /// beside the archive, which is removed once the archive is written.
    /// Returns the archive path.
    pub fn backup(&self, dir: impl AsRef<Path>) -> Result<PathBuf> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let pairs = self.inner.read().db()?.scan_prefix(b"")?;
        let stamp = Utc::now().format("%Y%m%d%H%M").to_string();
        let name = format!("gdsdb-{}", stamp);
        let workdir = dir.join(&name);
        if workdir.exists() {
            fs::remove_dir_all(&workdir)?;
        }

        let copied = pairs.len();
        {
            let mut backup = LogBackend::open(&workdir, LogConfig::default())?;
            let mut batch = WriteBatch::new();
            for (key, value) in pairs {
                batch.put(key, value);
            }
            backup.write(batch)?;
            backup.sync()?;
        }

        let archive = dir.join(format!("{}.tgz", name));
        let result = write_archive(&workdir, &name, &archive);
        fs::remove_dir_all(&workdir)?;
        result?;

        info!(target: "gds::store", archive = %archive.display(), pairs = copied, "backup complete");
        Ok(archive)
    }
}

fn write_archive(workdir: &Path, name: &str, archive: &Path) -> Result<()> {
    let file = File::create(archive)?;
    let mut tar = tar::Builder::new(GzEncoder::new(file, Compression::default()));
    tar.append_path_with_name(workdir.join(LOG_FILE), format!("{}/{}", name, LOG_FILE))?;
    tar.into_inner()?.finish()?.sync_all()?;
    Ok(())
}
