//! Store configuration via `gdsdb.toml` or `GDS_*` environment variables
//!
//! The database is addressed by a DSN of the form `scheme:///relative/path`
//! (or `scheme:////absolute/path`). Supported schemes are `wal` for the
//! durable log backend and `memory` for an ephemeral store.

use std::path::{Path, PathBuf};

use gds_core::{Error, Result};
use gds_storage::{DurabilityMode, LogConfig, DEFAULT_COMPACT_THRESHOLD};
use serde::{Deserialize, Serialize};
use url::Url;

/// Config file name conventionally placed beside the database directory.
pub const CONFIG_FILE_NAME: &str = "gdsdb.toml";

/// DSN scheme of the durable log backend
pub const SCHEME_WAL: &str = "wal";

/// DSN scheme of the in-memory backend
pub const SCHEME_MEMORY: &str = "memory";

/// Default replication bind address
pub const DEFAULT_BIND_ADDR: &str = ":4435";

/// Identity of this replica, used to stamp object versions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReplicaConfig {
    /// Process id, unique across the replica network; 0 means unset
    #[serde(default)]
    pub pid: u64,
    /// Region the replica runs in
    #[serde(default)]
    pub region: String,
    /// Human readable replica name
    #[serde(default)]
    pub name: String,
    /// Address the replication service listens on
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

fn default_bind_addr() -> String {
    DEFAULT_BIND_ADDR.to_string()
}

impl Default for ReplicaConfig {
    fn default() -> Self {
        Self {
            pid: 0,
            region: String::new(),
            name: String::new(),
            bind_addr: default_bind_addr(),
        }
    }
}

impl ReplicaConfig {
    /// True if both a pid and a region are set
    pub fn is_configured(&self) -> bool {
        self.pid != 0 && !self.region.is_empty()
    }

    /// Owner string stamped on objects this replica creates: `"{pid}:{name}"`
    ///
    /// Falls back to the host of `bind_addr`, then to the region, when no
    /// name is configured.
    pub fn owner(&self) -> String {
        let name = if !self.name.is_empty() {
            self.name.as_str()
        } else {
            match self.bind_addr.rsplit_once(':') {
                Some((host, _)) if !host.is_empty() => host,
                _ => self.region.as_str(),
            }
        };
        format!("{}:{}", self.pid, name)
    }
}

/// Store configuration.
///
/// # Example
///
/// ```toml
/// url = "wal:///var/lib/gds/db"
/// reindex_on_boot = false
/// durability = "standard"
///
/// [replica]
/// pid = 8
/// region = "us-east-1"
/// name = "mitchell"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoreConfig {
    /// Database DSN, `wal:///path` or `memory:///`
    #[serde(default = "default_url")]
    pub url: String,
    /// Rebuild every index from the primary records when the store opens.
    #[serde(default)]
    pub reindex_on_boot: bool,
    /// Durability mode: `"standard"` or `"always"`.
    #[serde(default = "default_durability_str")]
    pub durability: String,
    /// Compact the log after this many appended batches; 0 disables.
    #[serde(default = "default_compact_threshold")]
    pub compact_threshold: u64,
    /// Replica identity for the version manager.
    #[serde(default)]
    pub replica: ReplicaConfig,
}

fn default_url() -> String {
    format!("{}:///", SCHEME_MEMORY)
}

fn default_durability_str() -> String {
    "standard".to_string()
}

fn default_compact_threshold() -> u64 {
    DEFAULT_COMPACT_THRESHOLD
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            reindex_on_boot: false,
            durability: default_durability_str(),
            compact_threshold: default_compact_threshold(),
            replica: ReplicaConfig::default(),
        }
    }
}

impl StoreConfig {
    /// Ephemeral in-memory store
    pub fn memory() -> Self {
        Self::default()
    }

    /// Durable store in `path`
    ///
    /// Relative paths stay relative; absolute paths produce a four-slash DSN.
    pub fn at(path: impl AsRef<Path>) -> Self {
        Self {
            url: format!("{}:///{}", SCHEME_WAL, path.as_ref().display()),
            ..Self::default()
        }
    }

    /// Builder-style replica identity
    pub fn with_replica(mut self, replica: ReplicaConfig) -> Self {
        self.replica = replica;
        self
    }

    /// Parse the durability string into a `DurabilityMode`.
    pub fn durability_mode(&self) -> Result<DurabilityMode> {
        self.durability.parse()
    }

    /// Parse the database DSN.
    pub fn dsn(&self) -> Result<Dsn> {
        Dsn::parse(&self.url)
    }

    /// Settings for the log backend.
    pub fn log_config(&self) -> Result<LogConfig> {
        Ok(LogConfig {
            durability: self.durability_mode()?,
            compact_threshold: self.compact_threshold,
        })
    }

    /// Check every field that can be invalid.
    pub fn validate(&self) -> Result<()> {
        self.durability_mode()?;
        let dsn = self.dsn()?;
        match dsn.scheme.as_str() {
            SCHEME_WAL | SCHEME_MEMORY => Ok(()),
            other => Err(Error::Config(format!(
                "unhandled database scheme {:?}",
                other
            ))),
        }
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# GDS directory store configuration
#
# Database DSN: "wal:///relative/path", "wal:////absolute/path" or "memory:///"
url = "memory:///"

# Rebuild all secondary indices from the primary records on open (default: false)
reindex_on_boot = false

# Durability mode: "standard" (default) or "always"
#   "standard" = flush every batch, fsync on sync and close
#   "always"   = fsync every batch
durability = "standard"

# Compact the log after this many batches (0 disables compaction)
compact_threshold = 10000

# Replica identity used to version objects for replication.
# Leave pid at 0 to run without a version manager.
[replica]
pid = 0
region = ""
name = ""
bind_addr = ":4435"
"#
    }

    /// Read and parse config from a file path.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let config: StoreConfig = toml::from_str(&content).map_err(|e| {
            Error::Config(format!(
                "Failed to parse config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Write the default config file if it does not already exist.
    pub fn write_default_if_missing(path: &Path) -> Result<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml())?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load configuration from the process environment.
    ///
    /// Reads `GDS_DATABASE_URL`, `GDS_DATABASE_REINDEX_ON_BOOT`,
    /// `GDS_DATABASE_DURABILITY`, `GDS_DATABASE_COMPACT_THRESHOLD` and
    /// `GDS_REPLICA_PID`, `GDS_REPLICA_REGION`, `GDS_REPLICA_NAME`,
    /// `GDS_REPLICA_BIND_ADDR`. Unset variables keep their defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = StoreConfig::default();
        if let Some(url) = lookup("GDS_DATABASE_URL") {
            config.url = url;
        }
        if let Some(v) = lookup("GDS_DATABASE_REINDEX_ON_BOOT") {
            config.reindex_on_boot = parse_bool("GDS_DATABASE_REINDEX_ON_BOOT", &v)?;
        }
        if let Some(v) = lookup("GDS_DATABASE_DURABILITY") {
            config.durability = v;
        }
        if let Some(v) = lookup("GDS_DATABASE_COMPACT_THRESHOLD") {
            config.compact_threshold = parse_num("GDS_DATABASE_COMPACT_THRESHOLD", &v)?;
        }
        if let Some(v) = lookup("GDS_REPLICA_PID") {
            config.replica.pid = parse_num("GDS_REPLICA_PID", &v)?;
        }
        if let Some(v) = lookup("GDS_REPLICA_REGION") {
            config.replica.region = v;
        }
        if let Some(v) = lookup("GDS_REPLICA_NAME") {
            config.replica.name = v;
        }
        if let Some(v) = lookup("GDS_REPLICA_BIND_ADDR") {
            config.replica.bind_addr = v;
        }
        config.validate()?;
        Ok(config)
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "t" | "yes" | "on" => Ok(true),
        "0" | "false" | "f" | "no" | "off" | "" => Ok(false),
        other => Err(Error::Config(format!("{}: invalid boolean {:?}", key, other))),
    }
}

fn parse_num(key: &str, value: &str) -> Result<u64> {
    value
        .trim()
        .parse()
        .map_err(|e| Error::Config(format!("{}: invalid number {:?}: {}", key, value, e)))
}

/// Parsed database DSN
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dsn {
    /// Backend scheme
    pub scheme: String,
    /// Filesystem path with the leading slash removed
    pub path: String,
}

impl Dsn {
    /// Parse `scheme:///relative/path` or `scheme:////absolute/path`.
    pub fn parse(uri: &str) -> Result<Dsn> {
        let url = Url::parse(uri).map_err(|e| Error::Config(format!("could not parse dsn: {}", e)))?;

        let rest = uri
            .split_once("://")
            .map(|(_, rest)| rest)
            .ok_or_else(|| dsn_error(uri))?;
        // the authority must be empty: scheme:///path
        if !rest.starts_with('/') {
            return Err(dsn_error(uri));
        }
        let path = rest
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .strip_prefix('/')
            .unwrap_or_default();

        let scheme = url.scheme().to_string();
        if path.is_empty() && scheme != SCHEME_MEMORY {
            return Err(dsn_error(uri));
        }

        Ok(Dsn {
            scheme,
            path: path.to_string(),
        })
    }

    /// The path as a filesystem path
    pub fn path_buf(&self) -> PathBuf {
        PathBuf::from(&self.path)
    }
}

fn dsn_error(uri: &str) -> Error {
    Error::Config(format!(
        "could not parse dsn {:?}, specify scheme:///relative/path/to/db",
        uri
    ))
}
