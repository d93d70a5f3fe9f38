//! Durability mode for the store log.

use std::fmt;
use std::str::FromStr;

use gds_core::Error;
use serde::{Deserialize, Serialize};

/// Controls when appended frames are fsynced to disk.
///
/// | Mode | Guarantee |
/// |------|-----------|
/// | Standard | Frames reach the OS page cache; fsync on `sync()` and close |
/// | Always | Every committed batch is fsynced before the write returns |
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DurabilityMode {
    /// Flush to the OS after every batch, fsync on demand.
    ///
    /// Survives a process crash; may lose recent writes on power loss.
    #[default]
    Standard,

    /// fsync after every batch.
    Always,
}

impl DurabilityMode {
    /// Check if this mode requires fsync on every commit.
    pub fn requires_immediate_fsync(&self) -> bool {
        matches!(self, DurabilityMode::Always)
    }

    /// Human-readable description of the mode.
    pub fn description(&self) -> &'static str {
        match self {
            DurabilityMode::Standard => "Flush per batch, fsync on sync and close",
            DurabilityMode::Always => "fsync per batch (safest, slowest)",
        }
    }
}

impl fmt::Display for DurabilityMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DurabilityMode::Standard => f.write_str("standard"),
            DurabilityMode::Always => f.write_str("always"),
        }
    }
}

impl FromStr for DurabilityMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standard" => Ok(DurabilityMode::Standard),
            "always" => Ok(DurabilityMode::Always),
            other => Err(Error::Config(format!(
                "unknown durability mode {:?}, expected \"standard\" or \"always\"",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fsync_requirements() {
        assert!(!DurabilityMode::Standard.requires_immediate_fsync());
        assert!(DurabilityMode::Always.requires_immediate_fsync());
    }

    #[test]
    fn test_parse() {
        assert_eq!("always".parse::<DurabilityMode>().unwrap(), DurabilityMode::Always);
        assert_eq!(" Standard ".parse::<DurabilityMode>().unwrap(), DurabilityMode::Standard);
        assert!("strict".parse::<DurabilityMode>().is_err());
    }

    #[test]
    fn test_default_is_standard() {
        assert_eq!(DurabilityMode::default(), DurabilityMode::Standard);
        assert_eq!(DurabilityMode::default().to_string(), "standard");
    }
}
