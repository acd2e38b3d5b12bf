//! Configuration for the memory subsystem.
//!
//! All knobs are serde-defaulted so a partial JSON config file (or none at
//! all) yields a working setup. The file round-trip exists so operators can
//! tune intervals and the data directory without recompiling.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Configuration for [`MemoryStore`](crate::MemoryStore) and
/// [`Scheduler`](crate::Scheduler).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Directory holding the snapshot, backup and journal files.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Seconds between background snapshot saves.
    #[serde(default = "default_snapshot_interval_secs")]
    pub snapshot_interval_secs: u64,

    /// Seconds between background consolidation sweeps.
    #[serde(default = "default_consolidation_interval_secs")]
    pub consolidation_interval_secs: u64,

    /// Minimum age, in seconds, before a short-term memory is eligible for
    /// promotion to the long-term tier.
    #[serde(default = "default_consolidation_age_secs")]
    pub consolidation_age_secs: u64,

    /// When true, persistence failures are returned to the caller instead of
    /// being logged and swallowed. Intended for tests.
    #[serde(default)]
    pub strict_persistence: bool,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./memory_data")
}

fn default_snapshot_interval_secs() -> u64 {
    5 * 60
}

fn default_consolidation_interval_secs() -> u64 {
    60 * 60
}

fn default_consolidation_age_secs() -> u64 {
    60 * 60
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            snapshot_interval_secs: default_snapshot_interval_secs(),
            consolidation_interval_secs: default_consolidation_interval_secs(),
            consolidation_age_secs: default_consolidation_age_secs(),
            strict_persistence: false,
        }
    }
}

impl MemoryConfig {
    /// Set the data directory.
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    /// Enable strict persistence (failures surface as errors).
    pub fn with_strict_persistence(mut self, strict: bool) -> Self {
        self.strict_persistence = strict;
        self
    }

    /// Snapshot-save interval as a [`Duration`].
    pub fn snapshot_interval(&self) -> Duration {
        Duration::from_secs(self.snapshot_interval_secs)
    }

    /// Consolidation-sweep interval as a [`Duration`].
    pub fn consolidation_interval(&self) -> Duration {
        Duration::from_secs(self.consolidation_interval_secs)
    }

    /// Age threshold for promotion as a [`chrono::Duration`].
    pub fn consolidation_age(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.consolidation_age_secs as i64)
    }

    /// Load a config from a JSON file, falling back to defaults when the
    /// file is absent.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write the config to a JSON file, pretty-printed.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let raw = serde_json::to_string_pretty(self)?;
        std::fs::write(path, raw)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_intervals() {
        let config = MemoryConfig::default();
        assert_eq!(config.snapshot_interval(), Duration::from_secs(300));
        assert_eq!(config.consolidation_interval(), Duration::from_secs(3600));
        assert_eq!(config.consolidation_age(), chrono::Duration::hours(1));
        assert!(!config.strict_persistence);
    }

    #[test]
    fn partial_json_fills_in_defaults() {
        let config: MemoryConfig =
            serde_json::from_str(r#"{"snapshot_interval_secs": 30}"#).unwrap();
        assert_eq!(config.snapshot_interval_secs, 30);
        assert_eq!(config.consolidation_interval_secs, 3600);
    }

    #[test]
    fn load_or_default_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let missing = MemoryConfig::load_or_default(&path).unwrap();
        assert_eq!(missing.snapshot_interval_secs, 300);

        let tuned = MemoryConfig::default().with_strict_persistence(true);
        tuned.save(&path).unwrap();

        let loaded = MemoryConfig::load_or_default(&path).unwrap();
        assert!(loaded.strict_persistence);
    }
}
