//! Durable storage for the memory collection.
//!
//! Dual-write model: a full-collection **snapshot** (compact JSON at the
//! primary path, pretty-printed at a secondary backup path) rewritten
//! wholesale on every save, plus an append-only **journal** receiving one
//! JSON line per created memory. The journal is a creation-only
//! write-ahead record, not a full change log — updates, deletes and
//! consolidations only ever reach the snapshot.
//!
//! Startup precedence: snapshot, else journal replay (per-line tolerant),
//! else empty.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::Result;
use crate::memory::Memory;

/// Snapshot filename under the data directory.
pub const SNAPSHOT_FILE: &str = "memories.json";
/// Human-readable backup filename, rewritten alongside every snapshot.
pub const BACKUP_FILE: &str = "memories.backup.json";
/// Append-only creation journal, one JSON record per line.
pub const JOURNAL_FILE: &str = "journal.jsonl";

/// Storage seam for [`MemoryStore`](crate::MemoryStore).
///
/// Implementations are synchronous; the store's write-behind scheduler is
/// what keeps I/O off the caller's path.
pub trait PersistenceBackend: Send + Sync {
    /// Rewrite the full snapshot (primary + backup).
    fn write_snapshot(&self, memories: &[Memory]) -> Result<()>;

    /// Append one created memory to the journal.
    fn append_journal(&self, memory: &Memory) -> Result<()>;

    /// Read the primary snapshot, `None` when absent.
    fn read_snapshot(&self) -> Result<Option<Vec<Memory>>>;

    /// Replay the journal, skipping malformed lines.
    fn replay_journal(&self) -> Result<Vec<Memory>>;
}

/// File-backed persistence under a single data directory.
pub struct FileBackend {
    snapshot_path: PathBuf,
    backup_path: PathBuf,
    journal_path: PathBuf,
}

impl FileBackend {
    /// Create a backend rooted at `dir`, creating the directory if needed.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        Ok(Self {
            snapshot_path: dir.join(SNAPSHOT_FILE),
            backup_path: dir.join(BACKUP_FILE),
            journal_path: dir.join(JOURNAL_FILE),
        })
    }

    /// Path of the primary snapshot file.
    pub fn snapshot_path(&self) -> &Path {
        &self.snapshot_path
    }

    /// Path of the journal file.
    pub fn journal_path(&self) -> &Path {
        &self.journal_path
    }
}

impl PersistenceBackend for FileBackend {
    fn write_snapshot(&self, memories: &[Memory]) -> Result<()> {
        let compact = serde_json::to_string(memories)?;
        fs::write(&self.snapshot_path, compact)?;

        let pretty = serde_json::to_string_pretty(memories)?;
        fs::write(&self.backup_path, pretty)?;
        Ok(())
    }

    fn append_journal(&self, memory: &Memory) -> Result<()> {
        let line = serde_json::to_string(memory)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.journal_path)?;
        writeln!(file, "{}", line)?;
        Ok(())
    }

    fn read_snapshot(&self) -> Result<Option<Vec<Memory>>> {
        if !self.snapshot_path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&self.snapshot_path)?;
        Ok(Some(serde_json::from_str(&raw)?))
    }

    fn replay_journal(&self) -> Result<Vec<Memory>> {
        if !self.journal_path.exists() {
            return Ok(Vec::new());
        }
        let raw = fs::read_to_string(&self.journal_path)?;

        let mut memories = Vec::new();
        for (line_no, line) in raw.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<Memory>(line) {
                Ok(memory) => memories.push(memory),
                Err(e) => {
                    warn!(line = line_no + 1, error = %e, "skipping malformed journal line");
                }
            }
        }
        Ok(memories)
    }
}

/// No-op backend for purely in-memory stores (tests, ephemeral sessions).
pub struct NullBackend;

impl PersistenceBackend for NullBackend {
    fn write_snapshot(&self, _memories: &[Memory]) -> Result<()> {
        Ok(())
    }

    fn append_journal(&self, _memory: &Memory) -> Result<()> {
        Ok(())
    }

    fn read_snapshot(&self) -> Result<Option<Vec<Memory>>> {
        Ok(None)
    }

    fn replay_journal(&self) -> Result<Vec<Memory>> {
        Ok(Vec::new())
    }
}

/// Backend that fails every write — used to exercise soft-fail paths.
#[cfg(test)]
pub(crate) struct FailingBackend;

#[cfg(test)]
impl PersistenceBackend for FailingBackend {
    fn write_snapshot(&self, _memories: &[Memory]) -> Result<()> {
        Err(crate::error::Error::persistence("disk on fire"))
    }

    fn append_journal(&self, _memory: &Memory) -> Result<()> {
        Err(crate::error::Error::persistence("disk on fire"))
    }

    fn read_snapshot(&self) -> Result<Option<Vec<Memory>>> {
        Ok(None)
    }

    fn replay_journal(&self) -> Result<Vec<Memory>> {
        Ok(Vec::new())
    }
}
