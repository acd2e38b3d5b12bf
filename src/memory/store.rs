//! Authoritative in-memory memory collection with write-behind durability.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;
use tracing::{debug, warn};

use crate::config::MemoryConfig;
use crate::error::{Error, Result};
use crate::memory::related::related;
use crate::memory::reflection::generate_reflection;
use crate::memory::search::{search, SearchFilters, SearchHit};
use crate::memory::stats::{compute, MemoryStats};
use crate::memory::types::{
    clamp_emotional_weight, Memory, MemoryId, MemoryPatch,
    CONSOLIDATION_IMPORTANCE_BUMP, CONSOLIDATION_IMPORTANCE_CAP,
};
use crate::persistence::{FileBackend, NullBackend, PersistenceBackend};

/// Single-writer store over the full memory collection.
///
/// The in-memory collection is authoritative; durability is best-effort.
/// Persistence failures are logged and swallowed unless
/// [`MemoryConfig::strict_persistence`] is set, in which case they surface
/// as errors (intended for tests).
///
/// Snapshot writes happen immediately after update, delete, import and
/// consolidation; creation appends to the journal and leaves the snapshot
/// to the background timer. Reads may run concurrently; all mutations take
/// the write lock.
pub struct MemoryStore {
    memories: RwLock<Vec<Memory>>,
    backend: Arc<dyn PersistenceBackend>,
    consolidation_age: chrono::Duration,
    strict: bool,
    dirty: AtomicBool,
}

impl MemoryStore {
    /// Build a store over an injected persistence backend.
    ///
    /// Does not load — call [`load`](Self::load) (or use
    /// [`open`](Self::open)) to pick up previously persisted state.
    pub fn with_backend(backend: Arc<dyn PersistenceBackend>, config: &MemoryConfig) -> Self {
        Self {
            memories: RwLock::new(Vec::new()),
            backend,
            consolidation_age: config.consolidation_age(),
            strict: config.strict_persistence,
            dirty: AtomicBool::new(false),
        }
    }

    /// Open a file-backed store under `config.data_dir` and load state.
    pub fn open(config: &MemoryConfig) -> Result<Self> {
        let backend = Arc::new(FileBackend::new(&config.data_dir)?);
        let store = Self::with_backend(backend, config);
        store.load()?;
        Ok(store)
    }

    /// Create a store with no durability (for testing and ephemeral use).
    pub fn in_memory() -> Self {
        Self::with_backend(Arc::new(NullBackend), &MemoryConfig::default())
    }

    fn read_guard(&self) -> Result<RwLockReadGuard<'_, Vec<Memory>>> {
        self.memories
            .read()
            .map_err(|e| Error::Internal(format!("memory lock poisoned: {}", e)))
    }

    fn write_guard(&self) -> Result<RwLockWriteGuard<'_, Vec<Memory>>> {
        self.memories
            .write()
            .map_err(|e| Error::Internal(format!("memory lock poisoned: {}", e)))
    }

    /// Run a persistence operation under the soft-fail policy.
    ///
    /// Returns whether the write actually reached the backend, so callers
    /// can keep the dirty flag honest after a swallowed failure.
    fn persist<F>(&self, op: &'static str, f: F) -> Result<bool>
    where
        F: FnOnce(&dyn PersistenceBackend) -> Result<()>,
    {
        match f(self.backend.as_ref()) {
            Ok(()) => Ok(true),
            Err(e) if self.strict => Err(e),
            Err(e) => {
                warn!(op, error = %e, "persistence failed; in-memory state stays authoritative");
                Ok(false)
            }
        }
    }

    /// Write the full snapshot to the backend under the soft-fail policy.
    fn try_snapshot(&self) -> Result<bool> {
        let memories = self.read_guard()?.clone();
        self.persist("snapshot", |b| b.write_snapshot(&memories))
    }

    // ==================== Lifecycle ====================

    /// Load persisted state: snapshot first, else journal replay, else empty.
    pub fn load(&self) -> Result<()> {
        let loaded = match self.backend.read_snapshot() {
            Ok(Some(memories)) => memories,
            Ok(None) => match self.backend.replay_journal() {
                Ok(memories) => {
                    if !memories.is_empty() {
                        debug!(count = memories.len(), "recovered collection from journal");
                    }
                    memories
                }
                Err(e) if self.strict => return Err(e),
                Err(e) => {
                    warn!(error = %e, "journal replay failed; starting empty");
                    Vec::new()
                }
            },
            Err(e) if self.strict => return Err(e),
            Err(e) => {
                warn!(error = %e, "snapshot read failed; starting empty");
                Vec::new()
            }
        };

        *self.write_guard()? = loaded;
        self.dirty.store(false, Ordering::SeqCst);
        Ok(())
    }

    /// Write the full snapshot now.
    ///
    /// The dirty flag is cleared only when the write actually reached the
    /// backend; a soft-failed save leaves the store dirty so the
    /// background timer retries.
    pub fn save(&self) -> Result<()> {
        if self.try_snapshot()? {
            self.dirty.store(false, Ordering::SeqCst);
        }
        Ok(())
    }

    /// Save only when mutations happened since the last save.
    ///
    /// Returns whether a snapshot reached the backend. Used by the
    /// background snapshot timer.
    pub fn save_if_dirty(&self) -> Result<bool> {
        if !self.dirty.swap(false, Ordering::SeqCst) {
            return Ok(false);
        }
        match self.try_snapshot() {
            Ok(true) => Ok(true),
            Ok(false) => {
                self.dirty.store(true, Ordering::SeqCst);
                Ok(false)
            }
            Err(e) => {
                self.dirty.store(true, Ordering::SeqCst);
                Err(e)
            }
        }
    }

    /// Whether unsaved mutations exist.
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::SeqCst)
    }

    // ==================== CRUD ====================

    /// Append a new memory to the collection and journal it.
    ///
    /// Re-sanitizes the entity on the way in (weight clamped, tags
    /// deduplicated, tier and access fields reset) so the stored
    /// invariants hold for hand-built records. Never fails functionally; in
    /// strict mode a journal failure surfaces as an error after the memory
    /// has already been added.
    pub fn create(&self, memory: Memory) -> Result<Memory> {
        let memory = memory.sanitized();
        self.write_guard()?.push(memory.clone());
        self.dirty.store(true, Ordering::SeqCst);
        self.persist("journal", |b| b.append_journal(&memory))?;
        Ok(memory)
    }

    /// Get a memory by id.
    pub fn get(&self, id: &MemoryId) -> Result<Option<Memory>> {
        Ok(self.read_guard()?.iter().find(|m| &m.id == id).cloned())
    }

    /// Shallow-merge a patch into the memory with `id`.
    ///
    /// Returns `false` (a no-op, not an error) when the id is unknown.
    /// Triggers an immediate snapshot write.
    pub fn update(&self, id: &MemoryId, patch: MemoryPatch) -> Result<bool> {
        let updated = {
            let mut memories = self.write_guard()?;
            match memories.iter_mut().find(|m| &m.id == id) {
                Some(memory) => {
                    patch.apply(memory);
                    true
                }
                None => false,
            }
        };

        if updated {
            self.dirty.store(true, Ordering::SeqCst);
            self.save()?;
        }
        Ok(updated)
    }

    /// Remove a memory from the collection.
    ///
    /// The journal is append-only and keeps its record; only the snapshot
    /// and the in-memory view forget the entry. Returns `false` when the id
    /// is unknown.
    pub fn delete(&self, id: &MemoryId) -> Result<bool> {
        let deleted = {
            let mut memories = self.write_guard()?;
            let before = memories.len();
            memories.retain(|m| &m.id != id);
            memories.len() < before
        };

        if deleted {
            self.dirty.store(true, Ordering::SeqCst);
            self.save()?;
        }
        Ok(deleted)
    }

    /// Record an access: bump the counter and touch `last_accessed`.
    ///
    /// Returns `false` when the id is unknown.
    pub fn record_access(&self, id: &MemoryId) -> Result<bool> {
        let found = {
            let mut memories = self.write_guard()?;
            match memories.iter_mut().find(|m| &m.id == id) {
                Some(memory) => {
                    memory.access_count += 1;
                    memory.last_accessed = Utc::now();
                    true
                }
                None => false,
            }
        };

        if found {
            self.dirty.store(true, Ordering::SeqCst);
        }
        Ok(found)
    }

    // ==================== Tier views ====================

    /// Memories not yet consolidated, in collection order.
    pub fn short_term(&self) -> Result<Vec<Memory>> {
        Ok(self
            .read_guard()?
            .iter()
            .filter(|m| !m.consolidated)
            .cloned()
            .collect())
    }

    /// Consolidated memories, in collection order.
    pub fn long_term(&self) -> Result<Vec<Memory>> {
        Ok(self
            .read_guard()?
            .iter()
            .filter(|m| m.consolidated)
            .cloned()
            .collect())
    }

    /// The full collection, in order.
    pub fn all(&self) -> Result<Vec<Memory>> {
        Ok(self.read_guard()?.clone())
    }

    /// Number of stored memories.
    pub fn len(&self) -> Result<usize> {
        Ok(self.read_guard()?.len())
    }

    /// Whether the collection is empty.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.read_guard()?.is_empty())
    }

    // ==================== Consolidation ====================

    /// Promote every short-term memory older than the configured age.
    ///
    /// Sets `consolidated` and applies the one-time importance bump, capped
    /// at 100. Idempotent: the flag itself is the guard, so re-running
    /// before the next memory becomes eligible is a no-op. Requests a
    /// snapshot after the sweep. Returns the number promoted.
    pub fn consolidate(&self) -> Result<usize> {
        let now = Utc::now();
        let promoted = {
            let mut memories = self.write_guard()?;
            let mut promoted = 0usize;
            for memory in memories
                .iter_mut()
                .filter(|m| !m.consolidated && m.age(now) >= self.consolidation_age)
            {
                memory.consolidated = true;
                memory.importance = CONSOLIDATION_IMPORTANCE_CAP
                    .min(memory.importance + CONSOLIDATION_IMPORTANCE_BUMP);
                promoted += 1;
            }
            promoted
        };

        if promoted > 0 {
            debug!(promoted, "consolidation sweep promoted memories");
            self.dirty.store(true, Ordering::SeqCst);
        }
        self.save()?;
        Ok(promoted)
    }

    // ==================== Read-side views ====================

    /// Relevance-ranked search over the collection.
    pub fn search(&self, query: &str, filters: Option<&SearchFilters>) -> Result<Vec<SearchHit>> {
        Ok(search(&self.read_guard()?, query, filters))
    }

    /// Up to five loosely related memories, unranked.
    pub fn related(&self, id: &MemoryId) -> Result<Vec<Memory>> {
        Ok(related(&self.read_guard()?, id))
    }

    /// Aggregate statistics.
    pub fn stats(&self) -> Result<MemoryStats> {
        Ok(compute(&self.read_guard()?))
    }

    /// Deterministic reflection text over the last 24 hours.
    pub fn generate_reflection(&self) -> Result<String> {
        Ok(generate_reflection(&self.read_guard()?, Utc::now()))
    }

    // ==================== Export / import ====================

    /// Full pretty-printed serialization of the current collection.
    pub fn export(&self) -> Result<String> {
        let memories = self.read_guard()?;
        Ok(serde_json::to_string_pretty(&*memories)?)
    }

    /// Replace the entire collection from a serialized blob.
    ///
    /// All-or-nothing: any parse failure aborts and leaves the prior state
    /// untouched. Emotional weights are re-clamped on the way in so the
    /// stored invariant holds even for hand-edited blobs. Triggers an
    /// immediate snapshot write. Returns the imported count.
    pub fn import(&self, blob: &str) -> Result<usize> {
        let mut imported: Vec<Memory> = serde_json::from_str(blob)
            .map_err(|e| Error::import(format!("invalid memory collection: {}", e)))?;
        for memory in &mut imported {
            memory.emotional_weight = clamp_emotional_weight(memory.emotional_weight);
        }
        let count = imported.len();

        *self.write_guard()? = imported;
        self.dirty.store(true, Ordering::SeqCst);
        self.save()?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::types::MemoryType;
    use crate::persistence::FailingBackend;
    use pretty_assertions::assert_eq;

    fn strict_config() -> MemoryConfig {
        MemoryConfig::default().with_strict_persistence(true)
    }

    fn file_store(dir: &std::path::Path) -> MemoryStore {
        let config = strict_config().with_data_dir(dir);
        MemoryStore::open(&config).unwrap()
    }

    #[test]
    fn create_then_get_roundtrips() {
        let store = MemoryStore::in_memory();
        let created = store
            .create(Memory::new(
                "first swim of the year",
                35,
                vec!["lake".into()],
                MemoryType::Event,
            ))
            .unwrap();

        let fetched = store.get(&created.id).unwrap().unwrap();
        assert_eq!(fetched, created);
        assert!(store.get(&MemoryId::new()).unwrap().is_none());
    }

    #[test]
    fn update_merges_and_unknown_id_is_noop() {
        let store = MemoryStore::in_memory();
        let m = store
            .create(Memory::new("draft", 10, vec![], MemoryType::Thought))
            .unwrap();

        let updated = store
            .update(&m.id, MemoryPatch::new().content("final").emotional_weight(999))
            .unwrap();
        assert!(updated);

        let fetched = store.get(&m.id).unwrap().unwrap();
        assert_eq!(fetched.content, "final");
        assert_eq!(fetched.emotional_weight, 100);

        assert!(!store.update(&MemoryId::new(), MemoryPatch::new()).unwrap());
    }

    #[test]
    fn delete_removes_and_unknown_id_is_noop() {
        let store = MemoryStore::in_memory();
        let m = store
            .create(Memory::new("gone soon", 0, vec![], MemoryType::Event))
            .unwrap();

        assert!(store.delete(&m.id).unwrap());
        assert!(store.get(&m.id).unwrap().is_none());
        assert!(!store.delete(&m.id).unwrap());
    }

    #[test]
    fn record_access_bumps_count_and_touch() {
        let store = MemoryStore::in_memory();
        let m = store
            .create(Memory::new("seen often", 0, vec![], MemoryType::Event))
            .unwrap();

        assert!(store.record_access(&m.id).unwrap());
        assert!(store.record_access(&m.id).unwrap());

        let fetched = store.get(&m.id).unwrap().unwrap();
        assert_eq!(fetched.access_count, 2);
        assert!(fetched.last_accessed >= m.last_accessed);

        assert!(!store.record_access(&MemoryId::new()).unwrap());
    }

    #[test]
    fn tier_views_split_on_consolidated_flag() {
        let store = MemoryStore::in_memory();
        store
            .create(Memory::new("fresh", 0, vec![], MemoryType::Event))
            .unwrap();
        let mut old = Memory::new("aged", 0, vec![], MemoryType::Event);
        old.timestamp = Utc::now() - chrono::Duration::hours(2);
        store.create(old).unwrap();
        store.consolidate().unwrap();

        assert_eq!(store.short_term().unwrap().len(), 1);
        assert_eq!(store.long_term().unwrap().len(), 1);
        assert_eq!(store.len().unwrap(), 2);
    }

    #[test]
    fn create_reclamps_hand_built_weights() {
        let store = MemoryStore::in_memory();
        let mut m = Memory::new("hand built", 0, vec![], MemoryType::Event);
        m.emotional_weight = 500;

        let stored = store.create(m).unwrap();
        assert_eq!(stored.emotional_weight, 100);
        let fetched = store.get(&stored.id).unwrap().unwrap();
        assert_eq!(fetched.emotional_weight, 100);

        let mut n = Memory::new("other way", 0, vec![], MemoryType::Event);
        n.emotional_weight = -500;
        assert_eq!(store.create(n).unwrap().emotional_weight, -100);
    }

    #[test]
    fn create_resets_store_owned_fields() {
        let store = MemoryStore::in_memory();
        let mut m = Memory::new("preloaded", 0, vec![], MemoryType::Event);
        m.tags = vec!["dup".into(), "dup".into()];
        m.consolidated = true;
        m.access_count = 7;
        m.related = vec![MemoryId::new()];

        let stored = store.create(m).unwrap();
        assert!(!stored.consolidated);
        assert_eq!(stored.access_count, 0);
        assert!(stored.related.is_empty());
        assert_eq!(stored.tags, vec!["dup".to_string()]);
    }

    #[test]
    fn consolidation_promotes_only_old_enough_memories() {
        let store = MemoryStore::in_memory();

        let mut old = Memory::new("old enough", 30, vec!["t".into()], MemoryType::Event);
        old.timestamp = Utc::now() - chrono::Duration::minutes(61);
        // importance = 30 + 5 = 35
        let old = store.create(old).unwrap();

        let fresh = store
            .create(Memory::new("too fresh", 30, vec![], MemoryType::Event))
            .unwrap();

        let promoted = store.consolidate().unwrap();
        assert_eq!(promoted, 1);

        let old_after = store.get(&old.id).unwrap().unwrap();
        assert!(old_after.consolidated);
        assert_eq!(old_after.importance, 45);

        let fresh_after = store.get(&fresh.id).unwrap().unwrap();
        assert!(!fresh_after.consolidated);
        assert_eq!(fresh_after.importance, 30);
    }

    #[test]
    fn consolidation_bump_is_applied_once_and_capped() {
        let store = MemoryStore::in_memory();
        let mut heavy = Memory::new("heavy", 100, vec![], MemoryType::Event);
        heavy.timestamp = Utc::now() - chrono::Duration::hours(2);
        let heavy = store.create(heavy).unwrap();
        assert_eq!(heavy.importance, 100);

        assert_eq!(store.consolidate().unwrap(), 1);
        let after_first = store.get(&heavy.id).unwrap().unwrap();
        assert_eq!(after_first.importance, 100); // capped

        // Idempotent: second sweep finds nothing to promote.
        assert_eq!(store.consolidate().unwrap(), 0);
        let after_second = store.get(&heavy.id).unwrap().unwrap();
        assert_eq!(after_second, after_first);
    }

    #[test]
    fn scenario_c_sixty_one_minute_old_memory() {
        let store = MemoryStore::in_memory();
        let mut m = Memory::new("c", 40, vec![], MemoryType::Event);
        m.timestamp = Utc::now() - chrono::Duration::minutes(61);
        assert_eq!(m.importance, 40);
        let m = store.create(m).unwrap();

        store.consolidate().unwrap();

        let after = store.get(&m.id).unwrap().unwrap();
        assert!(after.consolidated);
        assert_eq!(after.importance, 50);
    }

    #[test]
    fn scenario_a_search_through_the_store() {
        let store = MemoryStore::in_memory();
        store
            .create(
                Memory::new(
                    "hello world",
                    50,
                    vec!["greeting".into()],
                    MemoryType::Conversation,
                ),
            )
            .unwrap();

        let hits = store.search("hello", None).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(
            hits[0].match_type,
            Some(crate::memory::search::MatchType::Content)
        );
        assert!(hits[0].relevance >= 50.0);
    }

    #[test]
    fn export_import_reproduces_the_collection() {
        let store = MemoryStore::in_memory();
        store
            .create(
                Memory::new("a", 10, vec!["x".into()], MemoryType::Event).with_context("ctx"),
            )
            .unwrap();
        store
            .create(Memory::new("b", -10, vec![], MemoryType::Dream))
            .unwrap();
        let before = store.all().unwrap();

        let blob = store.export().unwrap();

        let other = MemoryStore::in_memory();
        let count = other.import(&blob).unwrap();
        assert_eq!(count, 2);
        assert_eq!(other.all().unwrap(), before);
    }

    #[test]
    fn failed_import_leaves_state_untouched() {
        let store = MemoryStore::in_memory();
        let kept = store
            .create(Memory::new("keep me", 0, vec![], MemoryType::Event))
            .unwrap();

        let err = store.import("not json at all").unwrap_err();
        assert!(matches!(err, Error::Import(_)));
        assert_eq!(store.all().unwrap(), vec![kept]);
    }

    #[test]
    fn import_reclamps_out_of_range_weights() {
        let store = MemoryStore::in_memory();
        let m = Memory::new("edited by hand", 0, vec![], MemoryType::Event);
        let mut value = serde_json::to_value(vec![m]).unwrap();
        value[0]["emotional_weight"] = serde_json::json!(12345);

        store.import(&value.to_string()).unwrap();
        let all = store.all().unwrap();
        assert_eq!(all[0].emotional_weight, 100);
    }

    #[test]
    fn load_prefers_snapshot_over_journal() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = file_store(dir.path());
            store
                .create(Memory::new("journaled", 0, vec![], MemoryType::Event))
                .unwrap();
            let doomed = store
                .create(Memory::new("deleted later", 0, vec![], MemoryType::Event))
                .unwrap();
            // Delete rewrites the snapshot; the journal keeps both records.
            store.delete(&doomed.id).unwrap();
        }

        let reopened = file_store(dir.path());
        let all = reopened.all().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].content, "journaled");
    }

    #[test]
    fn load_replays_journal_when_snapshot_is_missing() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = file_store(dir.path());
            store
                .create(Memory::new("only journaled", 5, vec![], MemoryType::Event))
                .unwrap();
            // No save, no snapshot-triggering mutation.
        }
        assert!(!dir.path().join(crate::persistence::SNAPSHOT_FILE).exists());

        let reopened = file_store(dir.path());
        let all = reopened.all().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].content, "only journaled");
    }

    #[test]
    fn load_starts_empty_without_any_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = file_store(dir.path());
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn save_if_dirty_skips_clean_stores() {
        let dir = tempfile::tempdir().unwrap();
        let store = file_store(dir.path());
        assert!(!store.save_if_dirty().unwrap());

        store
            .create(Memory::new("dirty now", 0, vec![], MemoryType::Event))
            .unwrap();
        assert!(store.is_dirty());
        assert!(store.save_if_dirty().unwrap());
        assert!(!store.is_dirty());
        assert!(!store.save_if_dirty().unwrap());
    }

    #[test]
    fn soft_mode_swallows_persistence_failures() {
        let store =
            MemoryStore::with_backend(Arc::new(FailingBackend), &MemoryConfig::default());
        let m = store
            .create(Memory::new("still stored", 0, vec![], MemoryType::Event))
            .unwrap();
        assert_eq!(store.get(&m.id).unwrap().unwrap().content, "still stored");
        // Snapshot-triggering mutations also survive.
        assert!(store.delete(&m.id).unwrap());
    }

    #[test]
    fn soft_failed_snapshot_keeps_store_dirty() {
        let store =
            MemoryStore::with_backend(Arc::new(FailingBackend), &MemoryConfig::default());
        let m = store
            .create(Memory::new("never reaches disk", 0, vec![], MemoryType::Event))
            .unwrap();
        assert!(store.is_dirty());

        // Delete soft-fails its snapshot; nothing reached the backend, so
        // the store must still report unsaved mutations.
        assert!(store.delete(&m.id).unwrap());
        assert!(store.is_dirty());

        // The background timer path also leaves the flag set for a retry.
        assert!(!store.save_if_dirty().unwrap());
        assert!(store.is_dirty());
    }

    #[test]
    fn strict_mode_surfaces_persistence_failures() {
        let store = MemoryStore::with_backend(Arc::new(FailingBackend), &strict_config());
        let err = store
            .create(Memory::new("doomed write", 0, vec![], MemoryType::Event))
            .unwrap_err();
        assert!(matches!(err, Error::Persistence(_)));
        // The in-memory append still happened before the journal attempt.
        assert_eq!(store.len().unwrap(), 1);
    }
}
