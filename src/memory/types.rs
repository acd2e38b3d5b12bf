//! Core entity types for the memory system.

use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Emotional weight is clamped to this range on every write path.
pub const EMOTIONAL_WEIGHT_MIN: i32 = -100;
/// Emotional weight is clamped to this range on every write path.
pub const EMOTIONAL_WEIGHT_MAX: i32 = 100;

/// Importance contribution per semantic tag.
const IMPORTANCE_PER_TAG: u32 = 5;
/// Importance contribution for having a context string.
const IMPORTANCE_CONTEXT_BONUS: u32 = 10;
/// One-time importance bump applied at consolidation, capped at 100.
pub(crate) const CONSOLIDATION_IMPORTANCE_BUMP: u32 = 10;
/// Cap applied to the consolidation bump (not to creation-time importance).
pub(crate) const CONSOLIDATION_IMPORTANCE_CAP: u32 = 100;

/// Unique identifier for memories.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemoryId(pub Uuid);

impl MemoryId {
    /// Generate a fresh id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse an id from its string form.
    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for MemoryId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MemoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kinds of experiential records the store accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryType {
    Conversation,
    Reflection,
    Event,
    Learning,
    Dream,
    Thought,
}

impl MemoryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemoryType::Conversation => "conversation",
            MemoryType::Reflection => "reflection",
            MemoryType::Event => "event",
            MemoryType::Learning => "learning",
            MemoryType::Dream => "dream",
            MemoryType::Thought => "thought",
        }
    }

    pub fn all() -> &'static [MemoryType] {
        &[
            MemoryType::Conversation,
            MemoryType::Reflection,
            MemoryType::Event,
            MemoryType::Learning,
            MemoryType::Dream,
            MemoryType::Thought,
        ]
    }
}

impl fmt::Display for MemoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single experiential record.
///
/// Invariants maintained by the store:
/// - `emotional_weight` stays within [-100, 100]
/// - `consolidated` transitions false → true only
/// - `access_count` only increases
/// - `importance` is bumped once at consolidation and never recomputed
///   otherwise
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Memory {
    pub id: MemoryId,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub emotional_weight: i32,
    pub tags: Vec<String>,
    pub access_count: u64,
    pub last_accessed: DateTime<Utc>,
    pub memory_type: MemoryType,
    #[serde(default)]
    pub context: Option<String>,
    /// Never auto-maintained; related memories are computed on demand.
    #[serde(default)]
    pub related: Vec<MemoryId>,
    pub importance: u32,
    pub consolidated: bool,
}

impl Memory {
    /// Build a new short-term memory.
    ///
    /// Clamps the emotional weight, deduplicates tags (first occurrence
    /// wins) and computes the creation-time importance.
    pub fn new(
        content: impl Into<String>,
        emotional_weight: i32,
        tags: Vec<String>,
        memory_type: MemoryType,
    ) -> Self {
        let now = Utc::now();
        let weight = clamp_emotional_weight(emotional_weight);
        let tags = dedup_tags(tags);
        let importance = initial_importance(weight, &tags, None);

        Self {
            id: MemoryId::new(),
            content: content.into(),
            timestamp: now,
            emotional_weight: weight,
            tags,
            access_count: 0,
            last_accessed: now,
            memory_type,
            context: None,
            related: Vec::new(),
            importance,
            consolidated: false,
        }
    }

    /// Attach a context string, recomputing the creation-time importance.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self.importance =
            initial_importance(self.emotional_weight, &self.tags, self.context.as_deref());
        self
    }

    /// Re-apply the write-time invariants before the record enters the
    /// collection.
    ///
    /// `Memory` fields are public, so a caller can hand the store an
    /// entity with an out-of-range weight or pre-set store-owned fields.
    /// Clamps the weight, re-deduplicates tags, and resets `consolidated`,
    /// `access_count` and `related` so every created memory starts in the
    /// short-term tier with clean counters.
    pub(crate) fn sanitized(mut self) -> Self {
        self.emotional_weight = clamp_emotional_weight(self.emotional_weight);
        self.tags = dedup_tags(self.tags);
        self.consolidated = false;
        self.access_count = 0;
        self.related = Vec::new();
        self
    }

    /// Age of this memory relative to `now`.
    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.timestamp
    }

    /// Whether this memory sits in the short-term tier.
    pub fn is_short_term(&self) -> bool {
        !self.consolidated
    }
}

/// Partial update applied by [`MemoryStore::update`](crate::MemoryStore::update).
///
/// The patch deliberately has no way to touch `id`, `timestamp`,
/// `access_count` or `consolidated` — those fields are owned by the store's
/// own operations, which keeps the monotonic invariants intact by
/// construction.
#[derive(Debug, Clone, Default)]
pub struct MemoryPatch {
    pub content: Option<String>,
    pub emotional_weight: Option<i32>,
    pub tags: Option<Vec<String>>,
    pub memory_type: Option<MemoryType>,
    /// `Some(None)` clears the context, `Some(Some(_))` replaces it.
    pub context: Option<Option<String>>,
    pub importance: Option<u32>,
}

impl MemoryPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn emotional_weight(mut self, weight: i32) -> Self {
        self.emotional_weight = Some(weight);
        self
    }

    pub fn tags(mut self, tags: Vec<String>) -> Self {
        self.tags = Some(tags);
        self
    }

    pub fn memory_type(mut self, memory_type: MemoryType) -> Self {
        self.memory_type = Some(memory_type);
        self
    }

    pub fn context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(Some(context.into()));
        self
    }

    pub fn clear_context(mut self) -> Self {
        self.context = Some(None);
        self
    }

    pub fn importance(mut self, importance: u32) -> Self {
        self.importance = Some(importance);
        self
    }

    /// Shallow-merge this patch into `memory`, re-clamping and
    /// re-deduplicating where the invariants require it.
    pub(crate) fn apply(self, memory: &mut Memory) {
        if let Some(content) = self.content {
            memory.content = content;
        }
        if let Some(weight) = self.emotional_weight {
            memory.emotional_weight = clamp_emotional_weight(weight);
        }
        if let Some(tags) = self.tags {
            memory.tags = dedup_tags(tags);
        }
        if let Some(memory_type) = self.memory_type {
            memory.memory_type = memory_type;
        }
        if let Some(context) = self.context {
            memory.context = context;
        }
        if let Some(importance) = self.importance {
            memory.importance = importance;
        }
    }
}

/// Clamp a raw emotional weight into the stored range.
pub fn clamp_emotional_weight(weight: i32) -> i32 {
    weight.clamp(EMOTIONAL_WEIGHT_MIN, EMOTIONAL_WEIGHT_MAX)
}

/// Creation-time importance: `|weight| + 5 * tag_count + 10 if context`.
///
/// May exceed 100; only the consolidation bump is capped.
pub fn initial_importance(weight: i32, tags: &[String], context: Option<&str>) -> u32 {
    let mut importance = weight.unsigned_abs() + IMPORTANCE_PER_TAG * tags.len() as u32;
    if context.is_some() {
        importance += IMPORTANCE_CONTEXT_BONUS;
    }
    importance
}

fn dedup_tags(tags: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    tags.into_iter().filter(|t| seen.insert(t.clone())).collect()
}
