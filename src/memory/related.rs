//! Similarity lookup backing "related memories" views.
//!
//! Deliberately a loose net: candidates qualify through any one of three
//! OR-combined signals and are returned unranked, in collection order.
//! Callers wanting a ranked view should go through
//! [`search`](crate::memory::search::search) instead.

use crate::memory::types::{Memory, MemoryId};

/// Maximum number of related memories returned.
pub const RELATED_LIMIT: usize = 5;

/// Emotional-weight distance below which two memories count as similar.
const WEIGHT_SIMILARITY_THRESHOLD: i32 = 20;

/// Find up to [`RELATED_LIMIT`] memories related to `id`.
///
/// A candidate qualifies when it shares at least one tag with the target,
/// its emotional weight is within 20 of the target's, or it has the same
/// memory type. The target itself is never included. Returns the first
/// qualifying matches in collection order — not the best ones.
pub fn related(memories: &[Memory], id: &MemoryId) -> Vec<Memory> {
    let Some(target) = memories.iter().find(|m| &m.id == id) else {
        return Vec::new();
    };

    memories
        .iter()
        .filter(|m| &m.id != id && is_related(target, m))
        .take(RELATED_LIMIT)
        .cloned()
        .collect()
}

fn is_related(target: &Memory, candidate: &Memory) -> bool {
    let shares_tag = candidate.tags.iter().any(|t| target.tags.contains(t));
    let similar_weight =
        (candidate.emotional_weight - target.emotional_weight).abs() < WEIGHT_SIMILARITY_THRESHOLD;
    let same_type = candidate.memory_type == target.memory_type;

    shares_tag || similar_weight || same_type
}
