//! Aggregate statistics over the memory collection.

use std::collections::HashMap;

use crate::memory::types::{Memory, MemoryType};

/// Number of top tags reported.
const TOP_TAG_LIMIT: usize = 10;

/// Aggregate counts and frequencies over the collection.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryStats {
    pub total: usize,
    pub short_term: usize,
    pub long_term: usize,
    /// Mean emotional weight; `0.0` for an empty collection.
    pub mean_emotional_weight: f64,
    /// Up to ten most frequent tags with their occurrence counts, most
    /// frequent first. Equal counts order alphabetically.
    pub top_tags: Vec<(String, usize)>,
    pub counts_by_type: HashMap<MemoryType, usize>,
}

/// Fold the collection into a [`MemoryStats`].
pub fn compute(memories: &[Memory]) -> MemoryStats {
    let total = memories.len();
    let long_term = memories.iter().filter(|m| m.consolidated).count();
    let short_term = total - long_term;

    let mean_emotional_weight = if total == 0 {
        0.0
    } else {
        memories.iter().map(|m| m.emotional_weight as f64).sum::<f64>() / total as f64
    };

    let mut tag_counts: HashMap<&str, usize> = HashMap::new();
    for memory in memories {
        for tag in &memory.tags {
            *tag_counts.entry(tag.as_str()).or_insert(0) += 1;
        }
    }
    let mut top_tags: Vec<(String, usize)> = tag_counts
        .into_iter()
        .map(|(tag, count)| (tag.to_string(), count))
        .collect();
    top_tags.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    top_tags.truncate(TOP_TAG_LIMIT);

    let mut counts_by_type: HashMap<MemoryType, usize> = HashMap::new();
    for memory in memories {
        *counts_by_type.entry(memory.memory_type).or_insert(0) += 1;
    }

    MemoryStats {
        total,
        short_term,
        long_term,
        mean_emotional_weight,
        top_tags,
        counts_by_type,
    }
}
