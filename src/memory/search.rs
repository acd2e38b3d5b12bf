//! Multi-factor relevance scoring and filter evaluation.
//!
//! Filters are hard excludes evaluated before any scoring: a memory that
//! fails one active filter is dropped regardless of how well its text
//! matches. Scoring is additive over textual matches, access frequency and
//! emotional intensity.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};

use crate::memory::types::{Memory, MemoryType};

/// Score for a case-insensitive content substring match.
const CONTENT_MATCH_SCORE: f64 = 50.0;
/// Score when any tag contains the query.
const TAG_MATCH_SCORE: f64 = 30.0;
/// Score when the context contains the query.
const CONTEXT_MATCH_SCORE: f64 = 20.0;
/// Cap on the access-frequency bonus.
const FREQUENCY_BONUS_CAP: f64 = 20.0;
/// Frequency bonus per recorded access.
const FREQUENCY_BONUS_PER_ACCESS: f64 = 2.0;
/// Weight applied to `|emotional_weight|`.
const EMOTIONAL_INTENSITY_WEIGHT: f64 = 0.3;

/// Which textual field produced the match.
///
/// A context-only match contributes to the score but leaves the match type
/// unset; that asymmetry matches the observed behavior of the source system
/// and is kept until a product decision says otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchType {
    Content,
    Tag,
}

/// One scored search result.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub memory: Memory,
    pub relevance: f64,
    pub match_type: Option<MatchType>,
}

/// Optional hard filters, AND-combined.
#[derive(Debug, Clone, Default)]
pub struct SearchFilters {
    /// Inclusive `[min, max]` bounds on emotional weight.
    pub emotional_range: Option<(i32, i32)>,
    /// Inclusive `[start, end]` bounds on the creation timestamp.
    pub date_range: Option<(DateTime<Utc>, DateTime<Utc>)>,
    /// Keep memories carrying at least one of these tags.
    pub tags: Option<Vec<String>>,
    /// Keep memories whose type is in this list.
    pub types: Option<Vec<MemoryType>>,
    /// Inclusive `[min, max]` bounds on importance.
    pub importance_range: Option<(u32, u32)>,
}

impl SearchFilters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emotional_range(mut self, min: i32, max: i32) -> Self {
        self.emotional_range = Some((min, max));
        self
    }

    pub fn date_range(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.date_range = Some((start, end));
        self
    }

    pub fn tags(mut self, tags: Vec<String>) -> Self {
        self.tags = Some(tags);
        self
    }

    pub fn types(mut self, types: Vec<MemoryType>) -> Self {
        self.types = Some(types);
        self
    }

    pub fn importance_range(mut self, min: u32, max: u32) -> Self {
        self.importance_range = Some((min, max));
        self
    }

    /// True when `memory` passes every active filter.
    pub fn matches(&self, memory: &Memory) -> bool {
        if let Some((min, max)) = self.emotional_range {
            if memory.emotional_weight < min || memory.emotional_weight > max {
                return false;
            }
        }
        if let Some((start, end)) = self.date_range {
            if memory.timestamp < start || memory.timestamp > end {
                return false;
            }
        }
        if let Some(ref tags) = self.tags {
            if !tags.iter().any(|t| memory.tags.contains(t)) {
                return false;
            }
        }
        if let Some(ref types) = self.types {
            if !types.contains(&memory.memory_type) {
                return false;
            }
        }
        if let Some((min, max)) = self.importance_range {
            if memory.importance < min || memory.importance > max {
                return false;
            }
        }
        true
    }
}

/// Search the collection, returning hits sorted by relevance descending.
///
/// Ties break on recency, most recent first. Hits whose relevance is
/// zero or negative are excluded.
pub fn search(memories: &[Memory], query: &str, filters: Option<&SearchFilters>) -> Vec<SearchHit> {
    let needle = query.to_lowercase();

    let mut hits: Vec<SearchHit> = memories
        .iter()
        .filter(|m| filters.map_or(true, |f| f.matches(m)))
        .filter_map(|m| {
            let (relevance, match_type) = score(m, &needle);
            if relevance <= 0.0 {
                None
            } else {
                Some(SearchHit {
                    memory: m.clone(),
                    relevance,
                    match_type,
                })
            }
        })
        .collect();

    hits.sort_by(|a, b| {
        b.relevance
            .partial_cmp(&a.relevance)
            .unwrap_or(Ordering::Equal)
            .then_with(|| b.memory.timestamp.cmp(&a.memory.timestamp))
    });

    hits
}

/// Score one memory against a lowercased query.
///
/// Check order is fixed: content, then tags, then context. A tag match
/// overwrites a content match type because it is evaluated after it.
fn score(memory: &Memory, needle: &str) -> (f64, Option<MatchType>) {
    let mut relevance = 0.0;
    let mut match_type = None;

    if memory.content.to_lowercase().contains(needle) {
        relevance += CONTENT_MATCH_SCORE;
        match_type = Some(MatchType::Content);
    }

    if memory.tags.iter().any(|t| t.to_lowercase().contains(needle)) {
        relevance += TAG_MATCH_SCORE;
        match_type = Some(MatchType::Tag);
    }

    if let Some(ref context) = memory.context {
        if context.to_lowercase().contains(needle) {
            relevance += CONTEXT_MATCH_SCORE;
        }
    }

    relevance +=
        (memory.access_count as f64 * FREQUENCY_BONUS_PER_ACCESS).min(FREQUENCY_BONUS_CAP);
    relevance += memory.emotional_weight.unsigned_abs() as f64 * EMOTIONAL_INTENSITY_WEIGHT;

    (relevance, match_type)
}
