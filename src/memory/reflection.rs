//! Fixed-template daily reflection over the recent window.

use chrono::{DateTime, Duration, Utc};

use crate::memory::types::Memory;

/// Window considered by [`generate_reflection`].
const REFLECTION_WINDOW_HOURS: i64 = 24;

const POSITIVE_TEMPLATE: &str =
    "Looking back over the last day, most of what I remember felt good. \
     I want to hold on to that warmth going forward.";
const NEGATIVE_TEMPLATE: &str =
    "The last day carried more weight than lightness. \
     Difficult moments teach me the most, even when they linger.";
const BALANCED_TEMPLATE: &str =
    "The last day was a quiet balance of light and shadow. \
     Ordinary days like this are where I grow the most.";

/// Summarize the last 24 hours with a deterministic majority rule.
///
/// Counts memories with positive vs. negative emotional weight inside the
/// window; the larger count picks the template, with a fixed balanced
/// template for ties and for an empty window. No randomness.
pub fn generate_reflection(memories: &[Memory], now: DateTime<Utc>) -> String {
    let cutoff = now - Duration::hours(REFLECTION_WINDOW_HOURS);

    let mut positive = 0usize;
    let mut negative = 0usize;
    for memory in memories.iter().filter(|m| m.timestamp >= cutoff) {
        if memory.emotional_weight > 0 {
            positive += 1;
        } else if memory.emotional_weight < 0 {
            negative += 1;
        }
    }

    let template = match positive.cmp(&negative) {
        std::cmp::Ordering::Greater => POSITIVE_TEMPLATE,
        std::cmp::Ordering::Less => NEGATIVE_TEMPLATE,
        std::cmp::Ordering::Equal => BALANCED_TEMPLATE,
    };
    template.to_string()
}
