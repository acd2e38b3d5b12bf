//! Tiered experiential memory system.
//!
//! Memories enter the short-term tier at creation and are promoted to the
//! long-term tier by an age-based consolidation sweep:
//!
//! - **Short-term tier**: everything newly recorded
//! - **Long-term tier**: memories past the consolidation age, with a
//!   one-time importance bump
//!
//! ## Example
//!
//! ```rust,ignore
//! use mnemo_core::{Memory, MemoryStore, MemoryType};
//!
//! let store = MemoryStore::in_memory();
//!
//! let memory = store.create(
//!     Memory::new("first thunderstorm of spring", 40,
//!                 vec!["weather".into()], MemoryType::Event),
//! )?;
//!
//! let hits = store.search("thunderstorm", None)?;
//! let similar = store.related(&memory.id)?;
//! ```

mod related;
mod reflection;
mod search;
mod stats;
mod store;
mod types;

pub use related::{related, RELATED_LIMIT};
pub use reflection::generate_reflection;
pub use search::{search, MatchType, SearchFilters, SearchHit};
pub use stats::{compute as compute_stats, MemoryStats};
pub use store::MemoryStore;
pub use types::{
    clamp_emotional_weight, initial_importance, Memory, MemoryId, MemoryPatch, MemoryType,
    EMOTIONAL_WEIGHT_MAX, EMOTIONAL_WEIGHT_MIN,
};
