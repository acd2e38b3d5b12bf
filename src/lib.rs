//! # mnemo-core
//!
//! A tiered experiential memory store: discrete records carry an emotional
//! weight, semantic tags and a computed importance, age from a short-term
//! into a long-term tier, and persist through a snapshot plus an
//! append-only creation journal.
//!
//! ## Core Components
//!
//! - **MemoryStore**: authoritative in-memory collection with CRUD, tier
//!   views and access tracking
//! - **Search**: multi-factor relevance scoring with hard filters
//! - **Scheduler**: background snapshot and consolidation timers
//! - **Persistence**: snapshot + journal durability behind a backend trait
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use mnemo_core::{Memory, MemoryConfig, MemoryStore, MemoryType, Scheduler};
//!
//! let config = MemoryConfig::default().with_data_dir("./memory_data");
//! let store = Arc::new(MemoryStore::open(&config)?);
//! let scheduler = Scheduler::spawn(store.clone(), &config);
//!
//! store.create(Memory::new(
//!     "talked about the sea",
//!     35,
//!     vec!["conversation".into()],
//!     MemoryType::Conversation,
//! ))?;
//!
//! // ... on teardown:
//! scheduler.shutdown().await?;
//! ```

pub mod config;
pub mod error;
pub mod memory;
pub mod persistence;
pub mod scheduler;

// Re-exports for convenience
pub use config::MemoryConfig;
pub use error::{Error, Result};
pub use memory::{
    MatchType, Memory, MemoryId, MemoryPatch, MemoryStats, MemoryStore, MemoryType,
    SearchFilters, SearchHit,
};
pub use persistence::{FileBackend, NullBackend, PersistenceBackend};
pub use scheduler::Scheduler;
