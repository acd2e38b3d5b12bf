//! Error types for mnemo-core.

use thiserror::Error;

/// Result type alias using mnemo-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during memory operations.
///
/// By default the store swallows persistence failures — the in-memory
/// collection stays authoritative and the host application is never
/// interrupted. These variants surface when strict persistence is enabled
/// or when the caller invokes an explicitly fallible operation such as
/// [`import`](crate::MemoryStore::import).
#[derive(Error, Debug)]
pub enum Error {
    /// Snapshot or journal I/O failed
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Underlying filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Import blob could not be parsed; prior state is left untouched
    #[error("Import error: {0}")]
    Import(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a persistence error.
    pub fn persistence(message: impl Into<String>) -> Self {
        Self::Persistence(message.into())
    }

    /// Create an import error.
    pub fn import(message: impl Into<String>) -> Self {
        Self::Import(message.into())
    }
}
