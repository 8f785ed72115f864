//! Storage error types.

use thiserror::Error;

/// Errors from loading, saving, or exporting snapshots.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying file system failure.
    #[error("io error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The snapshot document could not be produced or parsed.
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// A restore candidate failed the core invariant checks.
    #[error("snapshot rejected: {}", violations.join("; "))]
    Corrupt { violations: Vec<String> },

    /// No backup exists at the requested path.
    #[error("backup not found: {0}")]
    BackupNotFound(String),
}

impl StoreError {
    /// Wraps an io::Error with the path it happened on.
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Convenience alias for storage results.
pub type StoreResult<T> = Result<T, StoreError>;
