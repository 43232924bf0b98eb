//! Error types for the store module.

use buffalo_core::ObjectId;
use thiserror::Error;

use crate::traits::MergeError;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Object not found.
    #[error("object not found: {0}")]
    NotFound(ObjectId),

    /// An object with this id already exists.
    #[error("object already exists: {0}")]
    AlreadyExists(ObjectId),

    /// The metadata merge function refused the update. Nothing was written.
    #[error("metadata update rejected: {0}")]
    MergeRejected(MergeError),

    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Invalid data in storage.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// The backend failed outside of a query (poisoned lock, dead worker).
    #[error("backend error: {0}")]
    Backend(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
