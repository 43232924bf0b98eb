//! Error types for the permissions module.

use thiserror::Error;

use crate::guard::Operation;

/// Errors that can occur during permission checks.
#[derive(Debug, Error)]
pub enum PermsError {
    /// The guard denied the operation.
    #[error("permission denied: {0} access")]
    PermissionDenied(Operation),

    /// Stored metadata cannot be decoded into a policy record.
    #[error("policy corrupt: {0}")]
    PolicyCorrupt(String),
}

/// Result type for permission operations.
pub type Result<T> = std::result::Result<T, PermsError>;
