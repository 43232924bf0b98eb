//! Error types for Buffalo Core.

use thiserror::Error;

/// Core errors raised while building or decoding policies.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Claims level access requires a non-empty claim tree")]
    MissingClaimTree,

    #[error("unknown access level: {0}")]
    UnknownAccessLevel(String),

    #[error("invalid object id: {0}")]
    InvalidObjectId(String),

    /// Stored metadata violates the data model and must not be trusted.
    #[error("policy corrupt: {0}")]
    PolicyCorrupt(String),

    #[error("encoding error: {0}")]
    EncodingError(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
