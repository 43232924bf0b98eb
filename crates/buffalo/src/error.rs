//! Error types for the file manager.

use buffalo_core::{CoreError, ObjectId};
use buffalo_perms::{Operation, PermsError};
use buffalo_store::StoreError;
use thiserror::Error;

/// Message shown to callers in place of internal failures.
pub const PUBLIC_INTERNAL_MESSAGE: &str = "application error";

/// Errors that can occur during file operations.
#[derive(Debug, Error)]
pub enum FileError {
    /// The request was malformed. Nothing was written.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// No object with this id exists.
    #[error("file not found: {0}")]
    NotFound(ObjectId),

    /// The caller's identity and claims do not satisfy the stored policy.
    #[error("unauthorized: {0} access denied")]
    Unauthorized(Operation),

    /// The stored policy could not be decoded. Access fails closed.
    #[error("policy corrupt: {0}")]
    PolicyCorrupt(String),

    /// The blob store failed.
    #[error("storage failure: {0}")]
    StorageFailure(#[source] StoreError),
}

impl FileError {
    /// Whether this error hides internal detail from the caller.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            FileError::PolicyCorrupt(_) | FileError::StorageFailure(_)
        )
    }

    /// Message safe to return to the caller.
    pub fn public_message(&self) -> String {
        if self.is_internal() {
            PUBLIC_INTERNAL_MESSAGE.to_string()
        } else {
            self.to_string()
        }
    }
}

impl From<StoreError> for FileError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => FileError::NotFound(id),
            // A merge function rejects with a FileError; hand it back unchanged.
            StoreError::MergeRejected(rejection) => match rejection.downcast::<FileError>() {
                Ok(file_error) => *file_error,
                Err(other) => FileError::StorageFailure(StoreError::MergeRejected(other)),
            },
            other => FileError::StorageFailure(other),
        }
    }
}

impl From<PermsError> for FileError {
    fn from(err: PermsError) -> Self {
        match err {
            PermsError::PermissionDenied(operation) => FileError::Unauthorized(operation),
            PermsError::PolicyCorrupt(reason) => FileError::PolicyCorrupt(reason),
        }
    }
}

impl From<CoreError> for FileError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::PolicyCorrupt(reason) => FileError::PolicyCorrupt(reason),
            other => FileError::InvalidInput(other.to_string()),
        }
    }
}

/// Result type for file operations.
pub type Result<T> = std::result::Result<T, FileError>;
