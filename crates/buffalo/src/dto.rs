//! Request and response types for file operations.

use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use buffalo_core::{AccessLevel, AccessPolicy, ClaimTree, CoreError, Metadata, ObjectId};
use buffalo_store::{read_to_bytes, DataStream, StoreError};

use crate::error::{FileError, Result};

/// A file to upload.
#[derive(Debug, Clone)]
pub struct UploadFile {
    /// Client-supplied filename, stored as metadata.
    pub filename: Option<String>,
    /// MIME type. Falls back to the manager's default when absent.
    pub content_type: Option<String>,
    pub data: Bytes,
    /// Initial read policy. Defaults to `UserOwned`.
    pub read_policy: Option<AccessPolicy>,
    /// Initial write policy. Defaults to `UserOwned`.
    pub write_policy: Option<AccessPolicy>,
}

impl UploadFile {
    pub fn new(filename: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            filename: Some(filename.into()),
            content_type: None,
            data: data.into(),
            read_policy: None,
            write_policy: None,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Override the initial policies.
    pub fn with_policies(mut self, read: AccessPolicy, write: AccessPolicy) -> Self {
        self.read_policy = Some(read);
        self.write_policy = Some(write);
        self
    }

    /// Content length in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }
}

/// Result of a successful upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedFile {
    pub id: ObjectId,
    pub filename: Option<String>,
    pub content_type: String,
    /// Identity of the uploader; `None` for anonymous uploads.
    pub uploaded_by: Option<String>,
    pub read_policy: AccessPolicy,
    pub write_policy: AccessPolicy,
    /// Unix milliseconds.
    pub created_at: i64,
    /// URI returned by the store.
    pub resource_uri: String,
}

/// A retrieved file: content stream plus what is known about it.
pub struct FileData {
    pub id: ObjectId,
    pub content_type: String,
    pub filename: Option<String>,
    pub metadata: Metadata,
    pub data: DataStream,
}

impl FileData {
    /// Name to offer when the file is downloaded.
    ///
    /// Uses the stored filename, else `<id>.<mime subtype>`, else `<id>`.
    pub fn download_name(&self) -> String {
        if let Some(filename) = &self.filename {
            return filename.clone();
        }

        let subtype = self
            .content_type
            .split(';')
            .next()
            .and_then(|essence| essence.split_once('/'))
            .map(|(_, subtype)| subtype.trim())
            .filter(|subtype| !subtype.is_empty());

        match subtype {
            Some(subtype) => format!("{}.{}", self.id, subtype),
            None => self.id.to_string(),
        }
    }

    /// Read the whole content into memory.
    pub async fn into_bytes(self) -> Result<Bytes> {
        read_to_bytes(self.data)
            .await
            .map_err(|e| FileError::StorageFailure(StoreError::Io(e)))
    }
}

impl fmt::Debug for FileData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileData")
            .field("id", &self.id)
            .field("content_type", &self.content_type)
            .field("filename", &self.filename)
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}

/// One entry of a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    pub id: ObjectId,
    /// Present only when the listing asked for metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

/// The files visible to a caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileList {
    pub objects: Vec<FileInfo>,
    /// Number of visible entries.
    pub total: usize,
}

/// New read and write policies for an existing file.
///
/// Claim trees are ignored unless the matching level is `Claims`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateFileMetadataBody {
    pub read_access_level: AccessLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_security_claims: Option<ClaimTree>,
    pub write_access_level: AccessLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write_security_claims: Option<ClaimTree>,
}

impl UpdateFileMetadataBody {
    /// A body that sets exactly these policies.
    pub fn new(read: AccessPolicy, write: AccessPolicy) -> Self {
        Self {
            read_access_level: read.level(),
            read_security_claims: read.claims().cloned(),
            write_access_level: write.level(),
            write_security_claims: write.claims().cloned(),
        }
    }

    /// Validate the body into a `(read, write)` policy pair.
    pub fn policies(&self) -> Result<(AccessPolicy, AccessPolicy)> {
        let read = AccessPolicy::new(self.read_access_level, self.read_security_claims.clone())
            .map_err(|e| invalid("read", e))?;
        let write = AccessPolicy::new(self.write_access_level, self.write_security_claims.clone())
            .map_err(|e| invalid("write", e))?;
        Ok((read, write))
    }
}

fn invalid(slot: &str, err: CoreError) -> FileError {
    FileError::InvalidInput(format!("{slot} policy: {err}"))
}
