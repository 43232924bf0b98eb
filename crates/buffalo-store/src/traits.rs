//! Storage trait: the abstract interface to the blob store.
//!
//! This trait allows Buffalo to be storage-agnostic. Cloud SDK adapters live
//! outside this workspace; the in-memory and SQLite stores here follow the
//! same contract.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt};

use buffalo_core::{Metadata, ObjectId};

use crate::error::Result;

/// Object content as an async byte stream.
pub type DataStream = Pin<Box<dyn AsyncRead + Send>>;

/// Error returned by a metadata merge function to abort an update.
pub type MergeError = Box<dyn std::error::Error + Send + Sync>;

/// Computes new metadata from the currently stored metadata.
///
/// Runs inside the store's update, before anything is committed.
pub type MetadataMerge =
    Box<dyn FnOnce(&Metadata) -> std::result::Result<Metadata, MergeError> + Send>;

/// An object to be uploaded.
#[derive(Debug, Clone)]
pub struct NewObject {
    /// Identifier, also used as the storage key.
    pub id: ObjectId,
    /// MIME type recorded with the blob.
    pub content_type: String,
    /// Object content.
    pub data: Bytes,
    /// Metadata to store beside the blob.
    pub metadata: Metadata,
}

/// An object fetched for reading.
pub struct StoredObject {
    pub id: ObjectId,
    pub content_type: String,
    pub data: DataStream,
    pub metadata: Metadata,
}

impl fmt::Debug for StoredObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredObject")
            .field("id", &self.id)
            .field("content_type", &self.content_type)
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}

/// An object's id and metadata, without content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectSummary {
    pub id: ObjectId,
    pub content_type: String,
    /// Content length in bytes.
    pub size: u64,
    pub metadata: Metadata,
}

/// The Storage trait: async interface to a blob store.
///
/// # Design Notes
///
/// - **Single-call upload**: bytes and metadata are written together; the
///   store is responsible for making that atomic.
/// - **Not found is an error**: every per-object call returns
///   [`StoreError::NotFound`](crate::StoreError::NotFound) for unknown ids.
/// - **Merge before commit**: `update_metadata` hands the current metadata to
///   the merge function and writes only what it returns.
/// - **Cancellation**: dropping a returned future abandons the call. Stores
///   must not commit a write whose future was dropped before it started.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Store content and metadata under `object.id`. Returns the object's URI.
    async fn upload(&self, object: NewObject) -> Result<String>;

    /// Fetch content and metadata.
    async fn retrieve(&self, id: &ObjectId) -> Result<StoredObject>;

    /// Fetch metadata only.
    async fn metadata(&self, id: &ObjectId) -> Result<ObjectSummary>;

    /// Delete an object.
    async fn delete(&self, id: &ObjectId) -> Result<()>;

    /// List every object with its metadata.
    async fn list_all(&self) -> Result<Vec<ObjectSummary>>;

    /// Replace an object's metadata with the output of `merge`.
    ///
    /// Returns the committed metadata. If `merge` fails the store returns
    /// [`StoreError::MergeRejected`](crate::StoreError::MergeRejected) and
    /// leaves the object untouched.
    async fn update_metadata(&self, id: &ObjectId, merge: MetadataMerge) -> Result<Metadata>;

    /// The public URI of an object, valid once its read policy is public.
    fn public_uri(&self, id: &ObjectId) -> String;
}

/// Extension trait for common store patterns.
pub trait StorageExt: Storage {
    /// Fetch an object and read its whole content into memory.
    fn read_content(&self, id: &ObjectId) -> impl Future<Output = Result<Bytes>> + Send;
}

impl<S: Storage + ?Sized> StorageExt for S {
    async fn read_content(&self, id: &ObjectId) -> Result<Bytes> {
        let object = self.retrieve(id).await?;
        Ok(read_to_bytes(object.data).await?)
    }
}

/// Drain a data stream into memory.
pub async fn read_to_bytes(mut data: DataStream) -> std::io::Result<Bytes> {
    let mut buf = Vec::new();
    data.read_to_end(&mut buf).await?;
    Ok(Bytes::from(buf))
}

/// Wrap in-memory content as a data stream.
pub(crate) fn stream_from_bytes(data: Bytes) -> DataStream {
    Box::pin(std::io::Cursor::new(data))
}

/// Build a public URI from a base and an object id.
pub(crate) fn join_uri(base: &str, id: &ObjectId) -> String {
    format!("{}/{}", base.trim_end_matches('/'), id)
}

/// Get current time in milliseconds.
pub(crate) fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
