//! In-memory implementation of the Storage trait.
//!
//! This is primarily for testing. It has the same semantics as the SQLite
//! store but keeps everything in memory with no persistence.

use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use bytes::Bytes;

use buffalo_core::{Metadata, ObjectId};

use crate::error::{Result, StoreError};
use crate::traits::{
    join_uri, stream_from_bytes, MetadataMerge, NewObject, ObjectSummary, Storage,
    StoredObject,
};

/// Default base URI for in-memory objects.
pub const DEFAULT_BASE_URI: &str = "memory://buffalo";

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock; every
/// call completes under a single lock acquisition, so updates to one object
/// are fully sequenced.
pub struct MemoryStore {
    objects: RwLock<BTreeMap<ObjectId, StoredBlob>>,
    base_uri: String,
}

#[derive(Clone)]
struct StoredBlob {
    content_type: String,
    data: Bytes,
    metadata: Metadata,
}

impl StoredBlob {
    fn summary(&self, id: ObjectId) -> ObjectSummary {
        ObjectSummary {
            id,
            content_type: self.content_type.clone(),
            size: self.data.len() as u64,
            metadata: self.metadata.clone(),
        }
    }
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self::with_base_uri(DEFAULT_BASE_URI)
    }

    /// Create a store whose public URIs start with `base_uri`.
    pub fn with_base_uri(base_uri: impl Into<String>) -> Self {
        Self {
            objects: RwLock::new(BTreeMap::new()),
            base_uri: base_uri.into(),
        }
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.read().map(|objects| objects.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Insert raw metadata without going through `upload`.
    ///
    /// Used to seed objects written by other systems, including damaged ones.
    pub fn insert_raw(
        &self,
        id: ObjectId,
        content_type: impl Into<String>,
        data: impl Into<Bytes>,
        metadata: Metadata,
    ) -> Result<()> {
        self.write()?.insert(
            id,
            StoredBlob {
                content_type: content_type.into(),
                data: data.into(),
                metadata,
            },
        );
        Ok(())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, BTreeMap<ObjectId, StoredBlob>>> {
        self.objects
            .read()
            .map_err(|e| StoreError::Backend(format!("lock poisoned: {e}")))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, BTreeMap<ObjectId, StoredBlob>>> {
        self.objects
            .write()
            .map_err(|e| StoreError::Backend(format!("lock poisoned: {e}")))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Storage for MemoryStore {
    async fn upload(&self, object: NewObject) -> Result<String> {
        let mut objects = self.write()?;

        if objects.contains_key(&object.id) {
            return Err(StoreError::AlreadyExists(object.id));
        }

        objects.insert(
            object.id,
            StoredBlob {
                content_type: object.content_type,
                data: object.data,
                metadata: object.metadata,
            },
        );

        Ok(self.public_uri(&object.id))
    }

    async fn retrieve(&self, id: &ObjectId) -> Result<StoredObject> {
        let objects = self.read()?;
        let blob = objects.get(id).ok_or(StoreError::NotFound(*id))?;

        Ok(StoredObject {
            id: *id,
            content_type: blob.content_type.clone(),
            data: stream_from_bytes(blob.data.clone()),
            metadata: blob.metadata.clone(),
        })
    }

    async fn metadata(&self, id: &ObjectId) -> Result<ObjectSummary> {
        let objects = self.read()?;
        objects
            .get(id)
            .map(|blob| blob.summary(*id))
            .ok_or(StoreError::NotFound(*id))
    }

    async fn delete(&self, id: &ObjectId) -> Result<()> {
        let mut objects = self.write()?;
        objects
            .remove(id)
            .map(|_| ())
            .ok_or(StoreError::NotFound(*id))
    }

    async fn list_all(&self) -> Result<Vec<ObjectSummary>> {
        let objects = self.read()?;
        Ok(objects
            .iter()
            .map(|(id, blob)| blob.summary(*id))
            .collect())
    }

    async fn update_metadata(&self, id: &ObjectId, merge: MetadataMerge) -> Result<Metadata> {
        let mut objects = self.write()?;
        let blob = objects.get_mut(id).ok_or(StoreError::NotFound(*id))?;

        let updated = merge(&blob.metadata).map_err(StoreError::MergeRejected)?;
        blob.metadata = updated.clone();

        Ok(updated)
    }

    fn public_uri(&self, id: &ObjectId) -> String {
        join_uri(&self.base_uri, id)
    }
}
