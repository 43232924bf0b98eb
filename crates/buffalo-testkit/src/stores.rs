//! Instrumented storage for orchestrator tests.
//!
//! [`InstrumentedStore`] wraps a real store, records every call made
//! through the port, and can be told to fail or hang on chosen operations.

use std::collections::BTreeSet;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use buffalo_core::{Metadata, ObjectId};
use buffalo_store::{
    MemoryStore, MetadataMerge, NewObject, ObjectSummary, Result, Storage, StoreError,
    StoredObject,
};

/// A storage port operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StoreOp {
    Upload,
    Retrieve,
    Metadata,
    Delete,
    ListAll,
    UpdateMetadata,
}

/// One recorded call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreCall {
    pub op: StoreOp,
    /// The object addressed, if the operation takes one.
    pub id: Option<ObjectId>,
}

/// A store wrapper that records calls and injects faults.
///
/// A failing operation returns [`StoreError::Backend`] without reaching the
/// inner store. A stalling operation never completes.
pub struct InstrumentedStore<S = MemoryStore> {
    inner: S,
    calls: Mutex<Vec<StoreCall>>,
    failing: BTreeSet<StoreOp>,
    stalling: BTreeSet<StoreOp>,
}

impl InstrumentedStore<MemoryStore> {
    /// Wrap a fresh in-memory store.
    pub fn new() -> Self {
        Self::wrap(MemoryStore::new())
    }
}

impl Default for InstrumentedStore<MemoryStore> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Storage> InstrumentedStore<S> {
    pub fn wrap(inner: S) -> Self {
        Self {
            inner,
            calls: Mutex::new(Vec::new()),
            failing: BTreeSet::new(),
            stalling: BTreeSet::new(),
        }
    }

    /// Make `op` fail from now on.
    pub fn fail_on(mut self, op: StoreOp) -> Self {
        self.failing.insert(op);
        self
    }

    /// Make `op` hang forever from now on.
    pub fn stall_on(mut self, op: StoreOp) -> Self {
        self.stalling.insert(op);
        self
    }

    /// The wrapped store, bypassing instrumentation.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Every call made so far, in order.
    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// How many times `op` was called.
    pub fn count(&self, op: StoreOp) -> usize {
        self.calls().iter().filter(|call| call.op == op).count()
    }

    async fn enter(&self, op: StoreOp, id: Option<ObjectId>) -> Result<()> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(StoreCall { op, id });

        if self.stalling.contains(&op) {
            std::future::pending::<()>().await;
        }
        if self.failing.contains(&op) {
            return Err(StoreError::Backend(format!("injected {op:?} failure")));
        }
        Ok(())
    }
}

#[async_trait]
impl<S: Storage> Storage for InstrumentedStore<S> {
    async fn upload(&self, object: NewObject) -> Result<String> {
        self.enter(StoreOp::Upload, Some(object.id)).await?;
        self.inner.upload(object).await
    }

    async fn retrieve(&self, id: &ObjectId) -> Result<StoredObject> {
        self.enter(StoreOp::Retrieve, Some(*id)).await?;
        self.inner.retrieve(id).await
    }

    async fn metadata(&self, id: &ObjectId) -> Result<ObjectSummary> {
        self.enter(StoreOp::Metadata, Some(*id)).await?;
        self.inner.metadata(id).await
    }

    async fn delete(&self, id: &ObjectId) -> Result<()> {
        self.enter(StoreOp::Delete, Some(*id)).await?;
        self.inner.delete(id).await
    }

    async fn list_all(&self) -> Result<Vec<ObjectSummary>> {
        self.enter(StoreOp::ListAll, None).await?;
        self.inner.list_all().await
    }

    async fn update_metadata(&self, id: &ObjectId, merge: MetadataMerge) -> Result<Metadata> {
        self.enter(StoreOp::UpdateMetadata, Some(*id)).await?;
        self.inner.update_metadata(id, merge).await
    }

    fn public_uri(&self, id: &ObjectId) -> String {
        self.inner.public_uri(id)
    }
}
