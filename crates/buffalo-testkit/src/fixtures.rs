//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use buffalo::{FileManager, FileManagerConfig, Result, UploadFile};
use buffalo_core::{AccessPolicy, Caller, Metadata, ObjectId};
use buffalo_perms::{ADMIN_CLAIM_KEY, ADMIN_CLAIM_VALUE};
use buffalo_store::{MemoryStore, Storage};

/// The usual owner in tests.
pub fn alice() -> Caller {
    Caller::user("alice")
}

pub fn bob() -> Caller {
    Caller::user("bob")
}

pub fn carol() -> Caller {
    Caller::user("carol")
}

/// A caller holding the default admin claim.
pub fn admin() -> Caller {
    Caller::user("root").with_claim(ADMIN_CLAIM_KEY, ADMIN_CLAIM_VALUE)
}

pub fn anonymous() -> Caller {
    Caller::anonymous()
}

/// Build a metadata map from string pairs.
pub fn metadata(pairs: &[(&str, &str)]) -> Metadata {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// A test fixture with a file manager over a store.
pub struct TestFixture<S: Storage = MemoryStore> {
    pub manager: FileManager<S>,
}

impl TestFixture<MemoryStore> {
    /// Create a fixture over a fresh in-memory store.
    pub fn new() -> Self {
        Self::with_store(MemoryStore::new())
    }

    /// Store an object with raw metadata, bypassing upload validation.
    pub fn seed_raw(&self, metadata: Metadata) -> buffalo_store::Result<ObjectId> {
        let id = ObjectId::generate();
        self.manager
            .store()
            .insert_raw(id, "application/octet-stream", "seeded", metadata)?;
        Ok(id)
    }
}

impl Default for TestFixture<MemoryStore> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Storage> TestFixture<S> {
    /// Create a fixture over the given store with default configuration.
    pub fn with_store(store: S) -> Self {
        Self::with_config(store, FileManagerConfig::default())
    }

    pub fn with_config(store: S, config: FileManagerConfig) -> Self {
        Self {
            manager: FileManager::new(store, config),
        }
    }

    pub fn store(&self) -> &S {
        self.manager.store()
    }

    /// Upload a small file with the default policies.
    pub async fn upload_as(&self, caller: &Caller, filename: &str) -> Result<ObjectId> {
        let file = UploadFile::new(filename, format!("content of {filename}"));
        Ok(self.manager.upload(file, caller).await?.id)
    }

    /// Upload a small file with explicit policies.
    pub async fn upload_with(
        &self,
        caller: &Caller,
        filename: &str,
        read: AccessPolicy,
        write: AccessPolicy,
    ) -> Result<ObjectId> {
        let file = UploadFile::new(filename, format!("content of {filename}"))
            .with_policies(read, write);
        Ok(self.manager.upload(file, caller).await?.id)
    }
}
