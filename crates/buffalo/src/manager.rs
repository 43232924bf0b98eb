//! The file manager: every file operation, gated by the stored policy.
//!
//! Each operation reads the object's metadata, asks the guard, and only then
//! acts. Nothing is cached between calls.
//!
//! # Races
//!
//! `retrieve` and `delete` check the policy and act in two separate store
//! calls. A concurrent `update_metadata` that lands between them is not seen.
//! `update_metadata` runs its check inside the store's own update, so stores
//! that sequence per object close that window for policy changes.

use std::sync::Arc;

use buffalo_core::{
    AccessLevel, AccessPolicy, Caller, Metadata, ObjectId, ObjectRecord, StoredRecord,
};
use buffalo_perms::{Guard, GuardConfig, Operation};
use buffalo_store::{MergeError, MetadataMerge, NewObject, Storage};

use crate::dto::{FileData, FileInfo, FileList, UpdateFileMetadataBody, UploadFile, UploadedFile};
use crate::error::{FileError, Result};

/// Content type recorded when the client sends none.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Configuration for the file manager.
#[derive(Debug, Clone)]
pub struct FileManagerConfig {
    /// Guard configuration (admin bypass).
    pub guard: GuardConfig,
    /// Content type recorded when an upload carries none.
    pub default_content_type: String,
    /// Largest accepted upload. `None` means unlimited.
    pub max_upload_bytes: Option<u64>,
}

impl Default for FileManagerConfig {
    fn default() -> Self {
        Self {
            guard: GuardConfig::default(),
            default_content_type: DEFAULT_CONTENT_TYPE.to_string(),
            max_upload_bytes: None,
        }
    }
}

/// The main FileManager struct.
///
/// Holds no mutable state; share it behind an `Arc` and call it from any
/// number of tasks. Dropping a returned future abandons the operation along
/// with its in-flight store call.
pub struct FileManager<S: Storage> {
    /// The storage backend.
    store: Arc<S>,
    guard: Guard,
    config: FileManagerConfig,
}

impl<S: Storage> FileManager<S> {
    /// Create a new file manager.
    pub fn new(store: S, config: FileManagerConfig) -> Self {
        Self::with_shared_store(Arc::new(store), config)
    }

    /// Create a file manager over a store shared with other components.
    pub fn with_shared_store(store: Arc<S>, config: FileManagerConfig) -> Self {
        Self {
            store,
            guard: Guard::new(config.guard.clone()),
            config,
        }
    }

    /// Get the store reference.
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn guard(&self) -> &Guard {
        &self.guard
    }

    pub fn config(&self) -> &FileManagerConfig {
        &self.config
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Write Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Upload a new file owned by the caller.
    ///
    /// Policies default to `UserOwned` for both read and write. Any policy
    /// other than `Public` needs a non-anonymous caller.
    pub async fn upload(&self, file: UploadFile, caller: &Caller) -> Result<UploadedFile> {
        if let Err(err) = self.validate_upload(&file, caller) {
            tracing::debug!(error = %err, "upload rejected");
            return Err(err);
        }

        let read_policy = file.read_policy.unwrap_or_default();
        let write_policy = file.write_policy.unwrap_or_default();
        let content_type = file
            .content_type
            .filter(|ct| !ct.trim().is_empty())
            .unwrap_or_else(|| self.config.default_content_type.clone());

        let id = ObjectId::generate();
        let record = ObjectRecord::owned_by(caller.identity(), file.filename.as_deref())
            .with_policies(read_policy.clone(), write_policy.clone());
        let metadata = record.to_metadata()?;
        let size = file.data.len();

        let resource_uri = self
            .store
            .upload(NewObject {
                id,
                content_type: content_type.clone(),
                data: file.data,
                metadata,
            })
            .await
            .map_err(|e| failed("upload", &id, e.into()))?;

        tracing::debug!(object_id = %id, size, "file uploaded");

        Ok(UploadedFile {
            id,
            filename: record.filename,
            content_type,
            uploaded_by: record.owner_id,
            read_policy,
            write_policy,
            created_at: now_millis(),
            resource_uri,
        })
    }

    /// Delete a file. Requires write access under the current policy.
    pub async fn delete(&self, id: &ObjectId, caller: &Caller) -> Result<()> {
        let summary = self
            .store
            .metadata(id)
            .await
            .map_err(|e| failed("delete", id, e.into()))?;

        self.guard
            .authorize(&summary.metadata, caller, Operation::Write)
            .map_err(|e| failed("delete", id, e.into()))?;

        self.store
            .delete(id)
            .await
            .map_err(|e| failed("delete", id, e.into()))?;

        tracing::debug!(object_id = %id, "file deleted");
        Ok(())
    }

    /// Replace a file's read and write policies.
    ///
    /// The caller needs write access under the policy in force before the
    /// update, and becomes the file's owner. Returns the public URI when the
    /// new read policy is `Public`.
    pub async fn update_metadata(
        &self,
        id: &ObjectId,
        body: &UpdateFileMetadataBody,
        caller: &Caller,
    ) -> Result<Option<String>> {
        let public = body.read_access_level == AccessLevel::Public;

        let merge = self.policy_merge(caller.clone(), body.clone());
        self.store
            .update_metadata(id, merge)
            .await
            .map_err(|e| failed("update_metadata", id, e.into()))?;

        tracing::debug!(object_id = %id, public, "file policies updated");
        Ok(public.then(|| self.store.public_uri(id)))
    }

    /// Build the merge that checks write access and stamps the new policies.
    ///
    /// The body is validated after the write check, so an unknown id or a
    /// denied caller is reported before a malformed body.
    fn policy_merge(&self, caller: Caller, body: UpdateFileMetadataBody) -> MetadataMerge {
        let guard = self.guard.clone();

        Box::new(move |current: &Metadata| -> std::result::Result<Metadata, MergeError> {
            guard
                .authorize(current, &caller, Operation::Write)
                .map_err(FileError::from)?;
            let (read_policy, write_policy) = body.policies()?;

            let record = ObjectRecord {
                owner_id: caller.identity().map(str::to_string),
                filename: None,
                read_policy,
                write_policy,
            };
            Ok(record.merge_into(current).map_err(FileError::from)?)
        })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Read Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Retrieve a file. Requires read access.
    pub async fn retrieve(&self, id: &ObjectId, caller: &Caller) -> Result<FileData> {
        let object = self
            .store
            .retrieve(id)
            .await
            .map_err(|e| failed("retrieve", id, e.into()))?;

        let record = self
            .guard
            .authorize(&object.metadata, caller, Operation::Read)
            .map_err(|e| failed("retrieve", id, e.into()))?;

        Ok(FileData {
            id: object.id,
            content_type: object.content_type,
            filename: record.filename,
            metadata: object.metadata,
            data: object.data,
        })
    }

    /// List the files the caller can read.
    ///
    /// Unreadable files are left out without error; so are files whose
    /// policy cannot be decoded.
    pub async fn list(&self, caller: &Caller, include_metadata: bool) -> Result<FileList> {
        let summaries = self.store.list_all().await.map_err(|e| {
            let err = FileError::from(e);
            tracing::error!(error = %err, "listing failed");
            err
        })?;

        let mut objects = Vec::new();
        for summary in summaries {
            let record = match StoredRecord::decode(&summary.metadata) {
                Ok(record) => record,
                Err(e) => {
                    tracing::error!(object_id = %summary.id, error = %e, "skipping corrupt object");
                    continue;
                }
            };

            if !self.guard.can_read(&record, caller) {
                continue;
            }

            objects.push(FileInfo {
                id: summary.id,
                metadata: include_metadata.then_some(summary.metadata),
            });
        }

        let total = objects.len();
        tracing::debug!(total, "files listed");
        Ok(FileList { objects, total })
    }

    fn validate_upload(&self, file: &UploadFile, caller: &Caller) -> Result<()> {
        if file.data.is_empty() {
            return Err(FileError::InvalidInput("file size can not be 0".into()));
        }

        if let Some(max) = self.config.max_upload_bytes {
            if file.size() as u64 > max {
                return Err(FileError::InvalidInput(format!(
                    "file size {} exceeds the limit of {max} bytes",
                    file.size()
                )));
            }
        }

        let needs_identity = [&file.read_policy, &file.write_policy]
            .into_iter()
            .any(|policy| !policy.as_ref().is_some_and(AccessPolicy::is_public));
        if needs_identity && caller.is_anonymous() {
            return Err(FileError::InvalidInput(
                "an authenticated user is required for non-public policies".into(),
            ));
        }

        Ok(())
    }
}

/// Log a failed operation at a level matching its kind.
fn failed(operation: &'static str, id: &ObjectId, err: FileError) -> FileError {
    match &err {
        FileError::PolicyCorrupt(_) | FileError::StorageFailure(_) => {
            tracing::error!(operation, object_id = %id, error = %err, "file operation failed");
        }
        FileError::Unauthorized(_) => {
            tracing::warn!(operation, object_id = %id, "access denied");
        }
        FileError::NotFound(_) | FileError::InvalidInput(_) => {
            tracing::debug!(operation, object_id = %id, error = %err, "file operation rejected");
        }
    }
    err
}

/// Get current time in milliseconds.
fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use buffalo_core::ClaimTree;
    use buffalo_store::MemoryStore;

    fn manager() -> FileManager<MemoryStore> {
        FileManager::new(MemoryStore::new(), FileManagerConfig::default())
    }

    #[tokio::test]
    async fn test_upload_defaults() {
        let manager = manager();
        let alice = Caller::user("alice");

        let uploaded = manager
            .upload(UploadFile::new("notes.txt", "hello"), &alice)
            .await
            .unwrap();

        assert_eq!(uploaded.filename.as_deref(), Some("notes.txt"));
        assert_eq!(uploaded.content_type, DEFAULT_CONTENT_TYPE);
        assert_eq!(uploaded.uploaded_by.as_deref(), Some("alice"));
        assert_eq!(uploaded.read_policy, AccessPolicy::UserOwned);
        assert_eq!(uploaded.write_policy, AccessPolicy::UserOwned);
        assert_eq!(uploaded.resource_uri, format!("memory://buffalo/{}", uploaded.id));

        let stored = manager.store().metadata(&uploaded.id).await.unwrap();
        assert_eq!(stored.metadata["buffalo_user_id"], "alice");
        assert_eq!(stored.metadata["buffalo_filename"], "notes.txt");
        assert_eq!(stored.metadata["buffalo_read_access_mode"], "UserOwned");
        assert_eq!(stored.metadata["buffalo_write_access_mode"], "UserOwned");
    }

    #[tokio::test]
    async fn test_upload_size_limit() {
        let config = FileManagerConfig {
            max_upload_bytes: Some(4),
            ..FileManagerConfig::default()
        };
        let manager = FileManager::new(MemoryStore::new(), config);

        let err = manager
            .upload(UploadFile::new("big.bin", "12345"), &Caller::user("alice"))
            .await
            .unwrap_err();
        assert!(matches!(err, FileError::InvalidInput(_)));
        assert!(manager.store().is_empty());
    }

    #[tokio::test]
    async fn test_anonymous_upload_needs_public_policies() {
        let manager = manager();
        let anonymous = Caller::anonymous();

        let err = manager
            .upload(UploadFile::new("a.txt", "x"), &anonymous)
            .await
            .unwrap_err();
        assert!(matches!(err, FileError::InvalidInput(_)));

        let uploaded = manager
            .upload(
                UploadFile::new("a.txt", "x")
                    .with_policies(AccessPolicy::Public, AccessPolicy::Public),
                &anonymous,
            )
            .await
            .unwrap();
        assert_eq!(uploaded.uploaded_by, None);

        let stored = manager.store().metadata(&uploaded.id).await.unwrap();
        assert_eq!(stored.metadata["buffalo_user_id"], "");
    }

    #[tokio::test]
    async fn test_update_transfers_ownership() {
        let manager = manager();
        let alice = Caller::user("alice");
        let bob = Caller::user("bob");

        let uploaded = manager
            .upload(
                UploadFile::new("shared.txt", "x").with_policies(
                    AccessPolicy::UserOwned,
                    AccessPolicy::Claims(ClaimTree::leaf("team", "ops")),
                ),
                &alice,
            )
            .await
            .unwrap();

        let ops_bob = bob.clone().with_claim("team", "ops");
        let body = UpdateFileMetadataBody::new(AccessPolicy::UserOwned, AccessPolicy::UserOwned);
        let uri = manager
            .update_metadata(&uploaded.id, &body, &ops_bob)
            .await
            .unwrap();
        assert_eq!(uri, None);

        // Bob now owns the file; Alice lost access.
        assert!(manager.retrieve(&uploaded.id, &bob).await.is_ok());
        assert!(matches!(
            manager.retrieve(&uploaded.id, &alice).await,
            Err(FileError::Unauthorized(Operation::Read))
        ));

        let stored = manager.store().metadata(&uploaded.id).await.unwrap();
        assert_eq!(stored.metadata["buffalo_filename"], "shared.txt");
        assert!(!stored.metadata.contains_key("buffalo_write_claims"));
    }
}
