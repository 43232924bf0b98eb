//! # Buffalo
//!
//! A permission-aware gateway over a blob store.
//!
//! ## Overview
//!
//! Every file carries its own access policy as metadata stored beside the
//! blob. There is no external ACL: to read, list, delete or re-tag a file,
//! Buffalo loads that metadata, evaluates it against the caller, and only
//! then performs the storage operation.
//!
//! - **Policies**: each file has a read and a write policy, one of `Public`,
//!   `AuthenticatedUser`, `UserOwned` or `Claims`
//! - **Claim trees**: `Claims` policies hold an AND/OR tree of exact
//!   key/value claims the caller must satisfy
//! - **Fail closed**: unknown levels deny, undecodable policies are errors
//!
//! ## Usage
//!
//! ```rust,no_run
//! use buffalo::{Caller, FileManager, FileManagerConfig, UploadFile};
//! use buffalo::store::SqliteStore;
//!
//! async fn example() {
//!     // Open storage
//!     let store = SqliteStore::open_memory().unwrap();
//!
//!     // Create the manager
//!     let manager = FileManager::new(store, FileManagerConfig::default());
//!
//!     // Upload a file owned by alice
//!     let alice = Caller::user("alice");
//!     let uploaded = manager
//!         .upload(UploadFile::new("notes.txt", "hello"), &alice)
//!         .await
//!         .unwrap();
//!
//!     // Only alice can read it back
//!     let file = manager.retrieve(&uploaded.id, &alice).await.unwrap();
//!     let bytes = file.into_bytes().await.unwrap();
//!     assert_eq!(&bytes[..], b"hello");
//! }
//! ```
//!
//! ## Re-exports
//!
//! This crate re-exports the component crates for convenience:
//!
//! - `buffalo::core` - Claim trees, policies, metadata codec
//! - `buffalo::store` - Storage port and reference stores
//! - `buffalo::perms` - Permission guard

pub mod dto;
pub mod error;
pub mod manager;

// Re-export component crates
pub use buffalo_core as core;
pub use buffalo_perms as perms;
pub use buffalo_store as store;

// Re-export main types for convenience
pub use dto::{FileData, FileInfo, FileList, UpdateFileMetadataBody, UploadFile, UploadedFile};
pub use error::{FileError, Result, PUBLIC_INTERNAL_MESSAGE};
pub use manager::{FileManager, FileManagerConfig, DEFAULT_CONTENT_TYPE};

// Re-export commonly used component types
pub use buffalo_core::{AccessLevel, AccessPolicy, Caller, Claim, ClaimSet, ClaimTree, ObjectId};
pub use buffalo_perms::{GuardConfig, Operation};
