//! # Buffalo Store
//!
//! The storage port: the narrow interface Buffalo uses to reach a blob
//! store, plus two reference implementations.
//!
//! ## Overview
//!
//! Buffalo never talks to a blob store directly. The file manager calls the
//! [`Storage`] trait, which vendor adapters implement. The port moves bytes
//! and string metadata; it knows nothing about policies. Permission checks
//! that must run before a commit are handed to the port as a merge function
//! (see [`Storage::update_metadata`]).
//!
//! ## Key Types
//!
//! - [`Storage`] - The async trait for all blob operations
//! - [`MemoryStore`] - In-memory store for tests and embedding
//! - [`SqliteStore`] - Embedded SQLite blob store
//! - [`NewObject`] / [`StoredObject`] / [`ObjectSummary`] - Port payloads
//!
//! ## Usage
//!
//! ```rust,no_run
//! use buffalo_core::{Metadata, ObjectId};
//! use buffalo_store::{NewObject, SqliteStore, SqliteStoreConfig, Storage, StorageExt};
//!
//! async fn example() {
//!     let store = SqliteStore::open("blobs.db", SqliteStoreConfig::default()).unwrap();
//!
//!     let id = ObjectId::generate();
//!     let uri = store
//!         .upload(NewObject {
//!             id,
//!             content_type: "text/plain".into(),
//!             data: "hello".into(),
//!             metadata: Metadata::new(),
//!         })
//!         .await
//!         .unwrap();
//!
//!     let bytes = store.read_content(&id).await.unwrap();
//!     assert_eq!(&bytes[..], b"hello");
//!     println!("stored at {uri}");
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **No policy logic**: stores only persist what they are given
//! - **Merge before commit**: metadata updates run the caller's merge function
//!   inside the store's own per-object sequencing, and commit nothing if it
//!   rejects
//! - **No pagination**: `list_all` returns everything

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::{SqliteStore, SqliteStoreConfig};
pub use traits::{
    read_to_bytes, DataStream, MergeError, MetadataMerge, NewObject, ObjectSummary, Storage,
    StorageExt, StoredObject,
};
