//! # Buffalo Core
//!
//! Pure primitives for Buffalo: claim trees, access policies, caller
//! identity, and the metadata codec that stores policies beside a blob.
//!
//! This crate contains no I/O, no storage, no networking. It is pure
//! computation over the policy data model.
//!
//! ## Key Types
//!
//! - [`ClaimTree`] - Boolean expression over caller claims (leaf / AND / OR)
//! - [`AccessLevel`] - Coarse policy category of a read or write policy
//! - [`AccessPolicy`] - A level plus, for `Claims`, the tree it requires
//! - [`Caller`] - Identity and claim set of whoever issues a request
//! - [`ObjectRecord`] - The policy record written into blob metadata
//! - [`StoredRecord`] - The policy record as decoded from blob metadata
//!
//! ## Metadata
//!
//! Policies cross the storage boundary as string key/value pairs. The keys
//! and their encodings are the only bit-exact contract of the system; see
//! the [`metadata`] module.

pub mod caller;
pub mod claims;
pub mod error;
pub mod metadata;
pub mod policy;
pub mod types;

pub use caller::Caller;
pub use claims::{evaluate, Claim, ClaimSet, ClaimTree};
pub use error::{CoreError, Result};
pub use metadata::{Metadata, MetadataKey, ObjectRecord, StoredPolicy, StoredRecord};
pub use policy::{AccessLevel, AccessPolicy};
pub use types::ObjectId;
