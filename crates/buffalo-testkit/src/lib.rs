//! # Buffalo Testkit
//!
//! Testing utilities for Buffalo.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: Known metadata maps with the records they decode to
//! - **Generators**: Proptest strategies for claim trees, claim sets, and callers
//! - **Fixtures**: Named callers and a ready-made file manager
//! - **Stores**: A storage wrapper that records calls and injects failures or stalls
//!
//! ## Golden Vectors
//!
//! Golden vectors pin the metadata wire format:
//!
//! ```rust
//! use buffalo_testkit::vectors::verify_all_vectors;
//!
//! verify_all_vectors().unwrap();
//! ```
//!
//! ## Property Testing
//!
//! Use the generators with proptest:
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use buffalo_testkit::generators::{claim_set, claim_tree};
//!
//! proptest! {
//!     #[test]
//!     fn evaluation_is_deterministic(tree in claim_tree(), claims in claim_set()) {
//!         prop_assert_eq!(tree.evaluate(&claims), tree.evaluate(&claims));
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! Quickly set up test scenarios:
//!
//! ```rust
//! use buffalo_testkit::fixtures::{alice, TestFixture};
//!
//! let fixture = TestFixture::new();
//! assert!(fixture.store().is_empty());
//! let _owner = alice();
//! ```

pub mod fixtures;
pub mod generators;
pub mod stores;
pub mod vectors;

pub use fixtures::TestFixture;
pub use stores::{InstrumentedStore, StoreCall, StoreOp};
pub use vectors::{all_vectors, verify_all_vectors, Expected, MetadataVector};
