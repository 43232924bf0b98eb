//! # Buffalo Permissions
//!
//! The permission guard: decides whether a caller may read or write an
//! object, given the policy record stored in the object's metadata.
//!
//! ## Overview
//!
//! Policies live beside the blob, not in an ACL service. Every decision
//! starts from freshly fetched metadata, decodes it into a
//! [`StoredRecord`](buffalo_core::StoredRecord) and evaluates the relevant
//! policy:
//!
//! 1. `Public` allows everyone, anonymous callers included.
//! 2. A caller holding the admin claim (`role=system_admin` by default) is
//!    allowed regardless of the stored policy.
//! 3. Anonymous callers are denied everything else.
//! 4. `AuthenticatedUser` allows any identified caller.
//! 5. `UserOwned` allows only the stored owner.
//! 6. `Claims` allows callers whose claims satisfy the stored tree.
//!
//! Unknown levels and `Claims` policies without a tree deny. Metadata that
//! cannot be decoded at all is reported as [`PermsError::PolicyCorrupt`],
//! never as an allow.
//!
//! ## Usage
//!
//! ```rust
//! use buffalo_core::{AccessPolicy, Caller, ObjectRecord};
//! use buffalo_perms::{Guard, Operation};
//!
//! let metadata = ObjectRecord::owned_by(Some("alice"), Some("notes.txt"))
//!     .with_policies(AccessPolicy::Public, AccessPolicy::UserOwned)
//!     .to_metadata()
//!     .unwrap();
//!
//! let guard = Guard::default();
//! assert!(guard.authorize(&metadata, &Caller::anonymous(), Operation::Read).is_ok());
//! assert!(guard.authorize(&metadata, &Caller::user("bob"), Operation::Write).is_err());
//! ```

pub mod error;
pub mod guard;

pub use error::{PermsError, Result};
pub use guard::{Guard, GuardConfig, Operation, ADMIN_CLAIM_KEY, ADMIN_CLAIM_VALUE};
