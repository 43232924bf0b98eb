//! The permission guard.
//!
//! The guard is a pure decision function over a decoded policy record and a
//! caller. It holds no state beyond its configuration and never caches a
//! decision: callers fetch current metadata before every check.

use std::fmt;

use buffalo_core::{AccessPolicy, Caller, Claim, CoreError, Metadata, StoredPolicy, StoredRecord};

use crate::error::{PermsError, Result};

/// Claim key of the default super-admin claim.
pub const ADMIN_CLAIM_KEY: &str = "role";

/// Claim value of the default super-admin claim.
pub const ADMIN_CLAIM_VALUE: &str = "system_admin";

/// The kind of access being requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Retrieve content or see the object in a listing.
    Read,
    /// Delete the object or change its policies.
    Write,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Read => f.write_str("read"),
            Operation::Write => f.write_str("write"),
        }
    }
}

/// Configuration for the guard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardConfig {
    /// Claim that bypasses every non-public policy. `None` disables the bypass.
    ///
    /// The bypass is unscoped: it applies to every object, for both read and
    /// write.
    pub admin_claim: Option<Claim>,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            admin_claim: Some(Claim::new(ADMIN_CLAIM_KEY, ADMIN_CLAIM_VALUE)),
        }
    }
}

/// Decides read and write access against stored policies.
#[derive(Debug, Clone, Default)]
pub struct Guard {
    config: GuardConfig,
}

impl Guard {
    /// Create a guard with the given configuration.
    pub fn new(config: GuardConfig) -> Self {
        Self { config }
    }

    /// The guard's configuration.
    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    /// Whether the caller holds the configured admin claim.
    pub fn is_admin(&self, caller: &Caller) -> bool {
        self.config
            .admin_claim
            .as_ref()
            .is_some_and(|claim| caller.has_claim(claim))
    }

    /// Evaluate one stored policy for a caller.
    pub fn evaluate(&self, policy: &StoredPolicy, owner: Option<&str>, caller: &Caller) -> bool {
        if policy.is_public() {
            return true;
        }

        if self.is_admin(caller) {
            return true;
        }

        let Some(identity) = caller.identity() else {
            return false;
        };

        match policy {
            StoredPolicy::Policy(AccessPolicy::Public) => true,
            StoredPolicy::Policy(AccessPolicy::AuthenticatedUser) => true,
            StoredPolicy::Policy(AccessPolicy::UserOwned) => owner == Some(identity),
            StoredPolicy::Policy(AccessPolicy::Claims(tree)) => tree.evaluate(caller.claims()),
            StoredPolicy::MissingClaimTree => {
                tracing::debug!("claims policy without a stored tree, denying");
                false
            }
            StoredPolicy::Unrecognized(level) => {
                tracing::debug!(level = %level, "unrecognized access level, denying");
                false
            }
        }
    }

    /// Check read access.
    pub fn can_read(&self, record: &StoredRecord, caller: &Caller) -> bool {
        self.evaluate(&record.read, record.owner_id.as_deref(), caller)
    }

    /// Check write access.
    pub fn can_write(&self, record: &StoredRecord, caller: &Caller) -> bool {
        self.evaluate(&record.write, record.owner_id.as_deref(), caller)
    }

    /// Check access for an operation.
    pub fn check(&self, record: &StoredRecord, caller: &Caller, operation: Operation) -> bool {
        match operation {
            Operation::Read => self.can_read(record, caller),
            Operation::Write => self.can_write(record, caller),
        }
    }

    /// Decode raw metadata and check access in one step.
    ///
    /// Returns the decoded record on success so callers can reuse it.
    pub fn authorize(
        &self,
        metadata: &Metadata,
        caller: &Caller,
        operation: Operation,
    ) -> Result<StoredRecord> {
        let record = StoredRecord::decode(metadata).map_err(|e| match e {
            CoreError::PolicyCorrupt(reason) => PermsError::PolicyCorrupt(reason),
            other => PermsError::PolicyCorrupt(other.to_string()),
        })?;

        if self.check(&record, caller, operation) {
            Ok(record)
        } else {
            Err(PermsError::PermissionDenied(operation))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use buffalo_core::{ClaimTree, ObjectRecord};

    fn record(read: AccessPolicy, write: AccessPolicy) -> StoredRecord {
        StoredRecord {
            owner_id: Some("alice".into()),
            filename: None,
            read: StoredPolicy::Policy(read),
            write: StoredPolicy::Policy(write),
        }
    }

    fn admin() -> Caller {
        Caller::user("root").with_claim("role", "system_admin")
    }

    #[test]
    fn test_public_allows_anonymous() {
        let guard = Guard::default();
        let rec = record(AccessPolicy::Public, AccessPolicy::UserOwned);

        assert!(guard.can_read(&rec, &Caller::anonymous()));
        assert!(!guard.can_write(&rec, &Caller::anonymous()));
    }

    #[test]
    fn test_user_owned() {
        let guard = Guard::default();
        let rec = record(AccessPolicy::UserOwned, AccessPolicy::UserOwned);

        assert!(guard.can_read(&rec, &Caller::user("alice")));
        assert!(guard.can_write(&rec, &Caller::user("alice")));
        assert!(!guard.can_read(&rec, &Caller::user("bob")));
        assert!(!guard.can_read(&rec, &Caller::anonymous()));
    }

    #[test]
    fn test_user_owned_without_owner_denies_everyone() {
        let guard = Guard::default();
        let mut rec = record(AccessPolicy::UserOwned, AccessPolicy::UserOwned);
        rec.owner_id = None;

        assert!(!guard.can_read(&rec, &Caller::user("alice")));
    }

    #[test]
    fn test_authenticated_user() {
        let guard = Guard::default();
        let rec = record(AccessPolicy::AuthenticatedUser, AccessPolicy::AuthenticatedUser);

        assert!(guard.can_read(&rec, &Caller::user("bob")));
        assert!(guard.can_write(&rec, &Caller::user("carol")));
        assert!(!guard.can_read(&rec, &Caller::anonymous()));
    }

    #[test]
    fn test_claims_policy() {
        let guard = Guard::default();
        let tree = ClaimTree::any_of([ClaimTree::leaf("sub", "alice"), ClaimTree::leaf("sub", "bob")]);
        let rec = record(AccessPolicy::Claims(tree), AccessPolicy::UserOwned);

        let bob = Caller::user("bob").with_claim("sub", "bob");
        let carol = Caller::user("carol").with_claim("sub", "carol");
        let no_claims = Caller::user("dave");

        assert!(guard.can_read(&rec, &bob));
        assert!(!guard.can_read(&rec, &carol));
        assert!(!guard.can_read(&rec, &no_claims));
    }

    #[test]
    fn test_claims_policy_denies_anonymous_even_with_matching_claims() {
        let guard = Guard::default();
        let rec = record(
            AccessPolicy::Claims(ClaimTree::leaf("sub", "bob")),
            AccessPolicy::UserOwned,
        );
        let anonymous = Caller::anonymous().with_claim("sub", "bob");

        assert!(!guard.can_read(&rec, &anonymous));
    }

    // The admin claim is an unscoped escape hatch: it passes every policy,
    // including ones the caller could never satisfy otherwise.
    #[test]
    fn test_super_admin_bypass() {
        let guard = Guard::default();
        let stranger_owned = record(AccessPolicy::UserOwned, AccessPolicy::UserOwned);
        let claims_only = record(
            AccessPolicy::Claims(ClaimTree::any_of([])),
            AccessPolicy::Claims(ClaimTree::any_of([])),
        );

        for rec in [&stranger_owned, &claims_only] {
            assert!(guard.can_read(rec, &admin()));
            assert!(guard.can_write(rec, &admin()));
        }

        // The claim alone is enough, no identity needed.
        let anonymous_admin = Caller::anonymous().with_claim("role", "system_admin");
        assert!(guard.can_write(&stranger_owned, &anonymous_admin));
    }

    #[test]
    fn test_admin_bypass_can_be_disabled() {
        let guard = Guard::new(GuardConfig { admin_claim: None });
        let rec = record(AccessPolicy::UserOwned, AccessPolicy::UserOwned);

        assert!(!guard.can_read(&rec, &admin()));
    }

    #[test]
    fn test_custom_admin_claim() {
        let guard = Guard::new(GuardConfig {
            admin_claim: Some(Claim::new("scope", "files:admin")),
        });
        let rec = record(AccessPolicy::UserOwned, AccessPolicy::UserOwned);

        assert!(!guard.can_read(&rec, &admin()));
        assert!(guard.can_read(&rec, &Caller::user("ops").with_claim("scope", "files:admin")));
    }

    #[test]
    fn test_unrecognized_and_missing_tree_fail_closed() {
        let guard = Guard::default();
        let rec = StoredRecord {
            owner_id: Some("alice".into()),
            filename: None,
            read: StoredPolicy::Unrecognized("ORGANIZATION".into()),
            write: StoredPolicy::MissingClaimTree,
        };
        let alice = Caller::user("alice").with_claim("sub", "alice");

        assert!(!guard.can_read(&rec, &alice));
        assert!(!guard.can_write(&rec, &alice));
    }

    #[test]
    fn test_authorize_corrupt_metadata() {
        let guard = Guard::default();
        let mut metadata = ObjectRecord::owned_by(Some("alice"), None).to_metadata().unwrap();
        metadata.remove("buffalo_read_access_mode");

        let err = guard
            .authorize(&metadata, &admin(), Operation::Read)
            .unwrap_err();
        assert!(matches!(err, PermsError::PolicyCorrupt(_)));
    }

    #[test]
    fn test_authorize_denied() {
        let guard = Guard::default();
        let metadata = ObjectRecord::owned_by(Some("alice"), None).to_metadata().unwrap();

        let err = guard
            .authorize(&metadata, &Caller::user("bob"), Operation::Write)
            .unwrap_err();
        assert!(matches!(err, PermsError::PermissionDenied(Operation::Write)));

        let rec = guard
            .authorize(&metadata, &Caller::user("alice"), Operation::Write)
            .unwrap();
        assert_eq!(rec.owner_id.as_deref(), Some("alice"));
    }

    proptest::proptest! {
        #[test]
        fn test_admin_passes_any_level(level_idx in 0usize..4, owner in "[a-z]{1,8}") {
            let policy = match level_idx {
                0 => AccessPolicy::Public,
                1 => AccessPolicy::AuthenticatedUser,
                2 => AccessPolicy::UserOwned,
                _ => AccessPolicy::Claims(ClaimTree::leaf("never", "held")),
            };
            let rec = StoredRecord {
                owner_id: Some(owner),
                filename: None,
                read: StoredPolicy::Policy(policy.clone()),
                write: StoredPolicy::Policy(policy),
            };
            let guard = Guard::default();
            proptest::prop_assert!(guard.can_read(&rec, &admin()));
            proptest::prop_assert!(guard.can_write(&rec, &admin()));
        }
    }
}
