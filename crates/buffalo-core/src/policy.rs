//! Access levels and access policies.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::claims::{ClaimSet, ClaimTree};
use crate::error::{CoreError, Result};

/// Coarse-grained policy category.
///
/// Levels are not ordered; each one is evaluated on its own terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessLevel {
    /// Anyone, including anonymous callers.
    Public,
    /// Any non-anonymous caller.
    AuthenticatedUser,
    /// Only the stored owner.
    UserOwned,
    /// Callers whose claims satisfy the stored claim tree.
    Claims,
}

/// Wire names, one per level. This table is the only place level names live.
const WIRE_NAMES: [(AccessLevel, &str); 4] = [
    (AccessLevel::Public, "Public"),
    (AccessLevel::AuthenticatedUser, "AuthenticatedUser"),
    (AccessLevel::UserOwned, "UserOwned"),
    (AccessLevel::Claims, "Claims"),
];

/// Names written by earlier deployments. Accepted on decode, never written.
const LEGACY_NAMES: [(AccessLevel, &str); 4] = [
    (AccessLevel::Public, "PUBLIC"),
    (AccessLevel::AuthenticatedUser, "ORGANIZATION_OWNED"),
    (AccessLevel::UserOwned, "USER_OWNED"),
    (AccessLevel::Claims, "CLAIMS"),
];

impl AccessLevel {
    /// Every level, in declaration order.
    pub const ALL: [AccessLevel; 4] = [
        AccessLevel::Public,
        AccessLevel::AuthenticatedUser,
        AccessLevel::UserOwned,
        AccessLevel::Claims,
    ];

    /// The wire name of this level.
    pub fn as_str(&self) -> &'static str {
        WIRE_NAMES
            .iter()
            .find(|(level, _)| level == self)
            .map(|(_, name)| *name)
            .unwrap_or("")
    }

    /// Parse a wire name, including legacy names.
    pub fn from_wire(name: &str) -> Option<Self> {
        WIRE_NAMES
            .iter()
            .chain(LEGACY_NAMES.iter())
            .find(|(_, n)| *n == name)
            .map(|(level, _)| *level)
    }
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccessLevel {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_wire(s).ok_or_else(|| CoreError::UnknownAccessLevel(s.to_string()))
    }
}

impl Serialize for AccessLevel {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for AccessLevel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(serde::de::Error::custom)
    }
}

/// A read or write policy.
///
/// The `Claims` variant owns its tree, so a claims policy without a tree
/// cannot exist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PolicyRepr", into = "PolicyRepr")]
pub enum AccessPolicy {
    Public,
    AuthenticatedUser,
    UserOwned,
    Claims(ClaimTree),
}

impl AccessPolicy {
    /// Build a policy from a level and an optional tree.
    ///
    /// A tree supplied with any level other than `Claims` is discarded.
    pub fn new(level: AccessLevel, claims: Option<ClaimTree>) -> Result<Self> {
        match (level, claims) {
            (AccessLevel::Public, _) => Ok(AccessPolicy::Public),
            (AccessLevel::AuthenticatedUser, _) => Ok(AccessPolicy::AuthenticatedUser),
            (AccessLevel::UserOwned, _) => Ok(AccessPolicy::UserOwned),
            (AccessLevel::Claims, Some(tree)) => Ok(AccessPolicy::Claims(tree)),
            (AccessLevel::Claims, None) => Err(CoreError::MissingClaimTree),
        }
    }

    /// The level of this policy.
    pub fn level(&self) -> AccessLevel {
        match self {
            AccessPolicy::Public => AccessLevel::Public,
            AccessPolicy::AuthenticatedUser => AccessLevel::AuthenticatedUser,
            AccessPolicy::UserOwned => AccessLevel::UserOwned,
            AccessPolicy::Claims(_) => AccessLevel::Claims,
        }
    }

    /// The claim tree, present iff the level is `Claims`.
    pub fn claims(&self) -> Option<&ClaimTree> {
        match self {
            AccessPolicy::Claims(tree) => Some(tree),
            _ => None,
        }
    }

    pub fn is_public(&self) -> bool {
        matches!(self, AccessPolicy::Public)
    }

    /// Whether a claim set satisfies this policy's tree.
    ///
    /// Only meaningful for `Claims`; every other level returns false.
    pub fn claims_satisfied_by(&self, claims: &ClaimSet) -> bool {
        self.claims().is_some_and(|tree| tree.evaluate(claims))
    }
}

impl Default for AccessPolicy {
    fn default() -> Self {
        AccessPolicy::UserOwned
    }
}

/// Serialized shape of a policy: `{"level": ..., "claims": ...}`.
#[derive(Serialize, Deserialize)]
struct PolicyRepr {
    level: AccessLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    claims: Option<ClaimTree>,
}

impl TryFrom<PolicyRepr> for AccessPolicy {
    type Error = CoreError;

    fn try_from(repr: PolicyRepr) -> Result<Self> {
        AccessPolicy::new(repr.level, repr.claims)
    }
}

impl From<AccessPolicy> for PolicyRepr {
    fn from(policy: AccessPolicy) -> Self {
        let level = policy.level();
        let claims = match policy {
            AccessPolicy::Claims(tree) => Some(tree),
            _ => None,
        };
        PolicyRepr { level, claims }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_table_is_complete_and_bijective() {
        for level in AccessLevel::ALL {
            let name = level.as_str();
            assert!(!name.is_empty(), "{level:?} has no wire name");
            assert_eq!(AccessLevel::from_wire(name), Some(level));
            let owners = WIRE_NAMES.iter().filter(|(_, n)| *n == name).count();
            assert_eq!(owners, 1, "wire name {name} is not unique");
        }
        assert_eq!(WIRE_NAMES.len(), AccessLevel::ALL.len());
    }

    #[test]
    fn test_legacy_names_decode_only() {
        assert_eq!(AccessLevel::from_wire("USER_OWNED"), Some(AccessLevel::UserOwned));
        assert_eq!(
            AccessLevel::from_wire("ORGANIZATION_OWNED"),
            Some(AccessLevel::AuthenticatedUser)
        );
        for level in AccessLevel::ALL {
            assert!(!LEGACY_NAMES.iter().any(|(_, n)| *n == level.as_str()));
        }
    }

    #[test]
    fn test_unknown_level() {
        let err = "public".parse::<AccessLevel>().unwrap_err();
        assert!(matches!(err, CoreError::UnknownAccessLevel(s) if s == "public"));
    }

    #[test]
    fn test_claims_requires_tree() {
        let err = AccessPolicy::new(AccessLevel::Claims, None).unwrap_err();
        assert!(matches!(err, CoreError::MissingClaimTree));

        let policy =
            AccessPolicy::new(AccessLevel::Claims, Some(ClaimTree::leaf("sub", "a"))).unwrap();
        assert_eq!(policy.level(), AccessLevel::Claims);
        assert!(policy.claims().is_some());
    }

    #[test]
    fn test_tree_dropped_for_other_levels() {
        let policy =
            AccessPolicy::new(AccessLevel::UserOwned, Some(ClaimTree::leaf("sub", "a"))).unwrap();
        assert_eq!(policy, AccessPolicy::UserOwned);
        assert!(policy.claims().is_none());
    }

    #[test]
    fn test_policy_json() {
        let policy = AccessPolicy::Claims(ClaimTree::leaf("role", "editor"));
        let json = serde_json::to_value(&policy).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "level": "Claims",
                "claims": {"Type": "Claim", "Key": "role", "Value": "editor"}
            })
        );

        let public = serde_json::to_value(AccessPolicy::Public).unwrap();
        assert_eq!(public, serde_json::json!({"level": "Public"}));

        let missing: std::result::Result<AccessPolicy, _> =
            serde_json::from_value(serde_json::json!({"level": "Claims"}));
        assert!(missing.is_err());
    }
}
