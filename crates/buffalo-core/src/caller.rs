//! Caller identity as seen by the policy engine.
//!
//! Authentication happens upstream; by the time a request reaches Buffalo
//! the caller is an opaque identity string (or none) plus a claim set.

use crate::claims::{Claim, ClaimSet};

/// Who is making a request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Caller {
    identity: Option<String>,
    claims: ClaimSet,
}

impl Caller {
    /// An anonymous caller with no claims.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// An authenticated caller.
    ///
    /// An empty identity string is treated as anonymous.
    pub fn user(identity: impl Into<String>) -> Self {
        Self::new(Some(identity.into()), ClaimSet::new())
    }

    /// Build a caller from an optional identity and its claims.
    pub fn new(identity: Option<String>, claims: ClaimSet) -> Self {
        Self {
            identity: identity.filter(|id| !id.is_empty()),
            claims,
        }
    }

    /// Add a claim.
    pub fn with_claim(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.claims.insert(key, value);
        self
    }

    /// The caller's identity, `None` when anonymous.
    pub fn identity(&self) -> Option<&str> {
        self.identity.as_deref()
    }

    pub fn is_anonymous(&self) -> bool {
        self.identity.is_none()
    }

    pub fn claims(&self) -> &ClaimSet {
        &self.claims
    }

    /// Whether the caller holds the given claim.
    pub fn has_claim(&self, claim: &Claim) -> bool {
        self.claims.contains(&claim.key, &claim.value)
    }
}
