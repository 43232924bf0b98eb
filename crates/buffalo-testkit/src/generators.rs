//! Proptest generators for property-based testing.

use proptest::prelude::*;

use buffalo_core::{AccessLevel, AccessPolicy, Caller, Claim, ClaimSet, ClaimTree};

const KEYS: &[&str] = &["sub", "role", "team", "org"];
const VALUES: &[&str] = &["alice", "bob", "carol", "ops", "dev", "system_admin"];

/// Generate a claim key from a small alphabet, so trees and sets collide often.
pub fn claim_key() -> impl Strategy<Value = String> {
    prop::sample::select(KEYS).prop_map(str::to_string)
}

pub fn claim_value() -> impl Strategy<Value = String> {
    prop::sample::select(VALUES).prop_map(str::to_string)
}

/// Generate a single claim.
pub fn claim() -> impl Strategy<Value = Claim> {
    (claim_key(), claim_value()).prop_map(|(key, value)| Claim::new(key, value))
}

/// Generate a claim set of up to `max_len` claims.
pub fn claim_set_of(max_len: usize) -> impl Strategy<Value = ClaimSet> {
    prop::collection::vec(claim(), 0..=max_len).prop_map(|claims| claims.into_iter().collect())
}

pub fn claim_set() -> impl Strategy<Value = ClaimSet> {
    claim_set_of(6)
}

/// Generate a claim tree up to four levels deep, including empty nodes.
pub fn claim_tree() -> impl Strategy<Value = ClaimTree> {
    let leaf = (claim_key(), claim_value()).prop_map(|(k, v)| ClaimTree::leaf(k, v));
    leaf.prop_recursive(4, 32, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(ClaimTree::all_of),
            prop::collection::vec(inner, 0..4).prop_map(ClaimTree::any_of),
        ]
    })
}

/// Generate an AccessLevel.
pub fn access_level() -> impl Strategy<Value = AccessLevel> {
    prop_oneof![
        Just(AccessLevel::Public),
        Just(AccessLevel::AuthenticatedUser),
        Just(AccessLevel::UserOwned),
        Just(AccessLevel::Claims),
    ]
}

/// Generate a well-formed policy.
pub fn access_policy() -> impl Strategy<Value = AccessPolicy> {
    prop_oneof![
        Just(AccessPolicy::Public),
        Just(AccessPolicy::AuthenticatedUser),
        Just(AccessPolicy::UserOwned),
        claim_tree().prop_map(AccessPolicy::Claims),
    ]
}

/// Generate a caller: anonymous or one of a few identities, with claims.
pub fn caller() -> impl Strategy<Value = Caller> {
    (prop::option::of(claim_value()), claim_set()).prop_map(|(id, claims)| Caller::new(id, claims))
}
