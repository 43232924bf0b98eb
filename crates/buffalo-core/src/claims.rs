//! Claim trees and their evaluation against a caller's claim set.
//!
//! A [`ClaimTree`] is a boolean expression built from exact-match leaves and
//! AND/OR combinators. Trees are plain owned values, so they are finite and
//! acyclic by construction and [`evaluate`] always terminates.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// A single `(key, value)` claim held by a caller.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Claim {
    pub key: String,
    pub value: String,
}

impl Claim {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// The set of claims presented by a caller.
///
/// Keys may carry several values (e.g. multiple `role` claims). Lookups are
/// exact and case-sensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClaimSet {
    by_key: BTreeMap<String, BTreeSet<String>>,
}

impl ClaimSet {
    /// Create an empty claim set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a claim. Duplicates are ignored.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.by_key
            .entry(key.into())
            .or_default()
            .insert(value.into());
    }

    /// Check whether the exact `(key, value)` pair is present.
    pub fn contains(&self, key: &str, value: &str) -> bool {
        self.by_key
            .get(key)
            .is_some_and(|values| values.contains(value))
    }

    /// All values held for a key.
    pub fn values(&self, key: &str) -> impl Iterator<Item = &str> {
        self.by_key
            .get(key)
            .into_iter()
            .flat_map(|values| values.iter().map(String::as_str))
    }

    /// Iterate over every claim as `(key, value)`.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.by_key
            .iter()
            .flat_map(|(k, vs)| vs.iter().map(move |v| (k.as_str(), v.as_str())))
    }

    pub fn len(&self) -> usize {
        self.by_key.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ClaimSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut set = ClaimSet::new();
        for (k, v) in iter {
            set.insert(k, v);
        }
        set
    }
}

impl FromIterator<Claim> for ClaimSet {
    fn from_iter<I: IntoIterator<Item = Claim>>(iter: I) -> Self {
        iter.into_iter().map(|c| (c.key, c.value)).collect()
    }
}

/// A boolean expression over caller claims.
///
/// Serialized with a `Type` discriminator: `Claim` leaves carry `Key` and
/// `Value`, `And`/`Or` nodes carry `Items`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "Type")]
pub enum ClaimTree {
    /// Matches iff the caller holds exactly this claim.
    #[serde(rename = "Claim")]
    Leaf {
        #[serde(rename = "Key")]
        key: String,
        #[serde(rename = "Value")]
        value: String,
    },

    /// True iff every child is true. Empty is true.
    #[serde(rename = "And")]
    AllOf {
        #[serde(rename = "Items", default)]
        items: Vec<ClaimTree>,
    },

    /// True iff at least one child is true. Empty is false.
    #[serde(rename = "Or")]
    AnyOf {
        #[serde(rename = "Items", default)]
        items: Vec<ClaimTree>,
    },
}

impl ClaimTree {
    /// Build a leaf.
    pub fn leaf(key: impl Into<String>, value: impl Into<String>) -> Self {
        ClaimTree::Leaf {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Build a conjunction.
    pub fn all_of(items: impl IntoIterator<Item = ClaimTree>) -> Self {
        ClaimTree::AllOf {
            items: items.into_iter().collect(),
        }
    }

    /// Build a disjunction.
    pub fn any_of(items: impl IntoIterator<Item = ClaimTree>) -> Self {
        ClaimTree::AnyOf {
            items: items.into_iter().collect(),
        }
    }

    /// Evaluate this tree against a claim set.
    pub fn evaluate(&self, claims: &ClaimSet) -> bool {
        evaluate(self, claims)
    }

    /// Depth of the tree; a bare leaf has depth 0.
    pub fn depth(&self) -> usize {
        match self {
            ClaimTree::Leaf { .. } => 0,
            ClaimTree::AllOf { items } | ClaimTree::AnyOf { items } => {
                1 + items.iter().map(ClaimTree::depth).max().unwrap_or(0)
            }
        }
    }
}

/// Evaluate a claim tree against a caller's claims.
///
/// `AllOf` stops at the first false child and `AnyOf` at the first true one.
pub fn evaluate(tree: &ClaimTree, claims: &ClaimSet) -> bool {
    match tree {
        ClaimTree::Leaf { key, value } => claims.contains(key, value),
        ClaimTree::AllOf { items } => items.iter().all(|item| evaluate(item, claims)),
        ClaimTree::AnyOf { items } => items.iter().any(|item| evaluate(item, claims)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice_or_bob() -> ClaimTree {
        ClaimTree::any_of([ClaimTree::leaf("sub", "alice"), ClaimTree::leaf("sub", "bob")])
    }

    #[test]
    fn test_empty_combinators() {
        let claims = ClaimSet::new();
        assert!(evaluate(&ClaimTree::all_of([]), &claims));
        assert!(!evaluate(&ClaimTree::any_of([]), &claims));
    }

    #[test]
    fn test_any_of_subjects() {
        let tree = alice_or_bob();

        let bob: ClaimSet = [("sub", "bob")].into_iter().collect();
        let carol: ClaimSet = [("sub", "carol")].into_iter().collect();

        assert!(tree.evaluate(&bob));
        assert!(!tree.evaluate(&carol));
        assert!(!tree.evaluate(&ClaimSet::new()));
    }

    #[test]
    fn test_leaf_is_case_sensitive() {
        let tree = ClaimTree::leaf("role", "Editor");
        let lower: ClaimSet = [("role", "editor")].into_iter().collect();
        let upper_key: ClaimSet = [("Role", "Editor")].into_iter().collect();

        assert!(!tree.evaluate(&lower));
        assert!(!tree.evaluate(&upper_key));
    }

    #[test]
    fn test_nested_tree() {
        // (role=editor AND org=acme) OR sub=root
        let tree = ClaimTree::any_of([
            ClaimTree::all_of([
                ClaimTree::leaf("role", "editor"),
                ClaimTree::leaf("org", "acme"),
            ]),
            ClaimTree::leaf("sub", "root"),
        ]);

        let editor_acme: ClaimSet = [("role", "editor"), ("org", "acme")].into_iter().collect();
        let editor_only: ClaimSet = [("role", "editor")].into_iter().collect();
        let root: ClaimSet = [("sub", "root")].into_iter().collect();

        assert!(tree.evaluate(&editor_acme));
        assert!(!tree.evaluate(&editor_only));
        assert!(tree.evaluate(&root));
        assert_eq!(tree.depth(), 2);
    }

    #[test]
    fn test_multi_valued_key() {
        let claims: ClaimSet = [("role", "viewer"), ("role", "editor")].into_iter().collect();
        assert_eq!(claims.len(), 2);
        assert!(claims.contains("role", "viewer"));
        assert!(claims.contains("role", "editor"));
        assert_eq!(claims.values("role").count(), 2);
    }

    #[test]
    fn test_tree_json_shape() {
        let json = serde_json::to_value(alice_or_bob()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "Type": "Or",
                "Items": [
                    {"Type": "Claim", "Key": "sub", "Value": "alice"},
                    {"Type": "Claim", "Key": "sub", "Value": "bob"}
                ]
            })
        );
    }

    #[test]
    fn test_tree_json_missing_items_is_empty() {
        let tree: ClaimTree = serde_json::from_str(r#"{"Type":"And"}"#).unwrap();
        assert_eq!(tree, ClaimTree::all_of([]));
    }

    proptest::proptest! {
        #[test]
        fn test_leaf_matches_iff_present(
            key in "[a-c]{1,2}",
            value in "[a-c]{1,2}",
            held in proptest::collection::vec(("[a-c]{1,2}", "[a-c]{1,2}"), 0..8),
        ) {
            let claims: ClaimSet = held.iter().cloned().collect();
            let expected = held.iter().any(|(k, v)| *k == key && *v == value);
            proptest::prop_assert_eq!(ClaimTree::leaf(key, value).evaluate(&claims), expected);
        }
    }

    #[test]
    fn test_tree_json_unknown_type_rejected() {
        let result: std::result::Result<ClaimTree, _> =
            serde_json::from_str(r#"{"Type":"Xor","Items":[]}"#);
        assert!(result.is_err());
    }
}
