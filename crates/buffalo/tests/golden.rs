//! Golden wire vectors for the metadata stored beside every blob.
//!
//! Every deployment reading the same bucket must agree on these bytes:
//! - metadata key names
//! - access level names
//! - claim tree JSON

use buffalo::core::metadata::{decode_claims, encode_claims};
use buffalo::core::{AccessLevel, MetadataKey, ObjectRecord};
use buffalo::{AccessPolicy, ClaimTree, UpdateFileMetadataBody};
use buffalo_testkit::vectors::{all_vectors, verify_vector};

#[test]
fn test_metadata_vectors() {
    for vector in all_vectors() {
        if let Err(e) = verify_vector(&vector) {
            panic!("golden vector failed: {e}");
        }
    }
}

#[test]
fn test_metadata_key_names() {
    let names: Vec<_> = MetadataKey::ALL.iter().map(|k| k.as_str()).collect();
    assert_eq!(
        names,
        [
            "buffalo_user_id",
            "buffalo_filename",
            "buffalo_read_access_mode",
            "buffalo_read_claims",
            "buffalo_write_access_mode",
            "buffalo_write_claims",
        ]
    );
}

#[test]
fn test_access_level_names() {
    let names: Vec<_> = AccessLevel::ALL.iter().map(|l| l.as_str()).collect();
    assert_eq!(names, ["Public", "AuthenticatedUser", "UserOwned", "Claims"]);

    assert_eq!(AccessLevel::from_wire("ORGANIZATION_OWNED"), Some(AccessLevel::AuthenticatedUser));
    assert_eq!(AccessLevel::from_wire("public"), None);
}

#[test]
fn test_claim_tree_json() {
    let tree = ClaimTree::all_of([
        ClaimTree::leaf("org", "acme"),
        ClaimTree::any_of([ClaimTree::leaf("role", "editor"), ClaimTree::leaf("role", "owner")]),
    ]);
    let json = encode_claims(&tree).unwrap();
    assert_eq!(
        json,
        concat!(
            r#"{"Type":"And","Items":["#,
            r#"{"Type":"Claim","Key":"org","Value":"acme"},"#,
            r#"{"Type":"Or","Items":["#,
            r#"{"Type":"Claim","Key":"role","Value":"editor"},"#,
            r#"{"Type":"Claim","Key":"role","Value":"owner"}]}]}"#,
        )
    );
    assert_eq!(decode_claims(&json).unwrap(), Some(tree));
}

#[test]
fn test_empty_nodes_decode_without_items() {
    assert_eq!(
        decode_claims(r#"{"Type":"And"}"#).unwrap(),
        Some(ClaimTree::all_of([]))
    );
    assert_eq!(
        decode_claims(r#"{"Type":"Or","Items":[]}"#).unwrap(),
        Some(ClaimTree::any_of([]))
    );
}

#[test]
fn test_policy_change_rewrites_claim_keys() {
    let claims = ObjectRecord::owned_by(Some("alice"), Some("a.txt")).with_policies(
        AccessPolicy::Claims(ClaimTree::leaf("sub", "bob")),
        AccessPolicy::UserOwned,
    );
    let stored = claims.to_metadata().unwrap();
    assert!(stored.contains_key("buffalo_read_claims"));

    let public = ObjectRecord::owned_by(Some("bob"), None)
        .with_policies(AccessPolicy::Public, AccessPolicy::UserOwned);
    let merged = public.merge_into(&stored).unwrap();

    assert_eq!(merged["buffalo_user_id"], "bob");
    assert_eq!(merged["buffalo_filename"], "a.txt");
    assert_eq!(merged["buffalo_read_access_mode"], "Public");
    assert!(!merged.contains_key("buffalo_read_claims"));
}

#[test]
fn test_update_body_json() {
    let body = UpdateFileMetadataBody::new(
        AccessPolicy::Claims(ClaimTree::leaf("team", "ops")),
        AccessPolicy::UserOwned,
    );
    let json = serde_json::to_string(&body).unwrap();
    assert_eq!(
        json,
        r#"{"read_access_level":"Claims","read_security_claims":{"Type":"Claim","Key":"team","Value":"ops"},"write_access_level":"UserOwned"}"#
    );
}
