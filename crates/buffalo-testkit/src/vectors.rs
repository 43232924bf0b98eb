//! Golden metadata vectors.
//!
//! Each vector is a metadata map as a blob store would hold it, paired with
//! the record it must decode to. Canonical vectors must also be produced
//! byte for byte when that record is encoded again.

use buffalo_core::{
    AccessPolicy, ClaimTree, Metadata, ObjectRecord, StoredPolicy, StoredRecord,
};

/// What a vector decodes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expected {
    Record(StoredRecord),
    /// Decoding fails with a corrupt-policy error.
    Corrupt,
}

/// A golden test vector.
#[derive(Debug, Clone)]
pub struct MetadataVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    pub metadata: Vec<(&'static str, &'static str)>,
    pub expected: Expected,
    /// Whether encoding the expected record reproduces `metadata` exactly.
    pub canonical: bool,
}

impl MetadataVector {
    pub fn metadata(&self) -> Metadata {
        self.metadata
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }
}

fn record(
    owner: Option<&str>,
    filename: Option<&str>,
    read: StoredPolicy,
    write: StoredPolicy,
) -> Expected {
    Expected::Record(StoredRecord {
        owner_id: owner.map(str::to_string),
        filename: filename.map(str::to_string),
        read,
        write,
    })
}

fn policy(policy: AccessPolicy) -> StoredPolicy {
    StoredPolicy::Policy(policy)
}

/// Get all golden test vectors.
pub fn all_vectors() -> Vec<MetadataVector> {
    vec![
        MetadataVector {
            name: "default upload policies",
            metadata: vec![
                ("buffalo_user_id", "alice"),
                ("buffalo_filename", "report.pdf"),
                ("buffalo_read_access_mode", "UserOwned"),
                ("buffalo_write_access_mode", "UserOwned"),
            ],
            expected: record(
                Some("alice"),
                Some("report.pdf"),
                policy(AccessPolicy::UserOwned),
                policy(AccessPolicy::UserOwned),
            ),
            canonical: true,
        },
        MetadataVector {
            name: "public read, authenticated write",
            metadata: vec![
                ("buffalo_user_id", "bob"),
                ("buffalo_read_access_mode", "Public"),
                ("buffalo_write_access_mode", "AuthenticatedUser"),
            ],
            expected: record(
                Some("bob"),
                None,
                policy(AccessPolicy::Public),
                policy(AccessPolicy::AuthenticatedUser),
            ),
            canonical: true,
        },
        MetadataVector {
            name: "claims leaf",
            metadata: vec![
                ("buffalo_user_id", "alice"),
                ("buffalo_read_access_mode", "Claims"),
                (
                    "buffalo_read_claims",
                    r#"{"Type":"Claim","Key":"sub","Value":"bob"}"#,
                ),
                ("buffalo_write_access_mode", "UserOwned"),
            ],
            expected: record(
                Some("alice"),
                None,
                policy(AccessPolicy::Claims(ClaimTree::leaf("sub", "bob"))),
                policy(AccessPolicy::UserOwned),
            ),
            canonical: true,
        },
        MetadataVector {
            name: "claims or tree",
            metadata: vec![
                ("buffalo_user_id", "alice"),
                ("buffalo_read_access_mode", "Claims"),
                (
                    "buffalo_read_claims",
                    r#"{"Type":"Or","Items":[{"Type":"Claim","Key":"sub","Value":"alice"},{"Type":"Claim","Key":"sub","Value":"bob"}]}"#,
                ),
                ("buffalo_write_access_mode", "Claims"),
                (
                    "buffalo_write_claims",
                    r#"{"Type":"And","Items":[{"Type":"Claim","Key":"team","Value":"ops"},{"Type":"Claim","Key":"role","Value":"editor"}]}"#,
                ),
            ],
            expected: record(
                Some("alice"),
                None,
                policy(AccessPolicy::Claims(ClaimTree::any_of([
                    ClaimTree::leaf("sub", "alice"),
                    ClaimTree::leaf("sub", "bob"),
                ]))),
                policy(AccessPolicy::Claims(ClaimTree::all_of([
                    ClaimTree::leaf("team", "ops"),
                    ClaimTree::leaf("role", "editor"),
                ]))),
            ),
            canonical: true,
        },
        MetadataVector {
            name: "anonymous owner",
            metadata: vec![
                ("buffalo_user_id", ""),
                ("buffalo_read_access_mode", "Public"),
                ("buffalo_write_access_mode", "Public"),
            ],
            expected: record(
                None,
                None,
                policy(AccessPolicy::Public),
                policy(AccessPolicy::Public),
            ),
            canonical: true,
        },
        MetadataVector {
            name: "legacy level names",
            metadata: vec![
                ("buffalo_user_id", "carol"),
                ("buffalo_read_access_mode", "ORGANIZATION_OWNED"),
                ("buffalo_write_access_mode", "USER_OWNED"),
            ],
            expected: record(
                Some("carol"),
                None,
                policy(AccessPolicy::AuthenticatedUser),
                policy(AccessPolicy::UserOwned),
            ),
            canonical: false,
        },
        MetadataVector {
            name: "legacy root item envelope",
            metadata: vec![
                ("buffalo_user_id", "carol"),
                ("buffalo_read_access_mode", "CLAIMS"),
                (
                    "buffalo_read_claims",
                    r#"{"RootItem":{"Type":"Claim","Key":"role","Value":"auditor"}}"#,
                ),
                ("buffalo_write_access_mode", "PUBLIC"),
            ],
            expected: record(
                Some("carol"),
                None,
                policy(AccessPolicy::Claims(ClaimTree::leaf("role", "auditor"))),
                policy(AccessPolicy::Public),
            ),
            canonical: false,
        },
        MetadataVector {
            name: "null root item",
            metadata: vec![
                ("buffalo_user_id", "carol"),
                ("buffalo_read_access_mode", "Claims"),
                ("buffalo_read_claims", r#"{"RootItem":null}"#),
                ("buffalo_write_access_mode", "UserOwned"),
            ],
            expected: record(
                Some("carol"),
                None,
                StoredPolicy::MissingClaimTree,
                policy(AccessPolicy::UserOwned),
            ),
            canonical: false,
        },
        MetadataVector {
            name: "unknown level",
            metadata: vec![
                ("buffalo_user_id", "dave"),
                ("buffalo_read_access_mode", "TeamOwned"),
                ("buffalo_write_access_mode", "UserOwned"),
            ],
            expected: record(
                Some("dave"),
                None,
                StoredPolicy::Unrecognized("TeamOwned".to_string()),
                policy(AccessPolicy::UserOwned),
            ),
            canonical: false,
        },
        MetadataVector {
            name: "claims level without tree",
            metadata: vec![
                ("buffalo_user_id", "dave"),
                ("buffalo_read_access_mode", "UserOwned"),
                ("buffalo_write_access_mode", "Claims"),
            ],
            expected: record(
                Some("dave"),
                None,
                policy(AccessPolicy::UserOwned),
                StoredPolicy::MissingClaimTree,
            ),
            canonical: false,
        },
        MetadataVector {
            name: "missing write mode",
            metadata: vec![
                ("buffalo_user_id", "erin"),
                ("buffalo_read_access_mode", "Public"),
            ],
            expected: Expected::Corrupt,
            canonical: false,
        },
        MetadataVector {
            name: "malformed claim json",
            metadata: vec![
                ("buffalo_user_id", "erin"),
                ("buffalo_read_access_mode", "Claims"),
                ("buffalo_read_claims", r#"{"Type":"Claim","Key":"sub""#),
                ("buffalo_write_access_mode", "UserOwned"),
            ],
            expected: Expected::Corrupt,
            canonical: false,
        },
    ]
}

/// Re-encode a decoded record, if every policy in it is well formed.
fn encode(record: &StoredRecord) -> Option<ObjectRecord> {
    match (&record.read, &record.write) {
        (StoredPolicy::Policy(read), StoredPolicy::Policy(write)) => Some(
            ObjectRecord::owned_by(record.owner_id.as_deref(), record.filename.as_deref())
                .with_policies(read.clone(), write.clone()),
        ),
        _ => None,
    }
}

/// Verify a single vector.
pub fn verify_vector(vector: &MetadataVector) -> Result<(), String> {
    let metadata = vector.metadata();
    let decoded = StoredRecord::decode(&metadata);

    match (&vector.expected, decoded) {
        (Expected::Corrupt, Err(_)) => Ok(()),
        (Expected::Corrupt, Ok(record)) => {
            Err(format!("{}: expected corrupt, decoded {record:?}", vector.name))
        }
        (Expected::Record(_), Err(e)) => Err(format!("{}: decode failed: {e}", vector.name)),
        (Expected::Record(expected), Ok(record)) => {
            if &record != expected {
                return Err(format!(
                    "{}: decoded {record:?}, expected {expected:?}",
                    vector.name
                ));
            }
            if !vector.canonical {
                return Ok(());
            }

            let encoded = encode(&record)
                .ok_or_else(|| format!("{}: canonical vector is not encodable", vector.name))?
                .to_metadata()
                .map_err(|e| format!("{}: encode failed: {e}", vector.name))?;
            if encoded != metadata {
                return Err(format!(
                    "{}: encoded {encoded:?}, expected {metadata:?}",
                    vector.name
                ));
            }
            Ok(())
        }
    }
}

/// Verify all golden vectors.
pub fn verify_all_vectors() -> Result<(), String> {
    all_vectors().iter().try_for_each(verify_vector)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_vectors_verify() {
        for vector in all_vectors() {
            verify_vector(&vector).unwrap();
        }
    }

    #[test]
    fn test_vector_names_are_unique() {
        let vectors = all_vectors();
        let mut names: Vec<_> = vectors.iter().map(|v| v.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), vectors.len());
    }

    #[test]
    fn test_mismatch_is_reported() {
        let mut vector = all_vectors().remove(0);
        vector.expected = Expected::Corrupt;
        assert!(verify_vector(&vector).is_err());
    }
}
