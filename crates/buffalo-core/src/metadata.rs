//! Metadata codec: policy records encoded as blob metadata.
//!
//! Every stored object carries its owner, filename and both policies as
//! string key/value pairs. The key names and value encodings here are the
//! only bit-exact contract between Buffalo and the blob store.
//!
//! ## Encoding
//!
//! | Key | Value |
//! |-----|-------|
//! | `buffalo_user_id` | owner identity, empty when uploaded anonymously |
//! | `buffalo_filename` | original filename |
//! | `buffalo_read_access_mode` | [`AccessLevel`] wire name |
//! | `buffalo_read_claims` | JSON [`ClaimTree`], only for `Claims` |
//! | `buffalo_write_access_mode` | [`AccessLevel`] wire name |
//! | `buffalo_write_claims` | JSON [`ClaimTree`], only for `Claims` |
//!
//! Decoding is deliberately split from encoding: [`ObjectRecord`] is what
//! Buffalo writes and is always well formed, [`StoredRecord`] is what it
//! reads back and can represent the damaged states that must fail closed.

use std::collections::BTreeMap;

use crate::claims::ClaimTree;
use crate::error::{CoreError, Result};
use crate::policy::{AccessLevel, AccessPolicy};

/// Raw metadata map as stored beside a blob.
pub type Metadata = BTreeMap<String, String>;

/// The metadata keys owned by Buffalo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetadataKey {
    UserId,
    Filename,
    ReadAccessMode,
    ReadClaims,
    WriteAccessMode,
    WriteClaims,
}

const KEY_NAMES: [(MetadataKey, &str); 6] = [
    (MetadataKey::UserId, "buffalo_user_id"),
    (MetadataKey::Filename, "buffalo_filename"),
    (MetadataKey::ReadAccessMode, "buffalo_read_access_mode"),
    (MetadataKey::ReadClaims, "buffalo_read_claims"),
    (MetadataKey::WriteAccessMode, "buffalo_write_access_mode"),
    (MetadataKey::WriteClaims, "buffalo_write_claims"),
];

impl MetadataKey {
    pub const ALL: [MetadataKey; 6] = [
        MetadataKey::UserId,
        MetadataKey::Filename,
        MetadataKey::ReadAccessMode,
        MetadataKey::ReadClaims,
        MetadataKey::WriteAccessMode,
        MetadataKey::WriteClaims,
    ];

    /// The wire name of this key.
    pub fn as_str(&self) -> &'static str {
        KEY_NAMES
            .iter()
            .find(|(key, _)| key == self)
            .map(|(_, name)| *name)
            .unwrap_or("")
    }

    /// Look up a key by wire name.
    pub fn from_wire(name: &str) -> Option<Self> {
        KEY_NAMES
            .iter()
            .find(|(_, n)| *n == name)
            .map(|(key, _)| *key)
    }
}

/// Which of an object's two policies a key pair belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Read,
    Write,
}

impl Slot {
    fn mode_key(self) -> MetadataKey {
        match self {
            Slot::Read => MetadataKey::ReadAccessMode,
            Slot::Write => MetadataKey::WriteAccessMode,
        }
    }

    fn claims_key(self) -> MetadataKey {
        match self {
            Slot::Read => MetadataKey::ReadClaims,
            Slot::Write => MetadataKey::WriteClaims,
        }
    }
}

/// A well-formed policy record, as Buffalo writes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRecord {
    /// Owner identity; `None` for anonymous uploads.
    pub owner_id: Option<String>,
    /// Original filename. `None` leaves any stored filename untouched on merge.
    pub filename: Option<String>,
    pub read_policy: AccessPolicy,
    pub write_policy: AccessPolicy,
}

impl ObjectRecord {
    /// A record with the default caller-owned policies.
    pub fn owned_by(owner_id: Option<&str>, filename: Option<&str>) -> Self {
        Self {
            owner_id: owner_id.map(str::to_string),
            filename: filename.map(str::to_string),
            read_policy: AccessPolicy::UserOwned,
            write_policy: AccessPolicy::UserOwned,
        }
    }

    pub fn with_policies(mut self, read_policy: AccessPolicy, write_policy: AccessPolicy) -> Self {
        self.read_policy = read_policy;
        self.write_policy = write_policy;
        self
    }

    /// Encode as a fresh metadata map.
    pub fn to_metadata(&self) -> Result<Metadata> {
        self.merge_into(&Metadata::new())
    }

    /// Overlay this record on existing metadata.
    ///
    /// Keys Buffalo does not own are preserved. Claim keys left over from a
    /// previous `Claims` policy are removed.
    pub fn merge_into(&self, existing: &Metadata) -> Result<Metadata> {
        let mut metadata = existing.clone();

        metadata.insert(
            MetadataKey::UserId.as_str().to_string(),
            self.owner_id.clone().unwrap_or_default(),
        );
        if let Some(filename) = &self.filename {
            metadata.insert(MetadataKey::Filename.as_str().to_string(), filename.clone());
        }

        write_policy(&mut metadata, Slot::Read, &self.read_policy)?;
        write_policy(&mut metadata, Slot::Write, &self.write_policy)?;

        Ok(metadata)
    }
}

fn write_policy(metadata: &mut Metadata, slot: Slot, policy: &AccessPolicy) -> Result<()> {
    metadata.insert(
        slot.mode_key().as_str().to_string(),
        policy.level().as_str().to_string(),
    );
    match policy.claims() {
        Some(tree) => {
            metadata.insert(slot.claims_key().as_str().to_string(), encode_claims(tree)?);
        }
        None => {
            metadata.remove(slot.claims_key().as_str());
        }
    }
    Ok(())
}

/// A policy as decoded from storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredPolicy {
    /// A well-formed policy.
    Policy(AccessPolicy),
    /// The level string is not one Buffalo knows. Denies everyone but admins.
    Unrecognized(String),
    /// Level is `Claims` but no tree is stored. Denies everyone but admins.
    MissingClaimTree,
}

impl StoredPolicy {
    /// The decoded level, if recognized.
    pub fn level(&self) -> Option<AccessLevel> {
        match self {
            StoredPolicy::Policy(policy) => Some(policy.level()),
            StoredPolicy::Unrecognized(_) => None,
            StoredPolicy::MissingClaimTree => Some(AccessLevel::Claims),
        }
    }

    pub fn is_public(&self) -> bool {
        matches!(self, StoredPolicy::Policy(AccessPolicy::Public))
    }
}

/// A policy record as read back from storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRecord {
    pub owner_id: Option<String>,
    pub filename: Option<String>,
    pub read: StoredPolicy,
    pub write: StoredPolicy,
}

impl StoredRecord {
    /// Decode the policy record from an object's metadata.
    ///
    /// A missing access-mode key or an undecodable claim tree is
    /// [`CoreError::PolicyCorrupt`]. An unknown level or a `Claims` level
    /// without a tree decodes successfully and is denied by the guard.
    pub fn decode(metadata: &Metadata) -> Result<Self> {
        Ok(Self {
            owner_id: non_empty(metadata, MetadataKey::UserId),
            filename: non_empty(metadata, MetadataKey::Filename),
            read: read_policy(metadata, Slot::Read)?,
            write: read_policy(metadata, Slot::Write)?,
        })
    }
}

fn non_empty(metadata: &Metadata, key: MetadataKey) -> Option<String> {
    metadata
        .get(key.as_str())
        .filter(|value| !value.is_empty())
        .cloned()
}

fn read_policy(metadata: &Metadata, slot: Slot) -> Result<StoredPolicy> {
    let mode_key = slot.mode_key().as_str();
    let mode = metadata
        .get(mode_key)
        .ok_or_else(|| CoreError::PolicyCorrupt(format!("missing {mode_key}")))?;

    let Some(level) = AccessLevel::from_wire(mode) else {
        return Ok(StoredPolicy::Unrecognized(mode.clone()));
    };

    if level != AccessLevel::Claims {
        // Levels without a tree never fail to build.
        return AccessPolicy::new(level, None).map(StoredPolicy::Policy);
    }

    let claims_key = slot.claims_key().as_str();
    let tree = match metadata.get(claims_key).filter(|raw| !raw.trim().is_empty()) {
        Some(raw) => decode_claims(raw)
            .map_err(|e| CoreError::PolicyCorrupt(format!("{claims_key}: {e}")))?,
        None => None,
    };

    Ok(match tree {
        Some(tree) => StoredPolicy::Policy(AccessPolicy::Claims(tree)),
        None => StoredPolicy::MissingClaimTree,
    })
}

/// Encode a claim tree for storage.
pub fn encode_claims(tree: &ClaimTree) -> Result<String> {
    serde_json::to_string(tree).map_err(|e| CoreError::EncodingError(e.to_string()))
}

/// Decode a stored claim tree.
///
/// Accepts a bare tree or the legacy `{"RootItem": tree}` envelope. A null
/// root item decodes to `None`.
pub fn decode_claims(raw: &str) -> Result<Option<ClaimTree>> {
    let value: serde_json::Value =
        serde_json::from_str(raw).map_err(|e| CoreError::EncodingError(e.to_string()))?;

    let tree = match value {
        serde_json::Value::Object(mut map) if map.contains_key("RootItem") => {
            let root = map.remove("RootItem").unwrap_or(serde_json::Value::Null);
            serde_json::from_value::<Option<ClaimTree>>(root)
        }
        other => serde_json::from_value::<ClaimTree>(other).map(Some),
    };

    tree.map_err(|e| CoreError::EncodingError(e.to_string()))
}
