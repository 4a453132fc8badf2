use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use occam_core::{CredentialId, EntityId};

/// The kind of secret material a vault record holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialKind {
    Username,
    Password,
    ApiKey,
    OauthToken,
    Secret,
}

/// A stored credential. The `ciphertext` field is an `ENC[AES256-GCM,...]`
/// envelope (spec.md §4.2); plaintext is never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultRecord {
    pub id: CredentialId,
    pub scope: String,
    pub kind: CredentialKind,
    pub ciphertext: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub last_used_at: Option<DateTime<Utc>>,
    pub usage_count: u64,
    pub owning_entity: Option<EntityId>,
    /// Set when this record has been rotated out in favor of a newer one.
    /// The old record is retained (not deleted) for the audit horizon.
    pub superseded_by: Option<CredentialId>,
    pub version: u32,
}

impl VaultRecord {
    #[must_use]
    pub fn is_expired_at(&self, at: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|deadline| at >= deadline)
    }
}
