use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{CredentialId, EntityId};

/// Metadata for a vault-held credential.
///
/// This type never carries plaintext or ciphertext secret material — that
/// lives behind `occam_vault::SecureVault` and is addressed by `id`. Keeping
/// metadata and secret bytes in separate crates means a `CredentialRecord`
/// can be logged, serialized into audit payloads, or passed across agent
/// boundaries without risk of leaking the secret itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialRecord {
    pub id: CredentialId,
    pub entity_id: EntityId,
    pub credential_type: String,
    pub created_at: DateTime<Utc>,
    pub rotated_at: DateTime<Utc>,
    pub rotation_due_at: DateTime<Utc>,
    pub version: u32,
}

impl CredentialRecord {
    /// Construct a fresh credential record at version 1.
    #[must_use]
    pub fn new(
        id: impl Into<CredentialId>,
        entity_id: impl Into<EntityId>,
        credential_type: impl Into<String>,
        now: DateTime<Utc>,
        rotation_period: chrono::Duration,
    ) -> Self {
        Self {
            id: id.into(),
            entity_id: entity_id.into(),
            credential_type: credential_type.into(),
            created_at: now,
            rotated_at: now,
            rotation_due_at: now + rotation_period,
            version: 1,
        }
    }

    /// Returns `true` if the credential is past its rotation deadline.
    #[must_use]
    pub fn is_rotation_due(&self, at: DateTime<Utc>) -> bool {
        at >= self.rotation_due_at
    }

    /// Record that a rotation happened, bumping version and resetting the
    /// rotation clock.
    pub fn mark_rotated(&mut self, now: DateTime<Utc>, rotation_period: chrono::Duration) {
        self.rotated_at = now;
        self.rotation_due_at = now + rotation_period;
        self.version += 1;
    }
}
