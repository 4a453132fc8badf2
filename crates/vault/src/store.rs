use async_trait::async_trait;
use chrono::{DateTime, Utc};

use occam_core::{CredentialId, MasterKey, OccamResult, SecretString};

use crate::record::{CredentialKind, VaultRecord};

/// Encrypt, store, rotate, and expire sensitive material.
///
/// Every method is `&self` so the trait can be shared behind `Arc<dyn
/// SecureVault>` the way `occam-audit`'s `AuditStore` and the teacher's
/// `DistributedLock` are; `rotate_master_key` is the one operation that
/// needs exclusivity against every other method, which implementations
/// provide internally (see `InMemorySecureVault`'s single `RwLock` over
/// both the record map and the active encryptor).
#[async_trait]
pub trait SecureVault: Send + Sync {
    /// Seal `plaintext` under the vault's current master key and persist
    /// it. `plaintext` is zeroized once encryption completes.
    async fn store(
        &self,
        scope: &str,
        kind: CredentialKind,
        plaintext: String,
        expires_at: Option<DateTime<Utc>>,
    ) -> OccamResult<CredentialId>;

    /// Fetch and decrypt a credential. Returns
    /// [`occam_core::OccamError::Expired`] if the credential has passed its
    /// `expires_at` — the caller never receives plaintext for an expired
    /// credential through this method.
    async fn get(&self, id: &CredentialId) -> OccamResult<SecretString>;

    /// Re-encrypt a credential's current plaintext under a fresh id,
    /// marking the old record superseded but retained. Works even on an
    /// expired credential, since expired credentials are fetchable only
    /// for rotation.
    async fn rotate(&self, id: &CredentialId) -> OccamResult<CredentialId>;

    /// Remove a credential outright.
    async fn delete(&self, id: &CredentialId) -> OccamResult<()>;

    /// Re-encrypt every stored record under `new_key` and swap it in as
    /// the active master key. All-or-nothing: if any record fails to
    /// decrypt or re-encrypt, no record is mutated and the vault remains
    /// readable with the old key.
    async fn rotate_master_key(&self, new_key: MasterKey) -> OccamResult<()>;

    /// Inspect a record's metadata without decrypting it.
    async fn describe(&self, id: &CredentialId) -> OccamResult<Option<VaultRecord>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn _assert_object_safe(_: &dyn SecureVault) {}
}
