use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::instrument;
use zeroize::Zeroize;

use occam_audit::AuditStore;
use occam_core::{
    Clock, CredentialId, MasterKey, OccamError, OccamResult, PasswordPolicy, PayloadEncryptor,
    SecretString, TraceId,
};

use crate::password::evaluate_password;
use crate::record::{CredentialKind, VaultRecord};
use crate::store::SecureVault;

struct VaultState {
    records: HashMap<CredentialId, VaultRecord>,
    encryptor: Arc<PayloadEncryptor>,
}

/// In-memory [`SecureVault`] backing. Records and the active encryptor live
/// behind a single `RwLock` so `rotate_master_key` can hold the write half
/// for the duration of its all-or-nothing re-encryption pass — no other
/// vault operation can observe a partially-rotated state, mirroring the
/// teacher's `MemoryStateStore` single-lock-per-invariant approach
/// (`acteon-state-memory/src/store.rs`) rather than introducing a
/// dedicated distributed-lock dependency this single-process vault does
/// not need.
pub struct InMemorySecureVault {
    state: RwLock<VaultState>,
    clock: Arc<dyn Clock>,
    audit: Arc<dyn AuditStore>,
    password_policy: PasswordPolicy,
}

impl InMemorySecureVault {
    #[must_use]
    pub fn new(master_key: MasterKey, clock: Arc<dyn Clock>, audit: Arc<dyn AuditStore>) -> Self {
        Self::with_password_policy(master_key, clock, audit, PasswordPolicy::default())
    }

    #[must_use]
    pub fn with_password_policy(
        master_key: MasterKey,
        clock: Arc<dyn Clock>,
        audit: Arc<dyn AuditStore>,
        password_policy: PasswordPolicy,
    ) -> Self {
        Self {
            state: RwLock::new(VaultState {
                records: HashMap::new(),
                encryptor: Arc::new(PayloadEncryptor::new(master_key)),
            }),
            clock,
            audit,
            password_policy,
        }
    }

    /// Record a rejected weak-password submission. No record is stored.
    async fn audit_weak_password(&self, scope: &str, now: DateTime<Utc>) {
        let event = occam_core::AuditEvent::new(
            TraceId::generate(),
            "vault.store",
            occam_core::EventStatus::Failed,
            occam_core::Severity::Warning,
            "credential rejected: weak_password",
            now,
        )
        .with_details(serde_json::json!({ "reason": "weak_password", "scope": scope }));
        if let Err(err) = self.audit.append(event).await {
            tracing::warn!(error = %err, "failed to record weak-password audit event");
        }
    }
}

#[async_trait]
impl SecureVault for InMemorySecureVault {
    #[instrument(skip(self, plaintext))]
    async fn store(
        &self,
        scope: &str,
        kind: CredentialKind,
        mut plaintext: String,
        expires_at: Option<DateTime<Utc>>,
    ) -> OccamResult<CredentialId> {
        let now = self.clock.now();

        if kind == CredentialKind::Password {
            let eval = evaluate_password(&plaintext, &self.password_policy);
            if !eval.meets_policy {
                plaintext.zeroize();
                self.audit_weak_password(scope, now).await;
                return Err(OccamError::Validation("weak_password".into()));
            }
        }

        let mut state = self.state.write().await;
        let ciphertext = state
            .encryptor
            .encrypt_str(&plaintext)
            .map_err(|e| OccamError::Integrity(format!("vault encryption failed: {e}")))?;
        plaintext.zeroize();

        let id = CredentialId::generate();
        state.records.insert(
            id.clone(),
            VaultRecord {
                id: id.clone(),
                scope: scope.to_owned(),
                kind,
                ciphertext,
                created_at: now,
                expires_at,
                last_used_at: None,
                usage_count: 0,
                owning_entity: None,
                superseded_by: None,
                version: 1,
            },
        );
        Ok(id)
    }

    async fn get(&self, id: &CredentialId) -> OccamResult<SecretString> {
        let now = self.clock.now();
        let mut state = self.state.write().await;
        let encryptor = state.encryptor.clone();
        let record = state
            .records
            .get_mut(id)
            .ok_or_else(|| OccamError::NotFound(format!("credential {id} not found")))?;

        if record.is_expired_at(now) {
            return Err(OccamError::Expired(format!("credential {id} has expired")));
        }

        let plaintext = encryptor
            .decrypt_str(&record.ciphertext)
            .map_err(|e| OccamError::Integrity(format!("vault decryption failed: {e}")))?;

        record.last_used_at = Some(now);
        record.usage_count += 1;

        Ok(SecretString::new(plaintext))
    }

    async fn rotate(&self, id: &CredentialId) -> OccamResult<CredentialId> {
        let now = self.clock.now();
        let mut state = self.state.write().await;
        let encryptor = state.encryptor.clone();

        let old = state
            .records
            .get(id)
            .ok_or_else(|| OccamError::NotFound(format!("credential {id} not found")))?
            .clone();

        let plaintext = encryptor
            .decrypt_str(&old.ciphertext)
            .map_err(|e| OccamError::Integrity(format!("vault decryption failed: {e}")))?;
        let ciphertext = encryptor
            .encrypt_str(&plaintext)
            .map_err(|e| OccamError::Integrity(format!("vault encryption failed: {e}")))?;

        let new_id = CredentialId::generate();
        let new_record = VaultRecord {
            id: new_id.clone(),
            scope: old.scope.clone(),
            kind: old.kind,
            ciphertext,
            created_at: now,
            expires_at: old.expires_at,
            last_used_at: None,
            usage_count: 0,
            owning_entity: old.owning_entity.clone(),
            superseded_by: None,
            version: old.version + 1,
        };

        state.records.insert(new_id.clone(), new_record);
        if let Some(existing) = state.records.get_mut(id) {
            existing.superseded_by = Some(new_id.clone());
        }

        Ok(new_id)
    }

    async fn delete(&self, id: &CredentialId) -> OccamResult<()> {
        let mut state = self.state.write().await;
        state
            .records
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| OccamError::NotFound(format!("credential {id} not found")))
    }

    #[instrument(skip(self, new_key))]
    async fn rotate_master_key(&self, new_key: MasterKey) -> OccamResult<()> {
        let mut state = self.state.write().await;
        let old_encryptor = state.encryptor.clone();
        let new_encryptor = Arc::new(PayloadEncryptor::new(new_key));

        // Stage every re-encrypted ciphertext before mutating anything, so
        // a failure partway through leaves the vault fully readable under
        // the old key.
        let mut staged = HashMap::with_capacity(state.records.len());
        for (id, record) in &state.records {
            let plaintext = old_encryptor
                .decrypt_str(&record.ciphertext)
                .map_err(|e| OccamError::Integrity(format!("rotation decrypt failed for {id}: {e}")))?;
            let ciphertext = new_encryptor
                .encrypt_str(&plaintext)
                .map_err(|e| OccamError::Integrity(format!("rotation encrypt failed for {id}: {e}")))?;
            staged.insert(id.clone(), ciphertext);
        }

        for (id, ciphertext) in staged {
            if let Some(record) = state.records.get_mut(&id) {
                record.ciphertext = ciphertext;
            }
        }
        state.encryptor = new_encryptor;

        Ok(())
    }

    async fn describe(&self, id: &CredentialId) -> OccamResult<Option<VaultRecord>> {
        let state = self.state.read().await;
        Ok(state.records.get(id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use occam_audit::InMemoryAuditStore;
    use occam_core::crypto::parse_master_key;
    use occam_core::{ExposeSecret, SystemClock};

    fn vault() -> InMemorySecureVault {
        let key = parse_master_key(&"11".repeat(32)).unwrap();
        InMemorySecureVault::new(key, Arc::new(SystemClock), Arc::new(InMemoryAuditStore::new()))
    }

    #[tokio::test]
    async fn store_then_get_roundtrips_plaintext() {
        let vault = vault();
        let id = vault
            .store("https://portal.example", CredentialKind::Password, "Tr0ub4dor&3xtra!".into(), None)
            .await
            .unwrap();
        let plaintext = vault.get(&id).await.unwrap();
        assert_eq!(plaintext.expose_secret(), "Tr0ub4dor&3xtra!");
    }

    #[tokio::test]
    async fn weak_password_is_rejected_and_never_stored() {
        let vault = vault();
        let result = vault
            .store("https://portal.example", CredentialKind::Password, "password123".into(), None)
            .await;
        assert!(matches!(result, Err(OccamError::Validation(ref msg)) if msg == "weak_password"));

        let events = vault
            .audit
            .query(&occam_audit::AuditQuery::default())
            .await
            .unwrap();
        assert_eq!(events.events.len(), 1);
        assert_eq!(events.events[0].severity, occam_core::Severity::Warning);
    }

    #[tokio::test]
    async fn get_tracks_usage() {
        let vault = vault();
        let id = vault
            .store("scope", CredentialKind::ApiKey, "key-123".into(), None)
            .await
            .unwrap();
        vault.get(&id).await.unwrap();
        vault.get(&id).await.unwrap();
        let record = vault.describe(&id).await.unwrap().unwrap();
        assert_eq!(record.usage_count, 2);
        assert!(record.last_used_at.is_some());
    }

    #[tokio::test]
    async fn expired_credential_is_not_returned() {
        let vault = vault();
        let past = Utc::now() - chrono::Duration::hours(1);
        let id = vault
            .store("scope", CredentialKind::Secret, "s3cr3t".into(), Some(past))
            .await
            .unwrap();
        let result = vault.get(&id).await;
        assert!(matches!(result, Err(OccamError::Expired(_))));
    }

    #[tokio::test]
    async fn rotate_preserves_plaintext_under_new_id() {
        let vault = vault();
        let id = vault
            .store("scope", CredentialKind::Secret, "original".into(), None)
            .await
            .unwrap();
        let new_id = vault.rotate(&id).await.unwrap();
        assert_ne!(id, new_id);

        let new_plaintext = vault.get(&new_id).await.unwrap();
        assert_eq!(new_plaintext.expose_secret(), "original");

        let old_record = vault.describe(&id).await.unwrap().unwrap();
        assert_eq!(old_record.superseded_by, Some(new_id));
    }

    #[tokio::test]
    async fn rotate_works_on_expired_credential() {
        let vault = vault();
        let past = Utc::now() - chrono::Duration::hours(1);
        let id = vault
            .store("scope", CredentialKind::Secret, "expiring".into(), Some(past))
            .await
            .unwrap();
        let new_id = vault.rotate(&id).await.unwrap();
        let plaintext = vault.get(&new_id).await.unwrap();
        assert_eq!(plaintext.expose_secret(), "expiring");
    }

    #[tokio::test]
    async fn delete_removes_record() {
        let vault = vault();
        let id = vault
            .store("scope", CredentialKind::Username, "alice".into(), None)
            .await
            .unwrap();
        vault.delete(&id).await.unwrap();
        assert!(vault.describe(&id).await.unwrap().is_none());
        assert!(matches!(vault.get(&id).await, Err(OccamError::NotFound(_))));
    }

    #[tokio::test]
    async fn master_key_rotation_preserves_every_credential() {
        let vault = vault();
        let id_a = vault
            .store("scope-a", CredentialKind::Secret, "alpha".into(), None)
            .await
            .unwrap();
        let id_b = vault
            .store("scope-b", CredentialKind::ApiKey, "beta".into(), None)
            .await
            .unwrap();

        let new_key = parse_master_key(&"22".repeat(32)).unwrap();
        vault.rotate_master_key(new_key).await.unwrap();

        assert_eq!(vault.get(&id_a).await.unwrap().expose_secret(), "alpha");
        assert_eq!(vault.get(&id_b).await.unwrap().expose_secret(), "beta");
    }
}
