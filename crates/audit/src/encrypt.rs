use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use occam_core::{AuditEvent, EventId, OccamError, OccamResult, PayloadEncryptor};

use crate::query::{AuditPage, AuditQuery};
use crate::store::AuditStore;

/// Encrypts an event's `details` field before storage and decrypts it on
/// read. All other audit fields stay plaintext so they remain queryable and
/// so the hash chain can still be computed without the master key.
///
/// Wrapping order should be `EncryptingAuditStore(RedactingAuditStore(Inner))`
/// — redaction on plaintext, then encryption, matching the teacher's
/// `EncryptingAuditStore` wrapping-order doc comment.
pub struct EncryptingAuditStore<S> {
    inner: Arc<S>,
    encryptor: Arc<PayloadEncryptor>,
}

impl<S: AuditStore> EncryptingAuditStore<S> {
    #[must_use]
    pub fn new(inner: Arc<S>, encryptor: Arc<PayloadEncryptor>) -> Self {
        Self { inner, encryptor }
    }

    fn decrypt_record(&self, event: &mut AuditEvent) -> OccamResult<()> {
        if let serde_json::Value::String(s) = &event.details {
            if occam_core::crypto::is_encrypted(s) {
                event.details = self
                    .encryptor
                    .decrypt_json(s)
                    .map_err(|e| OccamError::Integrity(format!("audit payload decryption failed: {e}")))?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl<S: AuditStore> AuditStore for EncryptingAuditStore<S> {
    async fn append(&self, mut event: AuditEvent) -> OccamResult<AuditEvent> {
        if !event.details.is_null() {
            let encrypted = self
                .encryptor
                .encrypt_json(&event.details)
                .map_err(|e| OccamError::Integrity(format!("audit payload encryption failed: {e}")))?;
            event.details = serde_json::Value::String(encrypted);
        }
        let mut persisted = self.inner.append(event).await?;
        self.decrypt_record(&mut persisted)?;
        Ok(persisted)
    }

    async fn get(&self, id: &EventId) -> OccamResult<Option<AuditEvent>> {
        match self.inner.get(id).await? {
            Some(mut event) => {
                self.decrypt_record(&mut event)?;
                Ok(Some(event))
            }
            None => Ok(None),
        }
    }

    async fn query(&self, query: &AuditQuery) -> OccamResult<AuditPage> {
        let mut page = self.inner.query(query).await?;
        for event in &mut page.events {
            self.decrypt_record(event)?;
        }
        Ok(page)
    }

    async fn purge_before(&self, cutoff: DateTime<Utc>) -> OccamResult<u64> {
        self.inner.purge_before(cutoff).await
    }
}
