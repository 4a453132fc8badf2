use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use occam_core::{AuditEvent, EventId, OccamResult};

use crate::query::{AuditPage, AuditQuery};
use crate::store::AuditStore;

const REDACTED_KEYS: &[&str] = &[
    "password",
    "secret",
    "api_key",
    "credential",
    "token",
    "ssn",
    "tax_id",
];

fn redact_value(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut redacted = serde_json::Map::with_capacity(map.len());
            for (key, v) in map {
                let lower = key.to_lowercase();
                if REDACTED_KEYS.iter().any(|k| lower.contains(k)) {
                    redacted.insert(key.clone(), Value::String("[REDACTED]".into()));
                } else {
                    redacted.insert(key.clone(), redact_value(v));
                }
            }
            Value::Object(redacted)
        }
        Value::Array(items) => Value::Array(items.iter().map(redact_value).collect()),
        other => other.clone(),
    }
}

/// Strips sensitive field values out of `details` before the record reaches
/// storage or any downstream encryption step, so a compromised master key
/// or a store-level read never exposes a secret that should never have been
/// audited verbatim in the first place.
///
/// Must sit innermost among the audit decorators so redaction runs on the
/// original plaintext payload: `EncryptingAuditStore(RedactingAuditStore(Inner))`.
pub struct RedactingAuditStore<S> {
    inner: Arc<S>,
}

impl<S: AuditStore> RedactingAuditStore<S> {
    #[must_use]
    pub fn new(inner: Arc<S>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<S: AuditStore> AuditStore for RedactingAuditStore<S> {
    async fn append(&self, mut event: AuditEvent) -> OccamResult<AuditEvent> {
        event.details = redact_value(&event.details);
        self.inner.append(event).await
    }

    async fn get(&self, id: &EventId) -> OccamResult<Option<AuditEvent>> {
        self.inner.get(id).await
    }

    async fn query(&self, query: &AuditQuery) -> OccamResult<AuditPage> {
        self.inner.query(query).await
    }

    async fn purge_before(&self, cutoff: DateTime<Utc>) -> OccamResult<u64> {
        self.inner.purge_before(cutoff).await
    }
}
