use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use occam_core::{AuditEvent, EventId, OccamResult, DEFAULT_AUDIT_RETENTION_DAYS};

use crate::query::{AuditPage, AuditQuery};
use crate::store::AuditStore;

/// In-memory `AuditStore` backing, analogous to the teacher's `MemoryAudit`
/// test fixture but exposed as a real (non-test-only) implementation
/// suitable for single-process deployments.
///
/// This is the one store in the decorator chain that actually owns the
/// backing `Vec`, so it is also the one that stamps `retention_deadline` on
/// every event it persists (spec.md §3) — callers and decorators never set
/// it themselves, the same way only `HashChainAuditStore` sets the
/// hash-chain fields.
pub struct InMemoryAuditStore {
    events: RwLock<Vec<AuditEvent>>,
    retention_days: i64,
}

impl Default for InMemoryAuditStore {
    fn default() -> Self {
        Self {
            events: RwLock::new(Vec::new()),
            retention_days: DEFAULT_AUDIT_RETENTION_DAYS,
        }
    }
}

impl InMemoryAuditStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the retention horizon used to stamp `retention_deadline` on
    /// append (spec.md §3's `audit_retention_days`).
    #[must_use]
    pub fn with_retention_days(mut self, retention_days: i64) -> Self {
        self.retention_days = retention_days;
        self
    }
}

#[async_trait]
impl AuditStore for InMemoryAuditStore {
    async fn append(&self, event: AuditEvent) -> OccamResult<AuditEvent> {
        let deadline = event.occurred_at + chrono::Duration::days(self.retention_days);
        let event = event.with_retention_deadline(deadline);
        let mut guard = self.events.write().await;
        guard.push(event.clone());
        Ok(event)
    }

    async fn get(&self, id: &EventId) -> OccamResult<Option<AuditEvent>> {
        let guard = self.events.read().await;
        Ok(guard.iter().find(|e| &e.id == id).cloned())
    }

    async fn query(&self, query: &AuditQuery) -> OccamResult<AuditPage> {
        let guard = self.events.read().await;
        let mut matched: Vec<&AuditEvent> = guard
            .iter()
            .filter(|e| {
                query
                    .workflow_id
                    .as_ref()
                    .map_or(true, |w| e.workflow_id.as_ref() == Some(w))
            })
            .filter(|e| {
                query
                    .entity_id
                    .as_ref()
                    .map_or(true, |id| e.entity_id.as_ref() == Some(id))
            })
            .filter(|e| query.trace_id.as_ref().map_or(true, |t| &e.trace_id == t))
            .filter(|e| query.min_severity.map_or(true, |s| e.severity >= s))
            .filter(|e| query.since.map_or(true, |since| e.occurred_at >= since))
            .filter(|e| query.until.map_or(true, |until| e.occurred_at <= until))
            .collect();
        matched.sort_by(|a, b| a.occurred_at.cmp(&b.occurred_at).then_with(|| a.id.as_str().cmp(b.id.as_str())));

        let total_matched = matched.len();
        let offset = query.effective_offset();
        let limit = query.effective_limit();
        let page: Vec<AuditEvent> = matched
            .into_iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect();
        let has_more = offset + page.len() < total_matched;

        Ok(AuditPage {
            events: page,
            total_matched,
            has_more,
        })
    }

    /// Deletion before `retention_deadline` is forbidden (spec.md §4.1 line
    /// 58), so an event is only eligible once its own deadline has passed,
    /// not merely because `occurred_at < cutoff`. An event with no deadline
    /// yet assigned (should not happen once `append` always stamps one) is
    /// kept rather than guessed at.
    async fn purge_before(&self, cutoff: DateTime<Utc>) -> OccamResult<u64> {
        let mut guard = self.events.write().await;
        let before = guard.len();
        guard.retain(|e| e.retention_deadline.map_or(true, |deadline| deadline > cutoff));
        Ok((before - guard.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use occam_core::{EventStatus, Severity, TraceId};

    fn sample_event(stage: &str, severity: Severity) -> AuditEvent {
        AuditEvent::new(
            TraceId::generate(),
            stage,
            EventStatus::Succeeded,
            severity,
            "ok",
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn append_then_get_roundtrips() {
        let store = InMemoryAuditStore::new();
        let event = sample_event("kyc.verify", Severity::Info);
        let id = event.id.clone();
        store.append(event).await.unwrap();
        let fetched = store.get(&id).await.unwrap();
        assert!(fetched.is_some());
    }

    #[tokio::test]
    async fn query_filters_by_severity() {
        let store = InMemoryAuditStore::new();
        store.append(sample_event("a", Severity::Info)).await.unwrap();
        store
            .append(sample_event("b", Severity::Critical))
            .await
            .unwrap();

        let page = store
            .query(&AuditQuery {
                min_severity: Some(Severity::Critical),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page.events.len(), 1);
        assert_eq!(page.events[0].stage, "b");
    }

    #[tokio::test]
    async fn query_paginates() {
        let store = InMemoryAuditStore::new();
        for i in 0..5 {
            store
                .append(sample_event(&format!("stage-{i}"), Severity::Info))
                .await
                .unwrap();
        }
        let page = store
            .query(&AuditQuery {
                limit: Some(2),
                offset: Some(1),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page.events.len(), 2);
        assert_eq!(page.total_matched, 5);
        assert!(page.has_more);
    }

    #[tokio::test]
    async fn purge_before_removes_events_past_their_deadline() {
        let store = InMemoryAuditStore::new().with_retention_days(0);
        let old = sample_event("old", Severity::Info);
        store.append(old).await.unwrap();
        let cutoff = Utc::now() + chrono::Duration::seconds(1);
        let purged = store.purge_before(cutoff).await.unwrap();
        assert_eq!(purged, 1);
    }

    #[tokio::test]
    async fn purge_before_keeps_events_within_retention_window() {
        let store = InMemoryAuditStore::new();
        let recent = sample_event("recent", Severity::Info);
        store.append(recent).await.unwrap();
        let cutoff = Utc::now() + chrono::Duration::seconds(1);
        let purged = store.purge_before(cutoff).await.unwrap();
        assert_eq!(purged, 0);
    }
}
