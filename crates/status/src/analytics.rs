use std::collections::HashMap;

use chrono::{DateTime, Utc};

use occam_audit::{AuditQuery, AuditStore};
use occam_core::{EntityId, EventStatus, OccamResult};

const BATCH_SIZE: usize = 1_000;

/// Rollup over an entity's audit events within a window, computed without
/// re-scanning the whole audit log for every `generate_summary` call.
#[derive(Debug, Clone, Default)]
pub struct AnalyticsSnapshot {
    pub total_events: u64,
    pub by_status: HashMap<String, u64>,
    pub by_stage: HashMap<String, u64>,
}

impl AnalyticsSnapshot {
    #[must_use]
    pub fn error_rate(&self) -> f64 {
        if self.total_events == 0 {
            return 0.0;
        }
        let failed = *self.by_status.get("failed").unwrap_or(&0);
        #[allow(clippy::cast_precision_loss)]
        {
            failed as f64 / self.total_events as f64
        }
    }
}

/// Fetch every audit event for `entity_id` since `since` (batched at
/// [`BATCH_SIZE`] to bound memory) and roll it up by status and stage.
pub async fn compute_analytics(audit: &dyn AuditStore, entity_id: &EntityId, since: DateTime<Utc>, now: DateTime<Utc>) -> OccamResult<AnalyticsSnapshot> {
    let mut snapshot = AnalyticsSnapshot::default();
    let mut offset = 0usize;

    loop {
        let query = AuditQuery {
            entity_id: Some(entity_id.clone()),
            since: Some(since),
            until: Some(now),
            limit: Some(BATCH_SIZE),
            offset: Some(offset),
            ..Default::default()
        };
        let page = audit.query(&query).await?;
        let fetched = page.events.len();

        for event in &page.events {
            snapshot.total_events += 1;
            *snapshot.by_status.entry(status_label(event.status).to_string()).or_insert(0) += 1;
            *snapshot.by_stage.entry(event.stage.clone()).or_insert(0) += 1;
        }

        if fetched < BATCH_SIZE {
            break;
        }
        offset += BATCH_SIZE;
    }

    Ok(snapshot)
}

fn status_label(status: EventStatus) -> &'static str {
    match status {
        EventStatus::Started => "started",
        EventStatus::Succeeded => "succeeded",
        EventStatus::Failed => "failed",
        EventStatus::Compensated => "compensated",
    }
}
