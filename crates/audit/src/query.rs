use chrono::{DateTime, Utc};

use occam_core::{EntityId, Severity, TraceId, WorkflowId};

const DEFAULT_LIMIT: usize = 100;
const MAX_LIMIT: usize = 1_000;

/// Filter applied by `AuditStore::query`. All fields are optional; an empty
/// query returns the most recent page across the whole store.
#[derive(Debug, Clone, Default)]
pub struct AuditQuery {
    pub workflow_id: Option<WorkflowId>,
    pub entity_id: Option<EntityId>,
    pub trace_id: Option<TraceId>,
    pub min_severity: Option<Severity>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl AuditQuery {
    /// Page size clamped to `[1, MAX_LIMIT]`, defaulting to `DEFAULT_LIMIT`.
    #[must_use]
    pub fn effective_limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }

    #[must_use]
    pub fn effective_offset(&self) -> usize {
        self.offset.unwrap_or(0)
    }
}

/// A page of query results alongside enough information to request the next
/// page.
#[derive(Debug, Clone)]
pub struct AuditPage {
    pub events: Vec<occam_core::AuditEvent>,
    pub total_matched: usize,
    pub has_more: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effective_limit_clamps_to_max() {
        let query = AuditQuery {
            limit: Some(10_000),
            ..Default::default()
        };
        assert_eq!(query.effective_limit(), MAX_LIMIT);
    }

    #[test]
    fn effective_limit_defaults() {
        let query = AuditQuery::default();
        assert_eq!(query.effective_limit(), DEFAULT_LIMIT);
        assert_eq!(query.effective_offset(), 0);
    }

    #[test]
    fn effective_limit_rejects_zero() {
        let query = AuditQuery {
            limit: Some(0),
            ..Default::default()
        };
        assert_eq!(query.effective_limit(), 1);
    }
}
