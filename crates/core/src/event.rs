use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ids::{EntityId, EventId, TraceId, WorkflowId};

/// Severity of an audit event, mirrored into the alerting pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Error,
    Critical,
}

/// Outcome of the step this event records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Started,
    Succeeded,
    Failed,
    Compensated,
}

/// A single entry in the tamper-evident audit trail.
///
/// Hash-chain fields (`previous_hash`, `record_hash`, `sequence_number`) are
/// populated by `occam_audit::HashChainAuditStore`, not by callers
/// constructing an `AuditEvent` directly. `retention_deadline` is likewise
/// store-assigned, by the base `occam_audit::InMemoryAuditStore`, from its
/// configured `audit_retention_days` (spec.md §3: `retention-deadline ≥
/// timestamp + horizon`) — the log, not the caller, is authoritative for
/// retention decisions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub id: EventId,
    pub workflow_id: Option<WorkflowId>,
    pub entity_id: Option<EntityId>,
    pub trace_id: TraceId,
    pub stage: String,
    pub status: EventStatus,
    pub severity: Severity,
    pub message: String,
    pub details: Value,
    pub occurred_at: DateTime<Utc>,
    pub sequence_number: Option<u64>,
    pub previous_hash: Option<String>,
    pub record_hash: Option<String>,
    pub retention_deadline: Option<DateTime<Utc>>,
}

impl AuditEvent {
    /// Build a new event with no hash-chain fields populated yet.
    #[must_use]
    pub fn new(
        trace_id: TraceId,
        stage: impl Into<String>,
        status: EventStatus,
        severity: Severity,
        message: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: EventId::generate(),
            workflow_id: None,
            entity_id: None,
            trace_id,
            stage: stage.into(),
            status,
            severity,
            message: message.into(),
            details: Value::Null,
            occurred_at: now,
            sequence_number: None,
            previous_hash: None,
            record_hash: None,
            retention_deadline: None,
        }
    }

    #[must_use]
    pub fn with_workflow(mut self, workflow_id: impl Into<WorkflowId>) -> Self {
        self.workflow_id = Some(workflow_id.into());
        self
    }

    #[must_use]
    pub fn with_entity(mut self, entity_id: impl Into<EntityId>) -> Self {
        self.entity_id = Some(entity_id.into());
        self
    }

    #[must_use]
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }

    #[must_use]
    pub fn with_retention_deadline(mut self, deadline: DateTime<Utc>) -> Self {
        self.retention_deadline = Some(deadline);
        self
    }
}
