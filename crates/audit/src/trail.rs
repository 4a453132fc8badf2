use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;

use occam_core::{AuditEvent, EventStatus, OccamResult, Severity, TraceId, WorkflowId};

use crate::store::AuditStore;

/// Convenience helpers for the common start/step/complete shape of an
/// orchestrated operation, so callers don't hand-assemble `AuditEvent`s at
/// every call site. These are thin wrappers over `AuditStore::append`, not a
/// separate abstraction — every event they produce is an ordinary event in
/// the workflow's hash chain.
pub struct Trail {
    store: Arc<dyn AuditStore>,
    trace_id: TraceId,
    workflow_id: Option<WorkflowId>,
}

impl Trail {
    #[must_use]
    pub fn new(store: Arc<dyn AuditStore>, trace_id: TraceId, workflow_id: Option<WorkflowId>) -> Self {
        Self {
            store,
            trace_id,
            workflow_id,
        }
    }

    fn base_event(&self, stage: &str, status: EventStatus, severity: Severity, message: &str, now: DateTime<Utc>) -> AuditEvent {
        let mut event = AuditEvent::new(self.trace_id.clone(), stage, status, severity, message, now);
        if let Some(workflow_id) = &self.workflow_id {
            event = event.with_workflow(workflow_id.clone());
        }
        event
    }

    /// Record that a stage has begun.
    pub async fn start_trail(&self, stage: &str, now: DateTime<Utc>) -> OccamResult<AuditEvent> {
        let event = self.base_event(stage, EventStatus::Started, Severity::Info, "stage started", now);
        self.store.append(event).await
    }

    /// Record an intermediate step within a stage without changing its
    /// terminal status.
    pub async fn step(&self, stage: &str, message: &str, details: Value, now: DateTime<Utc>) -> OccamResult<AuditEvent> {
        let event = self
            .base_event(stage, EventStatus::Started, Severity::Info, message, now)
            .with_details(details);
        self.store.append(event).await
    }

    /// Record that a stage completed, successfully or not.
    pub async fn complete_trail(
        &self,
        stage: &str,
        status: EventStatus,
        severity: Severity,
        message: &str,
        details: Value,
        now: DateTime<Utc>,
    ) -> OccamResult<AuditEvent> {
        let event = self.base_event(stage, status, severity, message, now).with_details(details);
        self.store.append(event).await
    }
}
