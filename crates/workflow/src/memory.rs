use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde_json::Value;

use occam_audit::AuditStore;
use occam_core::{AuditEvent, EntityId, EventStatus, OccamError, OccamResult, Severity, TraceId, WorkflowId};

use crate::stage::WorkflowStage;
use crate::store::{AdvanceOutcome, WorkflowStore};
use crate::workflow::Workflow;

/// In-memory `WorkflowStore`. Submission idempotency is a separate
/// `DashMap` keyed on the caller-supplied idempotency key so resubmission
/// is O(1) without scanning every workflow.
pub struct InMemoryWorkflowStore {
    workflows: DashMap<WorkflowId, Workflow>,
    submission_index: DashMap<String, WorkflowId>,
    audit: Arc<dyn AuditStore>,
}

impl InMemoryWorkflowStore {
    #[must_use]
    pub fn new(audit: Arc<dyn AuditStore>) -> Self {
        Self {
            workflows: DashMap::new(),
            submission_index: DashMap::new(),
            audit,
        }
    }
}

#[async_trait]
impl WorkflowStore for InMemoryWorkflowStore {
    async fn submit(
        &self,
        entity_id: EntityId,
        trace_id: TraceId,
        kind: String,
        payload: Value,
        idempotency_key: String,
        parent_workflow_id: Option<WorkflowId>,
        now: DateTime<Utc>,
    ) -> OccamResult<WorkflowId> {
        // Reserve the idempotency slot atomically via the entry API so two
        // concurrent resubmissions with the same key cannot both create a
        // workflow (invariant 4).
        let id = match self.submission_index.entry(idempotency_key.clone()) {
            dashmap::mapref::entry::Entry::Occupied(existing) => return Ok(existing.get().clone()),
            dashmap::mapref::entry::Entry::Vacant(vacant) => {
                let workflow = Workflow::new(
                    entity_id.clone(),
                    trace_id.clone(),
                    kind,
                    payload,
                    idempotency_key,
                    parent_workflow_id,
                    now,
                );
                let id = workflow.id.clone();
                vacant.insert(id.clone());
                self.workflows.insert(id.clone(), workflow);
                id
            }
        };

        let event = AuditEvent::new(trace_id, "workflow.submit", EventStatus::Succeeded, Severity::Info, "workflow submitted", now)
            .with_workflow(id.clone())
            .with_entity(entity_id);
        self.audit.append(event).await?;

        Ok(id)
    }

    async fn get(&self, id: &WorkflowId) -> OccamResult<Option<Workflow>> {
        Ok(self.workflows.get(id).map(|w| w.clone()))
    }

    async fn advance(
        &self,
        id: &WorkflowId,
        target: WorkflowStage,
        attempt: u32,
        now: DateTime<Utc>,
    ) -> OccamResult<AdvanceOutcome> {
        // The updated workflow is cloned out and the DashMap guard dropped
        // before the audit append is awaited, so the shard is never held
        // locked across an await point.
        let workflow = {
            let mut entry = self
                .workflows
                .get_mut(id)
                .ok_or_else(|| OccamError::NotFound(format!("workflow {id} not found")))?;

            if entry.has_attempted(target, attempt) {
                return Ok(AdvanceOutcome {
                    workflow: entry.clone(),
                    newly_applied: false,
                });
            }

            entry.advance_to(target, now, attempt)?;
            entry.clone()
        };

        let mut event = AuditEvent::new(
            workflow.trace_id.clone(),
            "workflow.advance",
            EventStatus::Succeeded,
            Severity::Info,
            format!("workflow advanced to {target:?}"),
            now,
        )
        .with_workflow(id.clone())
        .with_entity(workflow.entity_id.clone());
        if let Some(reason) = &workflow.failure_reason {
            event = event.with_details(serde_json::json!({ "failure_reason": reason }));
        }
        self.audit.append(event).await?;

        Ok(AdvanceOutcome {
            workflow,
            newly_applied: true,
        })
    }

    async fn fail(
        &self,
        id: &WorkflowId,
        reason: String,
        attempt: u32,
        now: DateTime<Utc>,
    ) -> OccamResult<AdvanceOutcome> {
        let workflow = {
            let mut entry = self
                .workflows
                .get_mut(id)
                .ok_or_else(|| OccamError::NotFound(format!("workflow {id} not found")))?;

            if entry.current_stage.is_terminal() {
                return Ok(AdvanceOutcome {
                    workflow: entry.clone(),
                    newly_applied: false,
                });
            }
            if entry.has_attempted(WorkflowStage::Failed, attempt) {
                return Ok(AdvanceOutcome {
                    workflow: entry.clone(),
                    newly_applied: false,
                });
            }

            entry.fail(reason, now, attempt)?;
            entry.clone()
        };

        let event = AuditEvent::new(
            workflow.trace_id.clone(),
            "workflow.fail",
            EventStatus::Failed,
            Severity::Critical,
            format!(
                "workflow failed: {}",
                workflow.failure_reason.as_deref().unwrap_or("unknown")
            ),
            now,
        )
        .with_workflow(id.clone())
        .with_entity(workflow.entity_id.clone())
        .with_details(serde_json::json!({ "failure_reason": workflow.failure_reason }));
        self.audit.append(event).await?;

        Ok(AdvanceOutcome {
            workflow,
            newly_applied: true,
        })
    }

    async fn list_by_entity(&self, entity_id: &EntityId) -> OccamResult<Vec<Workflow>> {
        Ok(self
            .workflows
            .iter()
            .filter(|w| &w.entity_id == entity_id)
            .map(|w| w.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use occam_audit::InMemoryAuditStore;

    fn store() -> InMemoryWorkflowStore {
        InMemoryWorkflowStore::new(Arc::new(InMemoryAuditStore::new()))
    }

    #[tokio::test]
    async fn submit_is_idempotent() {
        let store = store();
        let now = Utc::now();
        let id1 = store
            .submit("ent-1".into(), TraceId::generate(), "kyc".into(), Value::Null, "idem-1".into(), None, now)
            .await
            .unwrap();
        let id2 = store
            .submit("ent-1".into(), TraceId::generate(), "kyc".into(), Value::Null, "idem-1".into(), None, now)
            .await
            .unwrap();
        assert_eq!(id1, id2);
    }

    #[tokio::test]
    async fn advance_persists_and_is_visible() {
        let store = store();
        let now = Utc::now();
        let id = store
            .submit("ent-1".into(), TraceId::generate(), "kyc".into(), Value::Null, "idem-1".into(), None, now)
            .await
            .unwrap();
        let outcome = store.advance(&id, WorkflowStage::Apply, 0, now).await.unwrap();
        assert!(outcome.newly_applied);
        assert_eq!(outcome.workflow.current_stage, WorkflowStage::Apply);

        let fetched = store.get(&id).await.unwrap().unwrap();
        assert_eq!(fetched.current_stage, WorkflowStage::Apply);
    }

    #[tokio::test]
    async fn duplicate_advance_attempt_is_a_no_op() {
        let store = store();
        let now = Utc::now();
        let id = store
            .submit("ent-1".into(), TraceId::generate(), "kyc".into(), Value::Null, "idem-1".into(), None, now)
            .await
            .unwrap();
        store.advance(&id, WorkflowStage::Apply, 0, now).await.unwrap();
        let outcome = store.advance(&id, WorkflowStage::Apply, 0, now).await.unwrap();
        assert!(!outcome.newly_applied);
        assert_eq!(outcome.workflow.stage_history.len(), 2);
    }

    #[tokio::test]
    async fn fail_records_reason_and_is_terminal() {
        let store = store();
        let now = Utc::now();
        let id = store
            .submit("ent-1".into(), TraceId::generate(), "kyc".into(), Value::Null, "idem-1".into(), None, now)
            .await
            .unwrap();
        let outcome = store.fail(&id, "deadline_exceeded".into(), 0, now).await.unwrap();
        assert!(outcome.newly_applied);
        assert_eq!(outcome.workflow.current_stage, WorkflowStage::Failed);
        assert_eq!(outcome.workflow.failure_reason.as_deref(), Some("deadline_exceeded"));

        let second = store.fail(&id, "ignored".into(), 1, now).await.unwrap();
        assert!(!second.newly_applied);
    }

    #[tokio::test]
    async fn list_by_entity_filters_correctly() {
        let store = store();
        let now = Utc::now();
        store
            .submit("ent-1".into(), TraceId::generate(), "kyc".into(), Value::Null, "idem-1".into(), None, now)
            .await
            .unwrap();
        store
            .submit("ent-2".into(), TraceId::generate(), "kyc".into(), Value::Null, "idem-2".into(), None, now)
            .await
            .unwrap();
        let workflows = store.list_by_entity(&"ent-1".into()).await.unwrap();
        assert_eq!(workflows.len(), 1);
    }
}
