use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use occam_core::{EntityId, OccamResult, TraceId, WorkflowId};

use crate::stage::WorkflowStage;
use crate::workflow::Workflow;

/// Outcome of `WorkflowStore::advance`. `newly_applied` distinguishes a
/// fresh transition from a duplicate delivery of the same idempotency key
/// `(workflow_id, target_stage, attempt)` — the Orchestrator must not
/// re-invoke side-effecting agents when `newly_applied` is `false`
/// (spec.md §4.6 idempotency, invariant 4).
#[derive(Debug, Clone)]
pub struct AdvanceOutcome {
    pub workflow: Workflow,
    pub newly_applied: bool,
}

/// Durable persistence for workflows (spec.md §4.6). `submit` and `advance`
/// must provide ACID semantics for (stage-history append + audit event
/// append), per spec.md §6's persisted-state-layout note.
#[async_trait]
pub trait WorkflowStore: Send + Sync {
    /// Create a workflow, or return the existing one if `idempotency_key`
    /// was already used (invariant 4: idempotent resubmission).
    #[allow(clippy::too_many_arguments)]
    async fn submit(
        &self,
        entity_id: EntityId,
        trace_id: TraceId,
        kind: String,
        payload: Value,
        idempotency_key: String,
        parent_workflow_id: Option<WorkflowId>,
        now: DateTime<Utc>,
    ) -> OccamResult<WorkflowId>;

    async fn get(&self, id: &WorkflowId) -> OccamResult<Option<Workflow>>;

    /// Write-ahead: durably records the stage transition (and an audit
    /// event) before the caller invokes any side-effecting agent for the
    /// new stage. Duplicate `(target, attempt)` deliveries are detected and
    /// return the prior outcome rather than transitioning again.
    async fn advance(
        &self,
        id: &WorkflowId,
        target: WorkflowStage,
        attempt: u32,
        now: DateTime<Utc>,
    ) -> OccamResult<AdvanceOutcome>;

    /// Write-ahead transition to `Failed`, recording `reason` on the
    /// workflow and in the audit event (spec.md §7: "every failed workflow
    /// carries a terminal audit event with the error kind"). A no-op
    /// (returns the current workflow, `newly_applied: false`) if the
    /// workflow is already terminal.
    async fn fail(
        &self,
        id: &WorkflowId,
        reason: String,
        attempt: u32,
        now: DateTime<Utc>,
    ) -> OccamResult<AdvanceOutcome>;

    async fn list_by_entity(&self, entity_id: &EntityId) -> OccamResult<Vec<Workflow>>;
}
