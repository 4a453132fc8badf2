use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use occam_core::{EntityId, OccamError, OccamResult, TraceId, WorkflowId};

use crate::history::StageHistoryEntry;
use crate::stage::WorkflowStage;

/// A single compliance workflow instance: current stage, append-only stage
/// history, and the submission identity that makes `submitRequest`
/// idempotent (spec.md §4.6, §6, invariant 4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    pub id: WorkflowId,
    pub entity_id: EntityId,
    pub trace_id: TraceId,
    pub kind: String,
    pub payload: Value,
    pub submission_idempotency_key: String,
    pub current_stage: WorkflowStage,
    pub stage_history: Vec<StageHistoryEntry>,
    pub parent_workflow_id: Option<WorkflowId>,
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Workflow {
    #[must_use]
    pub fn new(
        entity_id: impl Into<EntityId>,
        trace_id: TraceId,
        kind: impl Into<String>,
        payload: Value,
        submission_idempotency_key: impl Into<String>,
        parent_workflow_id: Option<WorkflowId>,
        now: DateTime<Utc>,
    ) -> Self {
        let id = WorkflowId::generate();
        Self {
            id,
            entity_id: entity_id.into(),
            trace_id,
            kind: kind.into(),
            payload,
            submission_idempotency_key: submission_idempotency_key.into(),
            current_stage: WorkflowStage::Pending,
            stage_history: vec![StageHistoryEntry::new(WorkflowStage::Pending, now, None, 0)],
            parent_workflow_id,
            failure_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Append a new stage-history entry and move `current_stage` forward,
    /// enforcing the legal-transition table. Duration is measured from the
    /// previous history entry's `entered_at`.
    pub fn advance_to(&mut self, target: WorkflowStage, now: DateTime<Utc>, attempt: u32) -> OccamResult<()> {
        if !self.current_stage.can_transition_to(target) {
            return Err(OccamError::Validation(format!(
                "illegal transition {:?} -> {:?} for workflow {}",
                self.current_stage, target, self.id
            )));
        }
        let previous_entered_at = self.stage_history.last().map(|e| e.entered_at);
        self.stage_history
            .push(StageHistoryEntry::new(target, now, previous_entered_at, attempt));
        self.current_stage = target;
        self.updated_at = now;
        Ok(())
    }

    /// Transition to `Failed`, recording the reason (spec.md §7: "every
    /// failed workflow carries a terminal audit event with the error kind").
    pub fn fail(&mut self, reason: impl Into<String>, now: DateTime<Utc>, attempt: u32) -> OccamResult<()> {
        self.advance_to(WorkflowStage::Failed, now, attempt)?;
        self.failure_reason = Some(reason.into());
        Ok(())
    }

    #[must_use]
    pub fn progress_percent(&self) -> u8 {
        self.current_stage.progress_percent()
    }

    #[must_use]
    pub fn has_attempted(&self, target: WorkflowStage, attempt: u32) -> bool {
        self.stage_history
            .iter()
            .any(|entry| entry.stage == target && entry.attempt == attempt)
    }
}
