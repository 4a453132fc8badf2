use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ids::{ActionId, AgentId, EntityId, TraceId, WorkflowId};

/// The kind of side effect a compliance action represents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    KycVerification,
    LicenseRenewal,
    CredentialRotation,
    TransactionReview,
    AlertDispatch,
    Custom(String),
}

/// A unit of work dispatched by the Orchestrator to an Agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplianceAction {
    pub id: ActionId,
    pub workflow_id: WorkflowId,
    pub entity_id: EntityId,
    pub agent_id: AgentId,
    pub kind: ActionKind,
    pub trace_id: TraceId,
    pub payload: Value,
    pub metadata: BTreeMap<String, String>,
    pub created_at: DateTime<Utc>,
    pub idempotency_key: String,
}

impl ComplianceAction {
    /// Build a new action. `idempotency_key` should uniquely identify the
    /// `(workflow_id, target_stage, attempt)` tuple so retries of the same
    /// logical step are deduplicated downstream.
    #[must_use]
    pub fn new(
        workflow_id: impl Into<WorkflowId>,
        entity_id: impl Into<EntityId>,
        agent_id: impl Into<AgentId>,
        kind: ActionKind,
        trace_id: TraceId,
        payload: Value,
        idempotency_key: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ActionId::generate(),
            workflow_id: workflow_id.into(),
            entity_id: entity_id.into(),
            agent_id: agent_id.into(),
            kind,
            trace_id,
            payload,
            metadata: BTreeMap::new(),
            created_at: now,
            idempotency_key: idempotency_key.into(),
        }
    }

    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}
