use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tokio_util::sync::CancellationToken;

use occam_core::{AgentId, EntityId, TraceId, WorkflowId};
use occam_factbox::FactBox;
use occam_vault::SecureVault;

use crate::result::AgentResult;

/// Everything an agent needs to execute one stage (spec.md §4.5). Built
/// fresh by the Orchestrator for each invocation.
#[derive(Clone)]
pub struct ExecutionContext {
    pub workflow_id: WorkflowId,
    pub entity_id: EntityId,
    pub trace_id: TraceId,
    /// Snapshot of the ontology data relevant to this stage. An opaque JSON
    /// document; the core does not interpret its shape.
    pub ontology_snapshot: Value,
    pub factbox: Arc<dyn FactBox>,
    pub vault: Arc<dyn SecureVault>,
    /// Results already produced by agents earlier in this workflow's
    /// dependency-topological order.
    pub prior_results: HashMap<AgentId, AgentResult>,
    /// Optional seed so agents that need deterministic output (zero-drift)
    /// can reproduce it under test.
    pub checksum_seed: Option<u64>,
    pub cancellation: CancellationToken,
}

impl ExecutionContext {
    #[must_use]
    pub fn new(
        workflow_id: WorkflowId,
        entity_id: EntityId,
        trace_id: TraceId,
        ontology_snapshot: Value,
        factbox: Arc<dyn FactBox>,
        vault: Arc<dyn SecureVault>,
        cancellation: CancellationToken,
    ) -> Self {
        Self {
            workflow_id,
            entity_id,
            trace_id,
            ontology_snapshot,
            factbox,
            vault,
            prior_results: HashMap::new(),
            checksum_seed: None,
            cancellation,
        }
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    #[must_use]
    pub fn prior_result(&self, agent_id: &AgentId) -> Option<&AgentResult> {
        self.prior_results.get(agent_id)
    }
}
