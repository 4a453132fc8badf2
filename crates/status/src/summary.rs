use serde::{Deserialize, Serialize};

use occam_core::EntityId;
use occam_workflow::{Workflow, WorkflowStage};

/// Risk scoring for `StatusEngine::generate_summary` (spec.md §4.8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

/// Entity-wide risk summary aggregated across every workflow the entity has
/// ever submitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntitySummary {
    pub entity_id: EntityId,
    pub total_workflows: usize,
    pub failed_workflows: usize,
    pub awaiting_approval_workflows: usize,
    pub risk: RiskLevel,
}

/// Aggregate `workflows` (all workflows belonging to `entity_id`) into a
/// single risk-scored summary: critical if more than 30% failed, high if
/// more than 10% failed, medium if any workflow is currently
/// `awaiting_approval`, else low (spec.md §4.8, evaluated in that order).
#[must_use]
pub fn generate_summary(entity_id: &EntityId, workflows: &[Workflow]) -> EntitySummary {
    let total = workflows.len();
    let failed = workflows.iter().filter(|w| w.current_stage == WorkflowStage::Failed).count();
    let awaiting_approval = workflows
        .iter()
        .filter(|w| w.current_stage == WorkflowStage::AwaitingApproval)
        .count();

    // Integer comparison (failed * 100 > total * pct) avoids float rounding
    // at the 10%/30% boundaries.
    let risk = if total > 0 && failed * 100 > total * 30 {
        RiskLevel::Critical
    } else if total > 0 && failed * 100 > total * 10 {
        RiskLevel::High
    } else if awaiting_approval > 0 {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    };

    EntitySummary {
        entity_id: entity_id.clone(),
        total_workflows: total,
        failed_workflows: failed,
        awaiting_approval_workflows: awaiting_approval,
        risk,
    }
}
