use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use occam_core::{ApprovalId, EntityId, WorkflowId};

use crate::anomaly::AnomalyFinding;

/// Context for one transaction submitted to `Governance::validate_transaction`.
#[derive(Debug, Clone)]
pub struct TransactionContext {
    pub workflow_id: WorkflowId,
    pub entity_id: EntityId,
    pub amount: f64,
    pub occurred_at: DateTime<Utc>,
    pub description: String,
}

/// A blocking rule failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Violation {
    pub rule: String,
    pub message: String,
}

/// A non-blocking observation (anomaly findings that don't escalate to a
/// violation).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Warning {
    pub rule: String,
    pub message: String,
}

/// Outcome of `validate_transaction` (spec.md §4.4).
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub allowed: bool,
    pub requires_approval: bool,
    pub violations: Vec<Violation>,
    pub warnings: Vec<Warning>,
    pub approval_request_id: Option<ApprovalId>,
}

impl ValidationResult {
    pub(crate) fn from_parts(
        violations: Vec<Violation>,
        warnings: Vec<Warning>,
        requires_approval: bool,
    ) -> Self {
        Self {
            allowed: violations.is_empty(),
            requires_approval,
            violations,
            warnings,
            approval_request_id: None,
        }
    }
}

pub(crate) fn anomaly_to_warning(finding: &AnomalyFinding) -> Warning {
    Warning {
        rule: finding.rule.to_owned(),
        message: finding.detail.clone(),
    }
}
