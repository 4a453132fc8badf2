use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::instrument;

use occam_audit::AuditStore;
use occam_core::{
    ApprovalDecision, ApprovalId, ApprovalRequest, Clock, EntityId, EventStatus, OccamError,
    OccamResult, OrchestratorConfig, Severity, TraceId,
};

use crate::anomaly::{detect_anomalies, AnomalySeverity};
use crate::history::TransactionHistory;
use crate::validate::{anomaly_to_warning, TransactionContext, ValidationResult, Violation};

/// Policy gate for monetary and rate-sensitive compliance actions
/// (spec.md §4.4). Thresholds come from `OrchestratorConfig`; all
/// time-sensitive decisions (daily boundary, rate-limit window, approval
/// expiry) go through the injected `Clock` so tests can drive them
/// deterministically.
pub struct Governance {
    config: OrchestratorConfig,
    clock: Arc<dyn Clock>,
    audit: Arc<dyn AuditStore>,
    history: DashMap<EntityId, Mutex<TransactionHistory>>,
    approvals: DashMap<ApprovalId, ApprovalRequest>,
}

impl Governance {
    #[must_use]
    pub fn new(config: OrchestratorConfig, clock: Arc<dyn Clock>, audit: Arc<dyn AuditStore>) -> Self {
        Self {
            config,
            clock,
            audit,
            history: DashMap::new(),
            approvals: DashMap::new(),
        }
    }

    fn midnight_before(&self, at: chrono::DateTime<chrono::Utc>) -> chrono::DateTime<chrono::Utc> {
        at.date_naive().and_hms_opt(0, 0, 0).unwrap().and_utc()
    }

    /// Evaluate the five ordered rules from spec.md §4.4, collecting every
    /// blocking violation before returning. Creates an `ApprovalRequest`
    /// when approval is required and no violation blocked the transaction.
    #[instrument(skip(self, ctx))]
    pub async fn validate_transaction(&self, ctx: &TransactionContext) -> OccamResult<ValidationResult> {
        let mut violations = Vec::new();
        let mut warnings = Vec::new();
        let mut requires_approval = false;

        // Rule 1: amount <= max_transaction_amount.
        if ctx.amount > self.config.max_transaction_amount {
            violations.push(Violation {
                rule: "max_transaction_amount".into(),
                message: format!(
                    "amount {:.2} exceeds max_transaction_amount {:.2}",
                    ctx.amount, self.config.max_transaction_amount
                ),
            });
        }

        let entry = self
            .history
            .entry(ctx.entity_id.clone())
            .or_insert_with(|| Mutex::new(TransactionHistory::new()));
        let history = entry.lock().await;

        // Rule 2: daily running total + amount <= daily_spend_limit.
        let midnight = self.midnight_before(ctx.occurred_at);
        let daily_total = history.total_since(midnight) + ctx.amount;
        if daily_total > self.config.daily_spend_limit {
            violations.push(Violation {
                rule: "daily_spend_limit".into(),
                message: format!(
                    "daily total {daily_total:.2} would exceed daily_spend_limit {:.2}",
                    self.config.daily_spend_limit
                ),
            });
        }

        // Rule 3: count of transactions in the sliding rate-limit window.
        let window_start = ctx.occurred_at
            - chrono::Duration::minutes(self.config.rate_limit_window_minutes);
        let window_count = history.count_in_window(window_start, ctx.occurred_at);
        if window_count as u32 >= self.config.max_transactions_per_window {
            violations.push(Violation {
                rule: "rate_limit_window".into(),
                message: format!(
                    "{window_count} transactions already in the last {} minutes (max {})",
                    self.config.rate_limit_window_minutes, self.config.max_transactions_per_window
                ),
            });
        }

        // Rule 4: amount crossing the approval threshold is not a violation.
        if ctx.amount >= self.config.approval_threshold {
            requires_approval = true;
        }

        // Rule 5: anomaly checks; a High-severity finding requires approval.
        let anomalies = detect_anomalies(&history, ctx.amount, ctx.occurred_at);
        for finding in &anomalies {
            warnings.push(anomaly_to_warning(finding));
            if finding.severity == AnomalySeverity::High {
                requires_approval = true;
            }
        }
        drop(history);

        let mut result = ValidationResult::from_parts(violations, warnings, requires_approval);

        if result.requires_approval && result.allowed {
            let approval = ApprovalRequest::new(
                ctx.workflow_id.clone(),
                ctx.entity_id.clone(),
                format!("transaction of {:.2} requires approval: {}", ctx.amount, ctx.description),
                Some(ctx.amount),
                self.clock.now(),
                chrono::Duration::hours(self.config.approval_expiry_hours),
            );
            let id = approval.id.clone();
            self.approvals.insert(id.clone(), approval);
            result.approval_request_id = Some(id);
        }

        Ok(result)
    }

    /// Deterministic pending -> approved | denied transition. Expired
    /// requests can never be approved.
    #[instrument(skip(self))]
    pub async fn process_approval(
        &self,
        id: &ApprovalId,
        decision: ApprovalDecision,
        decided_by: &str,
        note: Option<String>,
    ) -> OccamResult<ApprovalRequest> {
        let now = self.clock.now();
        let mut approval = self
            .approvals
            .get_mut(id)
            .ok_or_else(|| OccamError::NotFound(format!("approval request {id} not found")))?;
        approval.decide(decision, decided_by, note, now)?;

        let event = occam_core::AuditEvent::new(
            TraceId::generate(),
            "governance.process_approval",
            EventStatus::Succeeded,
            Severity::Info,
            "approval decided",
            now,
        )
        .with_workflow(approval.workflow_id.clone())
        .with_entity(approval.entity_id.clone());
        drop(approval);
        self.audit.append(event).await?;

        Ok(self.approvals.get(id).unwrap().clone())
    }

    #[must_use]
    pub fn get_approval(&self, id: &ApprovalId) -> Option<ApprovalRequest> {
        self.approvals.get(id).map(|a| a.clone())
    }

    /// Append a completed transaction to the entity's bounded rolling
    /// history (spec.md §4.4).
    pub async fn record_transaction(&self, ctx: &TransactionContext) {
        let entry = self
            .history
            .entry(ctx.entity_id.clone())
            .or_insert_with(|| Mutex::new(TransactionHistory::new()));
        let mut history = entry.lock().await;
        history.record(ctx.amount, ctx.occurred_at);
    }
}
