use std::sync::Arc;

use occam_audit::AuditStore;
use occam_core::{Clock, EntityId, OccamResult, OrchestratorConfig, WorkflowId};
use occam_factbox::FactBox;
use occam_workflow::WorkflowStore;

use crate::analytics::{compute_analytics, AnalyticsSnapshot};
use crate::delivery::{self, DeliveryChannel};
use crate::progress::{self, ProgressSnapshot};
use crate::summary::{self, EntitySummary};
use crate::sweep;

use occam_core::alert::Alert;

/// Ties together progress tracking, entity risk summaries, and the
/// renewal/anomaly alert sweep: the public surface the rest of the
/// workspace (and `occam-cli`) talks to for everything the status
/// subsystem is responsible for (spec.md §4.8).
pub struct StatusEngine {
    workflows: Arc<dyn WorkflowStore>,
    factbox: Arc<dyn FactBox>,
    audit: Arc<dyn AuditStore>,
    clock: Arc<dyn Clock>,
    config: OrchestratorConfig,
    channels: Vec<Arc<dyn DeliveryChannel>>,
}

impl StatusEngine {
    #[must_use]
    pub fn new(
        workflows: Arc<dyn WorkflowStore>,
        factbox: Arc<dyn FactBox>,
        audit: Arc<dyn AuditStore>,
        clock: Arc<dyn Clock>,
        config: OrchestratorConfig,
        channels: Vec<Arc<dyn DeliveryChannel>>,
    ) -> Self {
        Self { workflows, factbox, audit, clock, config, channels }
    }

    /// `trackProgress(workflow-id)` (spec.md §4.8).
    pub async fn track_progress(&self, workflow_id: &WorkflowId) -> OccamResult<Option<ProgressSnapshot>> {
        let Some(workflow) = self.workflows.get(workflow_id).await? else {
            return Ok(None);
        };
        Ok(Some(progress::track_progress(&workflow, &self.config, self.clock.now())))
    }

    /// `generateSummary(entity-id)` (spec.md §4.8): risk-scored rollup of
    /// every workflow the entity has submitted.
    pub async fn generate_summary(&self, entity_id: &EntityId) -> OccamResult<EntitySummary> {
        let workflows = self.workflows.list_by_entity(entity_id).await?;
        Ok(summary::generate_summary(entity_id, &workflows))
    }

    /// Audit-event rollup for `entity_id` since `since`, used internally by
    /// callers that want volume/error-rate context alongside the risk
    /// summary without re-scanning the audit log themselves.
    pub async fn entity_analytics(&self, entity_id: &EntityId, since: chrono::DateTime<chrono::Utc>) -> OccamResult<AnalyticsSnapshot> {
        compute_analytics(self.audit.as_ref(), entity_id, since, self.clock.now()).await
    }

    /// `runRenewalSweep()` (spec.md §4.8): raise warning/critical renewal
    /// alerts for every license entering a new renewal window, delivering
    /// to every registered channel and recording an idempotency receipt so
    /// repeated sweeps never re-alert the same `(license, window)`.
    pub async fn run_renewal_sweep(&self) -> OccamResult<Vec<Alert>> {
        sweep::run_renewal_sweep(self.factbox.as_ref(), self.audit.as_ref(), &self.channels, &self.config, self.clock.now()).await
    }

    /// `runRetentionSweep()` (spec.md §3, §4.1): purge audit events whose
    /// `retention_deadline` has passed. The store itself is authoritative
    /// on eligibility, so `now` only needs to be later than any deadline
    /// that should fire; passing `self.clock.now()` is sufficient.
    pub async fn run_retention_sweep(&self) -> OccamResult<u64> {
        self.audit.purge_before(self.clock.now()).await
    }

    /// Deliver an already-constructed alert to every registered channel.
    /// Exposed so other subsystems (e.g. a workflow-failure hook) can reuse
    /// the same fan-out path the renewal sweep uses.
    pub async fn deliver_alert(&self, alert: &Alert) -> Vec<delivery::DeliveryOutcome> {
        delivery::dispatch(&self.channels, alert).await
    }
}
