use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use occam_agent::{AgentManifest, AgentRegistry, AgentResult, ExecutionContext};
use occam_audit::{AuditPage, AuditQuery, AuditStore};
use occam_core::{
    AgentId, ApprovalDecision, ApprovalId, ApprovalRequest, ApprovalStatus, AuditEvent, Clock,
    EntityId, EventStatus, OccamError, OccamResult, OrchestratorConfig, Severity, TraceId,
    WorkflowId,
};
use occam_factbox::{EntityStatus, FactBox};
use occam_governance::{Governance, TransactionContext};
use occam_vault::SecureVault;
use occam_workflow::{Workflow, WorkflowStage, WorkflowStore};

use crate::locks::WorkflowLocks;
use crate::residue::{ResidueEntry, ResidueLedger};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StageOutcome {
    Success,
    Failed,
}

enum PaymentGate {
    Clear,
    NeedsApproval(ApprovalId),
    Blocked(String),
}

/// Drives workflows through the compliance lifecycle, invoking the agents
/// registered for each stage, gating monetary actions through `Governance`,
/// and compensating previously-succeeded agents when a later one fails
/// (spec.md §4.7, §5). Grounded on the teacher's `Gateway`: one
/// constructor-injected struct over `Arc<dyn Trait>` collaborators, exposing
/// async methods that mirror the external interface.
pub struct Orchestrator {
    config: OrchestratorConfig,
    clock: Arc<dyn Clock>,
    audit: Arc<dyn AuditStore>,
    workflows: Arc<dyn WorkflowStore>,
    registry: Arc<AgentRegistry>,
    governance: Arc<Governance>,
    factbox: Arc<dyn FactBox>,
    vault: Arc<dyn SecureVault>,
    residue: Arc<ResidueLedger>,
    locks: WorkflowLocks,
    semaphore: Arc<Semaphore>,
}

impl Orchestrator {
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: OrchestratorConfig,
        clock: Arc<dyn Clock>,
        audit: Arc<dyn AuditStore>,
        workflows: Arc<dyn WorkflowStore>,
        registry: Arc<AgentRegistry>,
        governance: Arc<Governance>,
        factbox: Arc<dyn FactBox>,
        vault: Arc<dyn SecureVault>,
    ) -> Self {
        let permits = config.effective_worker_pool_size();
        Self {
            config,
            clock,
            audit,
            workflows,
            registry,
            governance,
            factbox,
            vault,
            residue: Arc::new(ResidueLedger::new()),
            locks: WorkflowLocks::new(),
            semaphore: Arc::new(Semaphore::new(permits)),
        }
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<AgentRegistry> {
        &self.registry
    }

    #[must_use]
    pub fn governance(&self) -> &Arc<Governance> {
        &self.governance
    }

    #[must_use]
    pub fn residue(&self) -> &Arc<ResidueLedger> {
        &self.residue
    }

    /// Submit a new workflow (spec.md §4.1 `submitRequest`). Idempotent on
    /// `idempotency_key`.
    pub async fn submit_request(
        &self,
        entity_id: EntityId,
        kind: impl Into<String>,
        payload: Value,
        idempotency_key: impl Into<String>,
    ) -> OccamResult<WorkflowId> {
        let now = self.clock.now();
        self.workflows
            .submit(entity_id, TraceId::generate(), kind.into(), payload, idempotency_key.into(), None, now)
            .await
    }

    pub async fn get_workflow(&self, id: &WorkflowId) -> OccamResult<Option<Workflow>> {
        self.workflows.get(id).await
    }

    pub async fn get_entity_status(&self, entity_id: &EntityId) -> OccamResult<EntityStatus> {
        self.factbox.get_entity_status(entity_id).await
    }

    pub async fn query_audit(&self, query: &AuditQuery) -> OccamResult<AuditPage> {
        self.audit.query(query).await
    }

    #[must_use]
    pub fn get_approval(&self, id: &ApprovalId) -> Option<ApprovalRequest> {
        self.governance.get_approval(id)
    }

    /// Resolve a pending approval. Approving resumes the suspended workflow
    /// past `AwaitingApproval`; rejecting fails it (spec.md §4.4, §4.6).
    pub async fn decide_approval(
        &self,
        request_id: &ApprovalId,
        decided_by: &str,
        decision: ApprovalDecision,
        note: Option<String>,
    ) -> OccamResult<ApprovalRequest> {
        let approval = self
            .governance
            .process_approval(request_id, decision, decided_by, note)
            .await?;

        match approval.status {
            ApprovalStatus::Approved => {
                self.resume_after_approval(&approval).await?;
            }
            ApprovalStatus::Rejected => {
                let now = self.clock.now();
                self.workflows
                    .fail(&approval.workflow_id, "approval_denied".into(), 0, now)
                    .await?;
            }
            ApprovalStatus::Pending | ApprovalStatus::Expired => {}
        }

        Ok(approval)
    }

    /// The `pay` stage's agents run exactly once: either synchronously in
    /// `step` when governance clears the transaction outright, or here, once
    /// an approver signs off, right before the only legal next transition
    /// (`AwaitingApproval -> Submit`). This keeps the payment side effect
    /// from ever firing before compliance has cleared it.
    async fn resume_after_approval(&self, approval: &ApprovalRequest) -> OccamResult<()> {
        let now = self.clock.now();
        if let Some(amount) = approval.requested_amount {
            let ctx = TransactionContext {
                workflow_id: approval.workflow_id.clone(),
                entity_id: approval.entity_id.clone(),
                amount,
                occurred_at: now,
                description: approval.reason.clone(),
            };
            self.governance.record_transaction(&ctx).await;
        }

        let lock = self.locks.get(&approval.workflow_id);
        let _guard = lock.lock().await;
        let workflow = self
            .workflows
            .get(&approval.workflow_id)
            .await?
            .ok_or_else(|| OccamError::NotFound(format!("workflow {} not found", approval.workflow_id)))?;

        if workflow.current_stage != WorkflowStage::AwaitingApproval {
            // Already advanced past this point by an earlier, duplicate decision delivery.
            return Ok(());
        }

        let cancellation = CancellationToken::new();
        if self.run_stage(&approval.workflow_id, &workflow, "pay", &cancellation).await? == StageOutcome::Success {
            self.workflows
                .advance(&approval.workflow_id, WorkflowStage::Submit, 0, self.clock.now())
                .await?;
        }
        drop(_guard);

        self.drive(&approval.workflow_id).await?;
        Ok(())
    }

    /// Create a fresh, linked workflow for an entity whose prior workflow
    /// just completed (spec.md §4.6: `Completed -> Renew` "creates a fresh
    /// workflow-id linked to the old").
    pub async fn renew_workflow(&self, completed_id: &WorkflowId) -> OccamResult<WorkflowId> {
        let now = self.clock.now();
        let workflow = self
            .workflows
            .get(completed_id)
            .await?
            .ok_or_else(|| OccamError::NotFound(format!("workflow {completed_id} not found")))?;

        if workflow.current_stage != WorkflowStage::Completed {
            return Err(OccamError::Validation(format!(
                "workflow {completed_id} cannot be renewed from stage {:?}",
                workflow.current_stage
            )));
        }

        self.workflows.advance(completed_id, WorkflowStage::Renew, 0, now).await?;

        self.workflows
            .submit(
                workflow.entity_id.clone(),
                TraceId::generate(),
                workflow.kind.clone(),
                workflow.payload.clone(),
                format!("renewal:{completed_id}"),
                Some(completed_id.clone()),
                now,
            )
            .await
    }

    /// Drive a workflow forward until it reaches a terminal stage or
    /// suspends at `AwaitingApproval`. Holds the workflow's lock for the
    /// whole run so stage mutations for one workflow-id never interleave
    /// (spec.md §5, invariant 3).
    pub async fn drive(&self, id: &WorkflowId) -> OccamResult<Workflow> {
        self.drive_cancellable(id, CancellationToken::new()).await
    }

    /// As [`drive`](Self::drive), but the caller supplies the cancellation
    /// token so an in-flight run can be cancelled from outside (spec.md §5:
    /// "suspension points ... must return promptly upon cancellation").
    pub async fn drive_cancellable(&self, id: &WorkflowId, cancellation: CancellationToken) -> OccamResult<Workflow> {
        let lock = self.locks.get(id);
        let _guard = lock.lock().await;

        loop {
            let workflow = self
                .workflows
                .get(id)
                .await?
                .ok_or_else(|| OccamError::NotFound(format!("workflow {id} not found")))?;

            if workflow.current_stage.is_terminal() || workflow.current_stage == WorkflowStage::AwaitingApproval {
                return Ok(workflow);
            }

            if cancellation.is_cancelled() {
                self.audit(
                    &workflow,
                    id,
                    "orchestrator.cancel",
                    EventStatus::Failed,
                    Severity::Warning,
                    "drive cancelled before workflow reached a terminal stage",
                    serde_json::json!({ "stage": workflow.current_stage }),
                )
                .await?;
                self.workflows
                    .fail(id, "cancelled".into(), 0, self.clock.now())
                    .await?;
                continue;
            }

            self.step(id, &workflow, &cancellation).await?;
        }
    }

    async fn step(&self, id: &WorkflowId, workflow: &Workflow, cancellation: &CancellationToken) -> OccamResult<()> {
        let now = self.clock.now();
        match workflow.current_stage {
            WorkflowStage::Pending => {
                self.workflows.advance(id, WorkflowStage::Apply, 0, now).await?;
            }
            WorkflowStage::Apply => {
                if self.run_stage(id, workflow, "apply", cancellation).await? == StageOutcome::Success {
                    self.workflows.advance(id, WorkflowStage::Verify, 0, self.clock.now()).await?;
                }
            }
            WorkflowStage::Verify => {
                if self.run_stage(id, workflow, "verify", cancellation).await? == StageOutcome::Success {
                    let next = if requires_payment(workflow) {
                        WorkflowStage::Pay
                    } else {
                        WorkflowStage::Submit
                    };
                    self.workflows.advance(id, next, 0, self.clock.now()).await?;
                }
            }
            WorkflowStage::Pay => {
                match self.evaluate_payment(id, workflow).await? {
                    PaymentGate::Clear => {
                        if self.run_stage(id, workflow, "pay", cancellation).await? == StageOutcome::Success {
                            self.workflows.advance(id, WorkflowStage::Submit, 0, self.clock.now()).await?;
                        }
                    }
                    PaymentGate::NeedsApproval(approval_id) => {
                        self.audit(
                            workflow,
                            id,
                            "pay",
                            EventStatus::Started,
                            Severity::Info,
                            "payment requires approval",
                            serde_json::json!({ "approval_request_id": approval_id.as_str() }),
                        )
                        .await?;
                        self.workflows
                            .advance(id, WorkflowStage::AwaitingApproval, 0, self.clock.now())
                            .await?;
                    }
                    PaymentGate::Blocked(reason) => {
                        self.audit(
                            workflow,
                            id,
                            "pay",
                            EventStatus::Failed,
                            Severity::Critical,
                            format!("governance blocked payment: {reason}"),
                            Value::Null,
                        )
                        .await?;
                        self.workflows
                            .fail(id, format!("governance blocked payment: {reason}"), 0, self.clock.now())
                            .await?;
                    }
                }
            }
            WorkflowStage::Submit => {
                if self.run_stage(id, workflow, "submit", cancellation).await? == StageOutcome::Success {
                    self.workflows.advance(id, WorkflowStage::Confirm, 0, self.clock.now()).await?;
                }
            }
            WorkflowStage::Confirm => {
                if self.run_stage(id, workflow, "confirm", cancellation).await? == StageOutcome::Success {
                    self.workflows.advance(id, WorkflowStage::Archive, 0, self.clock.now()).await?;
                }
            }
            WorkflowStage::Archive => {
                if self.run_stage(id, workflow, "archive", cancellation).await? == StageOutcome::Success {
                    self.workflows.advance(id, WorkflowStage::Completed, 0, self.clock.now()).await?;
                }
            }
            WorkflowStage::AwaitingApproval | WorkflowStage::Completed | WorkflowStage::Renew | WorkflowStage::Failed => {}
        }
        Ok(())
    }

    async fn evaluate_payment(&self, id: &WorkflowId, workflow: &Workflow) -> OccamResult<PaymentGate> {
        let amount = workflow.payload.get("amount").and_then(Value::as_f64).ok_or_else(|| {
            OccamError::Validation(format!("workflow {id} requires payment but payload has no numeric amount"))
        })?;
        let ctx = TransactionContext {
            workflow_id: id.clone(),
            entity_id: workflow.entity_id.clone(),
            amount,
            occurred_at: self.clock.now(),
            description: format!("{} payment", workflow.kind),
        };
        let result = self.governance.validate_transaction(&ctx).await?;
        if !result.allowed {
            let reason = result.violations.iter().map(|v| v.rule.clone()).collect::<Vec<_>>().join(", ");
            return Ok(PaymentGate::Blocked(reason));
        }
        if result.requires_approval {
            let approval_id = result.approval_request_id.ok_or_else(|| {
                OccamError::Integrity(format!("workflow {id} requires approval but governance raised none"))
            })?;
            return Ok(PaymentGate::NeedsApproval(approval_id));
        }
        self.governance.record_transaction(&ctx).await;
        Ok(PaymentGate::Clear)
    }

    /// Run every agent registered for `stage_name`, in dependency-topological
    /// order, batching consecutive `can_parallelize` agents that don't depend
    /// on one another into one concurrent group (spec.md §4.7). On the first
    /// agent failure, compensates every previously-succeeded agent in this
    /// stage and fails the workflow.
    async fn run_stage(
        &self,
        id: &WorkflowId,
        workflow: &Workflow,
        stage_name: &str,
        cancellation: &CancellationToken,
    ) -> OccamResult<StageOutcome> {
        let order = self.registry.execution_order()?;
        let candidates: Vec<AgentId> = order
            .into_iter()
            .filter(|agent_id| self.registry.manifest(agent_id).is_some_and(|m| m.agent_type == stage_name))
            .collect();

        if candidates.is_empty() {
            return Ok(StageOutcome::Success);
        }

        let _permit = Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .map_err(|_| OccamError::Integrity("orchestrator worker pool semaphore closed".into()))?;

        let mut context = self.build_context(workflow, cancellation);
        let mut succeeded: Vec<(AgentId, AgentResult)> = Vec::new();
        let mut i = 0;

        while i < candidates.len() {
            let manifest = self
                .registry
                .manifest(&candidates[i])
                .expect("agent present in execution_order must still be registered");

            let batch: Vec<AgentId> = if manifest.capabilities.can_parallelize {
                let mut group = vec![candidates[i].clone()];
                let mut j = i + 1;
                while j < candidates.len() {
                    let next = self
                        .registry
                        .manifest(&candidates[j])
                        .expect("agent present in execution_order must still be registered");
                    if !next.capabilities.can_parallelize || group.iter().any(|g| next.dependencies.contains(g)) {
                        break;
                    }
                    group.push(candidates[j].clone());
                    j += 1;
                }
                i = j;
                group
            } else {
                i += 1;
                vec![candidates[i - 1].clone()]
            };

            let results = futures::future::join_all(batch.iter().map(|agent_id| {
                let context = context.clone();
                async move {
                    (
                        agent_id.clone(),
                        self.invoke_with_retry(id, workflow, agent_id, stage_name, &context, cancellation).await,
                    )
                }
            }))
            .await;

            for (agent_id, result) in results {
                if !result.success {
                    drop(_permit);
                    self.compensate_and_fail(id, workflow, stage_name, &succeeded, &context, &agent_id, &result)
                        .await?;
                    return Ok(StageOutcome::Failed);
                }
                context.prior_results.insert(agent_id.clone(), result.clone());
                succeeded.push((agent_id, result));
            }
        }

        drop(_permit);
        self.audit(
            workflow,
            id,
            stage_name,
            EventStatus::Succeeded,
            Severity::Info,
            format!("stage {stage_name} completed"),
            Value::Null,
        )
        .await?;
        Ok(StageOutcome::Success)
    }

    fn build_context(&self, workflow: &Workflow, cancellation: &CancellationToken) -> ExecutionContext {
        ExecutionContext::new(
            workflow.id.clone(),
            workflow.entity_id.clone(),
            workflow.trace_id.clone(),
            workflow.payload.clone(),
            Arc::clone(&self.factbox),
            Arc::clone(&self.vault),
            cancellation.clone(),
        )
    }

    fn stage_deadline(&self, manifest: &AgentManifest) -> Duration {
        let raw = manifest.capabilities.estimated_latency_ms as f64 * self.config.stage_deadline_multiplier;
        let capped = raw.min(self.config.stage_deadline_max_ms as f64);
        Duration::from_millis(capped as u64)
    }

    /// Invoke one agent, retrying transient/indeterminate failures per its
    /// declared `retry_policy` up to a per-attempt stage deadline (spec.md
    /// §4.7, grounded on the teacher's semaphore-then-retry-loop shape in
    /// `acteon-executor::ActionExecutor::execute`). An agent-reported failure
    /// (`success: false`) is never retried here: the agent already ran and
    /// chose not to retry itself.
    #[allow(clippy::too_many_arguments)]
    async fn invoke_with_retry(
        &self,
        id: &WorkflowId,
        workflow: &Workflow,
        agent_id: &AgentId,
        stage_name: &str,
        context: &ExecutionContext,
        cancellation: &CancellationToken,
    ) -> AgentResult {
        let Some(manifest) = self.registry.manifest(agent_id) else {
            return AgentResult::failure(vec![format!("agent {agent_id} not registered")], Duration::ZERO);
        };
        let deadline = self.stage_deadline(&manifest);
        let mut attempt = 0;

        loop {
            let start = std::time::Instant::now();
            let invocation = tokio::time::timeout(deadline, self.registry.invoke(agent_id, stage_name, context.clone()));

            let outcome = tokio::select! {
                biased;
                () = cancellation.cancelled() => {
                    return AgentResult::failure(vec!["cancelled".into()], start.elapsed());
                }
                result = invocation => result,
            };

            match outcome {
                Ok(Ok(result)) => return result,
                Ok(Err(err)) => {
                    if err.is_retryable() && attempt < manifest.retry_policy.max_retries {
                        tracing::warn!(agent = %agent_id, attempt, error = %err, "agent invocation failed, retrying");
                        self.audit_retry(workflow, id, stage_name, agent_id, attempt, &err.to_string()).await;
                        let delay = manifest.retry_policy.delay_for(attempt);
                        tokio::select! {
                            biased;
                            () = cancellation.cancelled() => return AgentResult::failure(vec!["cancelled".into()], start.elapsed()),
                            () = tokio::time::sleep(delay) => {}
                        }
                        attempt += 1;
                        continue;
                    }
                    return AgentResult::failure(vec![err.to_string()], start.elapsed());
                }
                Err(_elapsed) => {
                    if attempt < manifest.retry_policy.max_retries {
                        tracing::warn!(agent = %agent_id, attempt, ?deadline, "agent invocation exceeded stage deadline, retrying");
                        let reason = format!("exceeded stage deadline of {deadline:?}");
                        self.audit_retry(workflow, id, stage_name, agent_id, attempt, &reason).await;
                        let delay = manifest.retry_policy.delay_for(attempt);
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                        continue;
                    }
                    return AgentResult::failure(vec![format!("exceeded stage deadline of {deadline:?}")], start.elapsed());
                }
            }
        }
    }

    /// Record a retried (`transient`) invocation as its own audit event, so
    /// the trail distinguishes "retried then succeeded" from "succeeded on
    /// the first attempt" (spec.md S4: "audit trail shows two `transient`
    /// retries and one `success`").
    async fn audit_retry(&self, workflow: &Workflow, id: &WorkflowId, stage_name: &str, agent_id: &AgentId, attempt: u32, reason: &str) {
        let result = self
            .audit(
                workflow,
                id,
                stage_name,
                EventStatus::Failed,
                Severity::Warning,
                format!("agent {agent_id} transient failure on attempt {attempt}, retrying"),
                serde_json::json!({ "kind": "transient", "agent_id": agent_id.as_str(), "attempt": attempt, "reason": reason }),
            )
            .await;
        if let Err(err) = result {
            tracing::warn!(agent = %agent_id, error = %err, "failed to record retry audit event");
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn compensate_and_fail(
        &self,
        id: &WorkflowId,
        workflow: &Workflow,
        stage_name: &str,
        succeeded: &[(AgentId, AgentResult)],
        context: &ExecutionContext,
        failed_agent: &AgentId,
        failed_result: &AgentResult,
    ) -> OccamResult<()> {
        let mut residue_notes = Vec::new();
        for (agent_id, result) in succeeded.iter().rev() {
            if let Err(err) = self.registry.compensate(agent_id, context, result).await {
                residue_notes.push(format!("{agent_id}: {err}"));
                self.residue.push(ResidueEntry {
                    workflow_id: id.clone(),
                    stage: stage_name.to_owned(),
                    agent_id: agent_id.clone(),
                    reason: err.to_string(),
                    recorded_at: self.clock.now(),
                });
            }
        }

        // A cancelled invocation leaves the external side effect's outcome
        // unknown, not merely failed (spec.md §5, scenario S6): the audit
        // event is tagged `indeterminate` and the workflow's failure reason
        // is the bare "cancelled" so a later manual reconciliation pass can
        // recognize it, rather than a stage-specific failure message.
        let cancelled = failed_result.errors.iter().any(|e| e == "cancelled");

        let full_reason = if cancelled {
            "cancelled".to_string()
        } else {
            let reason = if failed_result.errors.is_empty() {
                format!("agent {failed_agent} reported failure")
            } else {
                failed_result.errors.join("; ")
            };
            format!("stage {stage_name} failed: {reason}")
        };

        self.audit(
            workflow,
            id,
            stage_name,
            EventStatus::Failed,
            Severity::Critical,
            if cancelled {
                format!("agent {failed_agent} invocation cancelled, outcome indeterminate")
            } else {
                full_reason.clone()
            },
            serde_json::json!({
                "kind": if cancelled { "indeterminate" } else { "failed" },
                "uncompensated_residue": residue_notes,
            }),
        )
        .await?;

        self.workflows.fail(id, full_reason, 0, self.clock.now()).await?;
        Ok(())
    }

    async fn audit(
        &self,
        workflow: &Workflow,
        id: &WorkflowId,
        stage: &str,
        status: EventStatus,
        severity: Severity,
        message: impl Into<String>,
        details: Value,
    ) -> OccamResult<()> {
        let event = AuditEvent::new(workflow.trace_id.clone(), stage, status, severity, message, self.clock.now())
            .with_workflow(id.clone())
            .with_entity(workflow.entity_id.clone())
            .with_details(details);
        self.audit.append(event).await?;
        Ok(())
    }
}

fn requires_payment(workflow: &Workflow) -> bool {
    workflow
        .payload
        .get("requires_payment")
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use occam_agent::{Agent, Capabilities};
    use occam_audit::InMemoryAuditStore;
    use occam_core::{ApprovalDecision, SystemClock};
    use occam_factbox::InMemoryFactBox;
    use occam_vault::InMemorySecureVault;
    use occam_workflow::InMemoryWorkflowStore;

    use super::*;

    fn caps() -> Capabilities {
        Capabilities {
            supports_context_chaining: false,
            supports_zero_drift: false,
            requires_ontology: false,
            requires_factbox: false,
            can_parallelize: false,
            estimated_latency_ms: 5,
        }
    }

    struct ScriptedAgent {
        manifest: AgentManifest,
        fail: bool,
        compensate_err: bool,
    }

    #[async_trait]
    impl Agent for ScriptedAgent {
        fn manifest(&self) -> &AgentManifest {
            &self.manifest
        }

        async fn execute(&self, _stage: &str, _context: &ExecutionContext) -> OccamResult<AgentResult> {
            if self.fail {
                Ok(AgentResult::failure(vec!["boom".into()], Duration::from_millis(1)))
            } else {
                Ok(AgentResult::success(Value::Null, 0.9, Duration::from_millis(1)))
            }
        }

        async fn compensate(&self, _context: &ExecutionContext, _prior: &AgentResult) -> OccamResult<()> {
            if self.compensate_err {
                Err(OccamError::Transient("compensation backend unavailable".into()))
            } else {
                Ok(())
            }
        }
    }

    fn stub(id: &str, stage: &str, fail: bool, compensate_err: bool) -> Arc<dyn Agent> {
        Arc::new(ScriptedAgent {
            manifest: AgentManifest::new(id, stage, "1.0", caps()),
            fail,
            compensate_err,
        })
    }

    fn harness(agents: Vec<Arc<dyn Agent>>, config: OrchestratorConfig) -> Orchestrator {
        let audit: Arc<dyn AuditStore> = Arc::new(InMemoryAuditStore::new());
        let registry = Arc::new(AgentRegistry::new());
        for agent in agents {
            registry.register(agent).unwrap();
        }
        let workflows: Arc<dyn WorkflowStore> = Arc::new(InMemoryWorkflowStore::new(Arc::clone(&audit)));
        let governance = Arc::new(Governance::new(config.clone(), Arc::new(SystemClock), Arc::clone(&audit)));
        let factbox = Arc::new(InMemoryFactBox::new(Arc::clone(&audit), Arc::new(SystemClock)));
        let vault = Arc::new(InMemorySecureVault::new(
            occam_core::crypto::parse_master_key(&"ab".repeat(32)).unwrap(),
            Arc::new(SystemClock),
            Arc::clone(&audit),
        ));
        Orchestrator::new(config, Arc::new(SystemClock), audit, workflows, registry, governance, factbox, vault)
    }

    #[tokio::test]
    async fn completes_workflow_without_payment() {
        let orch = harness(
            vec![
                stub("apply-1", "apply", false, false),
                stub("verify-1", "verify", false, false),
                stub("submit-1", "submit", false, false),
                stub("confirm-1", "confirm", false, false),
                stub("archive-1", "archive", false, false),
            ],
            OrchestratorConfig::default(),
        );
        let id = orch
            .submit_request("ent-1".into(), "license_renewal", serde_json::json!({"requires_payment": false}), "idem-1")
            .await
            .unwrap();
        let workflow = orch.drive(&id).await.unwrap();
        assert_eq!(workflow.current_stage, WorkflowStage::Completed);
        assert_eq!(workflow.progress_percent(), 100);
    }

    #[tokio::test]
    async fn resubmitting_same_idempotency_key_returns_same_workflow() {
        let orch = harness(vec![], OrchestratorConfig::default());
        let id1 = orch
            .submit_request("ent-1".into(), "license_renewal", Value::Null, "idem-1")
            .await
            .unwrap();
        let id2 = orch
            .submit_request("ent-1".into(), "license_renewal", Value::Null, "idem-1")
            .await
            .unwrap();
        assert_eq!(id1, id2);
    }

    #[tokio::test]
    async fn monetary_gate_suspends_then_resumes_on_approval() {
        let mut config = OrchestratorConfig::default();
        config.approval_threshold = 50_000.0;
        config.max_transaction_amount = 250_000.0;
        let orch = harness(
            vec![
                stub("apply-1", "apply", false, false),
                stub("verify-1", "verify", false, false),
                stub("pay-1", "pay", false, false),
                stub("submit-1", "submit", false, false),
                stub("confirm-1", "confirm", false, false),
                stub("archive-1", "archive", false, false),
            ],
            config,
        );
        let id = orch
            .submit_request(
                "ent-1".into(),
                "license_renewal",
                serde_json::json!({"requires_payment": true, "amount": 60_000.0}),
                "idem-1",
            )
            .await
            .unwrap();
        let workflow = orch.drive(&id).await.unwrap();
        assert_eq!(workflow.current_stage, WorkflowStage::AwaitingApproval);

        let page = orch
            .query_audit(&AuditQuery {
                workflow_id: Some(id.clone()),
                ..Default::default()
            })
            .await
            .unwrap();
        let approval_id = page
            .events
            .iter()
            .find_map(|e| e.details.get("approval_request_id"))
            .and_then(|v| v.as_str())
            .map(Into::into)
            .unwrap();

        orch.decide_approval(&approval_id, "alice", ApprovalDecision::Approve, None)
            .await
            .unwrap();

        let workflow = orch.get_workflow(&id).await.unwrap().unwrap();
        assert_eq!(workflow.current_stage, WorkflowStage::Completed);
    }

    #[tokio::test]
    async fn agent_failure_triggers_compensation_of_earlier_same_stage_agent() {
        // `verify-late` depends on `verify-early` so execution_order is deterministic;
        // compensation is scoped to agents that already succeeded in the *same* stage,
        // so `verify-early`'s failed compensation should surface as residue while
        // `apply-1` (a prior, already-committed stage) is left untouched.
        let verify_early = Arc::new(ScriptedAgent {
            manifest: AgentManifest::new("verify-early", "verify", "1.0", caps()),
            fail: false,
            compensate_err: true,
        });
        let verify_late = Arc::new(ScriptedAgent {
            manifest: AgentManifest::new("verify-late", "verify", "1.0", caps()).with_dependencies(vec!["verify-early".into()]),
            fail: true,
            compensate_err: false,
        });
        let orch = harness(
            vec![stub("apply-1", "apply", false, false), verify_early, verify_late],
            OrchestratorConfig::default(),
        );
        let id = orch
            .submit_request("ent-1".into(), "license_renewal", serde_json::json!({"requires_payment": false}), "idem-1")
            .await
            .unwrap();
        let workflow = orch.drive(&id).await.unwrap();
        assert_eq!(workflow.current_stage, WorkflowStage::Failed);
        assert!(workflow.failure_reason.is_some());
        assert_eq!(orch.residue().len(), 1);
        assert_eq!(orch.residue().drain()[0].agent_id.as_str(), "verify-early");
    }

    #[tokio::test]
    async fn pre_cancelled_token_fails_workflow_without_invoking_agents() {
        let orch = harness(vec![stub("apply-1", "apply", false, false)], OrchestratorConfig::default());
        let id = orch
            .submit_request("ent-1".into(), "license_renewal", Value::Null, "idem-1")
            .await
            .unwrap();
        let token = CancellationToken::new();
        token.cancel();
        let workflow = orch.drive_cancellable(&id, token).await.unwrap();
        assert_eq!(workflow.current_stage, WorkflowStage::Failed);
        assert_eq!(workflow.failure_reason.as_deref(), Some("cancelled"));
    }

    #[tokio::test]
    async fn renew_workflow_links_to_completed_parent() {
        let orch = harness(
            vec![
                stub("apply-1", "apply", false, false),
                stub("verify-1", "verify", false, false),
                stub("submit-1", "submit", false, false),
                stub("confirm-1", "confirm", false, false),
                stub("archive-1", "archive", false, false),
            ],
            OrchestratorConfig::default(),
        );
        let id = orch
            .submit_request("ent-1".into(), "license_renewal", serde_json::json!({"requires_payment": false}), "idem-1")
            .await
            .unwrap();
        orch.drive(&id).await.unwrap();

        let renewed_id = orch.renew_workflow(&id).await.unwrap();
        assert_ne!(renewed_id, id);
        let old = orch.get_workflow(&id).await.unwrap().unwrap();
        assert_eq!(old.current_stage, WorkflowStage::Renew);
        let renewed = orch.get_workflow(&renewed_id).await.unwrap().unwrap();
        assert_eq!(renewed.parent_workflow_id, Some(id));
    }
}
