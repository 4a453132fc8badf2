use std::sync::Arc;

use anyhow::Context;

use occam_agent::AgentRegistry;
use occam_audit::{AuditStore, EncryptingAuditStore, HashChainAuditStore, InMemoryAuditStore, RedactingAuditStore};
use occam_core::{crypto, Clock, OrchestratorConfig, PayloadEncryptor, SystemClock};
use occam_factbox::{FactBox, InMemoryFactBox};
use occam_governance::Governance;
use occam_orchestrator::Orchestrator;
use occam_status::StatusEngine;
use occam_vault::{InMemorySecureVault, SecureVault};
use occam_workflow::{InMemoryWorkflowStore, WorkflowStore};

use crate::agents::register_demo_agents;

/// Everything a CLI invocation needs: the orchestrator plus the status
/// engine, both wired over the same in-memory collaborators.
pub struct System {
    pub orchestrator: Orchestrator,
    pub status: StatusEngine,
}

/// Construct the full in-process system from config, reading the vault
/// master key out of band via `OCCAM_VAULT_MASTER_KEY` (spec.md §6: its
/// absence is a fatal startup error, never silently defaulted).
pub fn build(config: OrchestratorConfig) -> anyhow::Result<System> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let raw_key = std::env::var("OCCAM_VAULT_MASTER_KEY").context(
        "OCCAM_VAULT_MASTER_KEY is not set; the vault master key must be supplied out of band",
    )?;
    let master_key = crypto::parse_master_key(&raw_key).context("parsing OCCAM_VAULT_MASTER_KEY")?;

    let base = Arc::new(InMemoryAuditStore::new().with_retention_days(config.audit_retention_days));
    let chained = Arc::new(HashChainAuditStore::new(base));
    let redacted = Arc::new(RedactingAuditStore::new(chained));
    let encryptor = Arc::new(PayloadEncryptor::new(master_key.clone()));
    let audit: Arc<dyn AuditStore> = Arc::new(EncryptingAuditStore::new(redacted, encryptor));

    let vault: Arc<dyn SecureVault> = Arc::new(InMemorySecureVault::with_password_policy(
        master_key,
        clock.clone(),
        audit.clone(),
        config.password_policy.clone(),
    ));
    let factbox: Arc<dyn FactBox> = Arc::new(InMemoryFactBox::new(audit.clone(), clock.clone()));
    let workflows: Arc<dyn WorkflowStore> = Arc::new(InMemoryWorkflowStore::new(audit.clone()));
    let governance = Arc::new(Governance::new(config.clone(), clock.clone(), audit.clone()));

    let registry = Arc::new(AgentRegistry::new());
    register_demo_agents(&registry)?;

    let orchestrator = Orchestrator::new(
        config.clone(),
        clock.clone(),
        audit.clone(),
        workflows.clone(),
        registry,
        governance,
        factbox.clone(),
        vault,
    );

    let status = StatusEngine::new(workflows, factbox, audit, clock, config, vec![]);

    Ok(System { orchestrator, status })
}
