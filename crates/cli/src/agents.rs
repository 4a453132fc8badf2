use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::json;

use occam_agent::{Agent, AgentManifest, AgentResult, Capabilities, ExecutionContext, RetryPolicy};
use occam_core::OccamResult;

/// A minimal stage agent: does no real compliance work, just records that
/// it ran and echoes its stage name back as `data`. Stands in for the
/// provider-specific connectors a real deployment would register (the
/// gateway's `acteon-integrations` equivalent), which are out of scope here
/// per spec.md's Non-goals — this lets `occam submit`/`occam drive`
/// exercise the full workflow lifecycle end to end without a real KYC
/// provider, payment rail, or filing API behind it.
pub struct StageAgent {
    manifest: AgentManifest,
}

impl StageAgent {
    #[must_use]
    pub fn new(id: &str, stage: &str, dependencies: Vec<occam_core::AgentId>) -> Self {
        let capabilities = Capabilities {
            supports_context_chaining: false,
            supports_zero_drift: false,
            requires_ontology: false,
            requires_factbox: stage == "apply" || stage == "verify",
            can_parallelize: true,
            estimated_latency_ms: 50,
        };
        let manifest = AgentManifest::new(id, stage, "1.0.0", capabilities)
            .with_dependencies(dependencies)
            .with_retry_policy(RetryPolicy { max_retries: 2, base_ms: 100, cap_ms: 2_000 });
        Self { manifest }
    }
}

#[async_trait]
impl Agent for StageAgent {
    fn manifest(&self) -> &AgentManifest {
        &self.manifest
    }

    async fn execute(&self, stage: &str, _context: &ExecutionContext) -> OccamResult<AgentResult> {
        let started = Instant::now();
        Ok(AgentResult::success(json!({ "stage": stage, "agent": self.manifest.id.as_str() }), 1.0, started.elapsed().max(Duration::from_millis(1))))
    }
}

/// Registers one `StageAgent` per workflow stage (spec.md §4.5's fixed
/// `apply -> verify -> pay -> submit -> confirm -> archive` pipeline).
pub fn register_demo_agents(registry: &occam_agent::AgentRegistry) -> OccamResult<()> {
    for stage in ["apply", "verify", "pay", "submit", "confirm", "archive"] {
        registry.register(std::sync::Arc::new(StageAgent::new(&format!("{stage}-agent"), stage, vec![])))?;
    }
    Ok(())
}
