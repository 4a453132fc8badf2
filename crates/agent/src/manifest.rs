use serde::{Deserialize, Serialize};

use occam_core::AgentId;

/// Declared capabilities of an agent, registered once at startup and never
/// mutated (spec.md §4.5).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Capabilities {
    pub supports_context_chaining: bool,
    pub supports_zero_drift: bool,
    pub requires_ontology: bool,
    pub requires_factbox: bool,
    pub can_parallelize: bool,
    pub estimated_latency_ms: u64,
}

/// Per-agent retry policy, carried on the manifest per spec.md §6's agent
/// plug-in interface. Shape follows the teacher's `RetryStrategy::Exponential`
/// (base/cap, doubling each attempt) but is a plain struct here since the
/// Orchestrator is the only caller and does not need the Linear/Constant
/// variants the teacher exposes for its generic executor.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_ms: u64,
    pub cap_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_ms: 250,
            cap_ms: 30_000,
        }
    }
}

impl RetryPolicy {
    /// Delay before the given zero-based retry attempt: `base * 2^attempt`,
    /// clamped to `cap_ms`.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> std::time::Duration {
        let raw = self.base_ms as f64 * 2f64.powi(i32::try_from(attempt).unwrap_or(i32::MAX));
        let capped = raw.min(self.cap_ms as f64);
        std::time::Duration::from_millis(capped as u64)
    }
}

/// The registration record for an agent: identity, declared capabilities,
/// dependencies, and retry policy. `execute`/`compensate` live on the
/// `Agent` trait, not the manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentManifest {
    pub id: AgentId,
    pub agent_type: String,
    pub version: String,
    pub capabilities: Capabilities,
    pub dependencies: Vec<AgentId>,
    pub retry_policy: RetryPolicy,
}

impl AgentManifest {
    #[must_use]
    pub fn new(
        id: impl Into<AgentId>,
        agent_type: impl Into<String>,
        version: impl Into<String>,
        capabilities: Capabilities,
    ) -> Self {
        Self {
            id: id.into(),
            agent_type: agent_type.into(),
            version: version.into(),
            capabilities,
            dependencies: Vec::new(),
            retry_policy: RetryPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_dependencies(mut self, dependencies: Vec<AgentId>) -> Self {
        self.dependencies = dependencies;
        self
    }

    #[must_use]
    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }
}
