use async_trait::async_trait;

use occam_core::OccamResult;

use crate::context::ExecutionContext;
use crate::manifest::AgentManifest;
use crate::result::AgentResult;

/// The uniform capability contract every compliance agent satisfies
/// (spec.md §4.5). Agents are stateless actors: all per-invocation state
/// lives in the `ExecutionContext`, never on `self`.
#[async_trait]
pub trait Agent: Send + Sync {
    fn manifest(&self) -> &AgentManifest;

    /// Execute the agent's work for `stage`. The Orchestrator wraps this
    /// call in `catch_unwind` and a per-stage deadline; implementations
    /// should not guard against panics themselves.
    async fn execute(&self, stage: &str, context: &ExecutionContext) -> OccamResult<AgentResult>;

    /// Undo a prior successful side effect, invoked by the Orchestrator when
    /// a later agent in the same stage fails. Agents with no side effects
    /// can rely on the default no-op.
    async fn compensate(&self, _context: &ExecutionContext, _prior: &AgentResult) -> OccamResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_object_safe(_: &dyn Agent) {}

    #[test]
    fn trait_is_object_safe() {
        fn _check(agent: &dyn Agent) {
            assert_object_safe(agent);
        }
    }
}
