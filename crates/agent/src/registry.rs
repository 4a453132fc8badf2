use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use dashmap::DashMap;
use tracing::warn;

use occam_core::{AgentId, OccamError, OccamResult};

use crate::agent::Agent;
use crate::context::ExecutionContext;
use crate::health::{AgentHealth, AgentStatus};
use crate::manifest::AgentManifest;
use crate::result::AgentResult;

struct Entry {
    agent: Arc<dyn Agent>,
    health: std::sync::Mutex<AgentHealth>,
}

/// Holds every registered agent's manifest and implementation, computes
/// dependency-topological execution order, and tracks rolling health
/// including the panic budget (spec.md §4.5, §7).
#[derive(Default)]
pub struct AgentRegistry {
    entries: DashMap<AgentId, Entry>,
}

impl AgentRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an agent. Refuses the manifest if any declared dependency is
    /// not already registered (spec.md §9: "registration refuses any
    /// manifest whose dependencies are not already known").
    pub fn register(&self, agent: Arc<dyn Agent>) -> OccamResult<()> {
        let manifest = agent.manifest().clone();
        for dep in &manifest.dependencies {
            if !self.entries.contains_key(dep) {
                return Err(OccamError::Validation(format!(
                    "agent {} declares unknown dependency {dep}",
                    manifest.id
                )));
            }
        }
        self.entries.insert(
            manifest.id.clone(),
            Entry {
                agent,
                health: std::sync::Mutex::new(AgentHealth::default()),
            },
        );
        Ok(())
    }

    #[must_use]
    pub fn manifest(&self, id: &AgentId) -> Option<AgentManifest> {
        self.entries.get(id).map(|e| e.agent.manifest().clone())
    }

    #[must_use]
    pub fn dependencies(&self, id: &AgentId) -> Vec<AgentId> {
        self.entries
            .get(id)
            .map(|e| e.agent.manifest().dependencies.clone())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn dependents(&self, id: &AgentId) -> Vec<AgentId> {
        self.entries
            .iter()
            .filter(|e| e.agent.manifest().dependencies.contains(id))
            .map(|e| e.key().clone())
            .collect()
    }

    #[must_use]
    pub fn health(&self, id: &AgentId) -> Option<AgentHealth> {
        self.entries.get(id).map(|e| e.health.lock().unwrap().clone())
    }

    /// Compute a topological ordering of every registered agent's dependency
    /// DAG via Kahn's algorithm. Cycles are a startup error: defensive
    /// against future registration paths that bypass the known-dependency
    /// check in `register`, since the teacher's `validate_chain_graph`
    /// reference is never itself defined.
    pub fn execution_order(&self) -> OccamResult<Vec<AgentId>> {
        let mut in_degree: std::collections::HashMap<AgentId, usize> = std::collections::HashMap::new();
        let mut dependents: std::collections::HashMap<AgentId, Vec<AgentId>> = std::collections::HashMap::new();

        for entry in self.entries.iter() {
            let id = entry.key().clone();
            let manifest = entry.agent.manifest();
            in_degree.entry(id.clone()).or_insert(0);
            for dep in &manifest.dependencies {
                *in_degree.entry(id.clone()).or_insert(0) += 1;
                dependents.entry(dep.clone()).or_default().push(id.clone());
            }
        }

        let mut queue: VecDeque<AgentId> = in_degree
            .iter()
            .filter(|(_, &deg)| deg == 0)
            .map(|(id, _)| id.clone())
            .collect();
        let mut queue_seen: HashSet<AgentId> = queue.iter().cloned().collect();
        let mut order = Vec::with_capacity(in_degree.len());

        while let Some(id) = queue.pop_front() {
            order.push(id.clone());
            if let Some(next) = dependents.get(&id) {
                for dep_id in next {
                    if let Some(deg) = in_degree.get_mut(dep_id) {
                        *deg -= 1;
                        if *deg == 0 && queue_seen.insert(dep_id.clone()) {
                            queue.push_back(dep_id.clone());
                        }
                    }
                }
            }
        }

        if order.len() != in_degree.len() {
            return Err(OccamError::Validation(
                "agent dependency graph contains a cycle".into(),
            ));
        }
        Ok(order)
    }

    /// Invoke one agent, catching panics via a spawned task boundary and
    /// converting them into a `Transient` error while updating rolling
    /// health and the panic budget (spec.md §7).
    pub async fn invoke(
        &self,
        id: &AgentId,
        stage: &str,
        context: ExecutionContext,
    ) -> OccamResult<AgentResult> {
        let agent = {
            let entry = self
                .entries
                .get(id)
                .ok_or_else(|| OccamError::NotFound(format!("agent {id} not registered")))?;
            Arc::clone(&entry.agent)
        };
        let stage = stage.to_owned();
        let start = Instant::now();

        let outcome = tokio::spawn(async move { agent.execute(&stage, &context).await }).await;

        let entry = self
            .entries
            .get(id)
            .ok_or_else(|| OccamError::NotFound(format!("agent {id} not registered")))?;
        let mut health = entry.health.lock().unwrap();

        match outcome {
            Ok(Ok(result)) => {
                health.record_execution(result.success, start.elapsed());
                Ok(result)
            }
            Ok(Err(err)) => {
                health.record_execution(false, start.elapsed());
                Err(err)
            }
            Err(join_err) if join_err.is_panic() => {
                let demoted = health.record_panic(Utc::now());
                if demoted {
                    warn!(agent = %id, "panic budget exceeded, demoting to error status");
                }
                Err(OccamError::Transient(format!("agent {id} panicked during execution")))
            }
            Err(join_err) => Err(OccamError::Indeterminate(format!(
                "agent {id} execution did not complete: {join_err}"
            ))),
        }
    }

    #[must_use]
    pub fn status(&self, id: &AgentId) -> Option<AgentStatus> {
        self.entries.get(id).map(|e| e.health.lock().unwrap().status)
    }

    /// Undo a prior successful invocation by calling the agent's
    /// `compensate`, catching panics the same way `invoke` does (spec.md
    /// §4.7: "attempts compensation for every previously-succeeded agent in
    /// the same stage").
    pub async fn compensate(&self, id: &AgentId, context: &ExecutionContext, prior: &AgentResult) -> OccamResult<()> {
        let agent = {
            let entry = self
                .entries
                .get(id)
                .ok_or_else(|| OccamError::NotFound(format!("agent {id} not registered")))?;
            Arc::clone(&entry.agent)
        };
        let context = context.clone();
        let prior = prior.clone();

        match tokio::spawn(async move { agent.compensate(&context, &prior).await }).await {
            Ok(result) => result,
            Err(join_err) if join_err.is_panic() => Err(OccamError::Transient(format!(
                "agent {id} panicked during compensation"
            ))),
            Err(join_err) => Err(OccamError::Indeterminate(format!(
                "agent {id} compensation did not complete: {join_err}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc as StdArc;
    use std::time::Duration as StdDuration;

    use async_trait::async_trait;
    use serde_json::Value;
    use tokio_util::sync::CancellationToken;

    use occam_audit::InMemoryAuditStore;
    use occam_factbox::InMemoryFactBox;
    use occam_vault::InMemorySecureVault;

    use super::*;
    use crate::manifest::Capabilities;

    fn caps(latency_ms: u64) -> Capabilities {
        Capabilities {
            supports_context_chaining: false,
            supports_zero_drift: false,
            requires_ontology: false,
            requires_factbox: false,
            can_parallelize: true,
            estimated_latency_ms: latency_ms,
        }
    }

    struct StubAgent {
        manifest: AgentManifest,
        should_panic: bool,
    }

    #[async_trait]
    impl Agent for StubAgent {
        fn manifest(&self) -> &AgentManifest {
            &self.manifest
        }

        async fn execute(&self, _stage: &str, _context: &ExecutionContext) -> OccamResult<AgentResult> {
            if self.should_panic {
                panic!("stub agent panics on purpose");
            }
            Ok(AgentResult::success(Value::Null, 0.9, StdDuration::from_millis(5)))
        }
    }

    fn test_context() -> ExecutionContext {
        ExecutionContext::new(
            "wf-1".into(),
            "ent-1".into(),
            "trace-1".into(),
            Value::Null,
            StdArc::new(InMemoryFactBox::new(
                StdArc::new(InMemoryAuditStore::new()),
                StdArc::new(occam_core::SystemClock),
            )),
            StdArc::new(InMemorySecureVault::new(
                occam_core::crypto::parse_master_key(&"ab".repeat(32)).unwrap(),
                StdArc::new(occam_core::SystemClock),
                StdArc::new(InMemoryAuditStore::new()),
            )),
            CancellationToken::new(),
        )
    }

    #[test]
    fn register_rejects_unknown_dependency() {
        let registry = AgentRegistry::new();
        let manifest = AgentManifest::new("a", "kyc", "1.0", caps(100)).with_dependencies(vec!["missing".into()]);
        let agent = StubAgent {
            manifest,
            should_panic: false,
        };
        let result = registry.register(StdArc::new(agent));
        assert!(matches!(result, Err(OccamError::Validation(_))));
    }

    #[test]
    fn execution_order_respects_dependencies() {
        let registry = AgentRegistry::new();
        registry
            .register(StdArc::new(StubAgent {
                manifest: AgentManifest::new("a", "t", "1.0", caps(100)),
                should_panic: false,
            }))
            .unwrap();
        registry
            .register(StdArc::new(StubAgent {
                manifest: AgentManifest::new("b", "t", "1.0", caps(100)).with_dependencies(vec!["a".into()]),
                should_panic: false,
            }))
            .unwrap();
        let order = registry.execution_order().unwrap();
        let pos_a = order.iter().position(|id| id.as_str() == "a").unwrap();
        let pos_b = order.iter().position(|id| id.as_str() == "b").unwrap();
        assert!(pos_a < pos_b);
    }

    #[tokio::test]
    async fn invoke_records_success_health() {
        let registry = AgentRegistry::new();
        registry
            .register(StdArc::new(StubAgent {
                manifest: AgentManifest::new("a", "t", "1.0", caps(100)),
                should_panic: false,
            }))
            .unwrap();
        let result = registry.invoke(&"a".into(), "verify", test_context()).await.unwrap();
        assert!(result.success);
        let health = registry.health(&"a".into()).unwrap();
        assert_eq!(health.total_executions, 1);
        assert_eq!(health.successful_executions, 1);
    }

    #[tokio::test]
    async fn compensate_defaults_to_ok() {
        let registry = AgentRegistry::new();
        registry
            .register(StdArc::new(StubAgent {
                manifest: AgentManifest::new("a", "t", "1.0", caps(100)),
                should_panic: false,
            }))
            .unwrap();
        let result = registry.invoke(&"a".into(), "verify", test_context()).await.unwrap();
        registry.compensate(&"a".into(), &test_context(), &result).await.unwrap();
    }

    #[tokio::test]
    async fn invoke_converts_panic_to_transient_and_tracks_budget() {
        let registry = AgentRegistry::new();
        registry
            .register(StdArc::new(StubAgent {
                manifest: AgentManifest::new("a", "t", "1.0", caps(100)),
                should_panic: true,
            }))
            .unwrap();
        for _ in 0..2 {
            let result = registry.invoke(&"a".into(), "verify", test_context()).await;
            assert!(matches!(result, Err(OccamError::Transient(_))));
            assert_eq!(registry.status(&"a".into()).unwrap(), AgentStatus::Initializing);
        }
        let result = registry.invoke(&"a".into(), "verify", test_context()).await;
        assert!(matches!(result, Err(OccamError::Transient(_))));
        assert_eq!(registry.status(&"a".into()).unwrap(), AgentStatus::Error);
    }
}
