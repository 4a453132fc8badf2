use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;

use occam_core::WorkflowId;

/// Per-workflow serialization (spec.md §5: "the Orchestrator never
/// interleaves state mutations for the same workflow-id"). Each workflow
/// gets its own `tokio::sync::Mutex`, so workflows never contend with each
/// other the way they would behind one global lock; the map entry itself is
/// cheap to hold under the `DashMap` shard lock since cloning an `Arc` never
/// blocks.
#[derive(Default)]
pub struct WorkflowLocks {
    locks: DashMap<WorkflowId, Arc<Mutex<()>>>,
}

impl WorkflowLocks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, id: &WorkflowId) -> Arc<Mutex<()>> {
        Arc::clone(
            self.locks
                .entry(id.clone())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .value(),
        )
    }
}
