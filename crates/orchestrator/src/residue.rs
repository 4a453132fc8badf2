use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use occam_core::{AgentId, WorkflowId};

/// One uncompensated side effect left behind by a failed stage (spec.md
/// §4.7: "missing compensations are recorded as uncompensated residue
/// warnings").
#[derive(Debug, Clone)]
pub struct ResidueEntry {
    pub workflow_id: WorkflowId,
    pub stage: String,
    pub agent_id: AgentId,
    pub reason: String,
    pub recorded_at: DateTime<Utc>,
}

/// Sink for uncompensated residue entries, mirroring the shape of a
/// dead-letter queue: a durable record of side effects the Orchestrator
/// could not undo, surfaced for manual reconciliation.
#[async_trait]
pub trait ResidueSink: Send + Sync {
    async fn push(&self, entry: ResidueEntry);
    async fn drain(&self) -> Vec<ResidueEntry>;
    async fn len(&self) -> usize;
    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// In-memory residue ledger. All methods acquire the lock for the minimum
/// duration and never hold it across an `.await`.
#[derive(Default)]
pub struct ResidueLedger {
    entries: Mutex<Vec<ResidueEntry>>,
}

impl ResidueLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, entry: ResidueEntry) {
        self.entries.lock().expect("residue ledger mutex poisoned").push(entry);
    }

    pub fn drain(&self) -> Vec<ResidueEntry> {
        let mut guard = self.entries.lock().expect("residue ledger mutex poisoned");
        std::mem::take(&mut *guard)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().expect("residue ledger mutex poisoned").len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ResidueSink for ResidueLedger {
    async fn push(&self, entry: ResidueEntry) {
        ResidueLedger::push(self, entry);
    }

    async fn drain(&self) -> Vec<ResidueEntry> {
        ResidueLedger::drain(self)
    }

    async fn len(&self) -> usize {
        ResidueLedger::len(self)
    }
}
