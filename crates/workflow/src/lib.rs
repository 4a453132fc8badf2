//! The workflow state machine (spec.md §4.6): legal stage transitions,
//! append-only stage history, idempotent submission and stage advancement,
//! and write-ahead persistence.

pub mod history;
pub mod memory;
pub mod stage;
pub mod store;
pub mod workflow;

pub use history::StageHistoryEntry;
pub use memory::InMemoryWorkflowStore;
pub use stage::WorkflowStage;
pub use store::{AdvanceOutcome, WorkflowStore};
pub use workflow::Workflow;
