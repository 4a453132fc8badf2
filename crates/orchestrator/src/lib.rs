//! Drives workflows to completion (spec.md §4.7, §5): stage-by-stage agent
//! invocation with dependency ordering and bounded parallelism, retries with
//! per-agent backoff, monetary governance gating, compensation on failure,
//! and cancellation.

pub mod locks;
pub mod orchestrator;
pub mod residue;

pub use locks::WorkflowLocks;
pub use orchestrator::Orchestrator;
pub use residue::{ResidueEntry, ResidueLedger, ResidueSink};
