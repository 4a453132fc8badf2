use async_trait::async_trait;
use chrono::{DateTime, Utc};

use occam_core::{AuditEvent, EventId, OccamResult};

use crate::query::{AuditPage, AuditQuery};

/// Append-only persistence for audit events.
///
/// Implementations must never mutate a record once `append` returns — the
/// monotonicity invariant (spec §8.1) depends on it. `occam-orchestrator`
/// and `occam-status` depend on `Arc<dyn AuditStore>`, never a concrete
/// type, so the hash-chaining and encryption decorators in this crate can
/// wrap any backing store transparently.
#[async_trait]
pub trait AuditStore: Send + Sync {
    /// Append a new event, returning the persisted record (which may carry
    /// store-assigned fields such as a hash-chain sequence number).
    async fn append(&self, event: AuditEvent) -> OccamResult<AuditEvent>;

    /// Fetch a single event by id.
    async fn get(&self, id: &EventId) -> OccamResult<Option<AuditEvent>>;

    /// Run a filtered, paged query over the store.
    async fn query(&self, query: &AuditQuery) -> OccamResult<AuditPage>;

    /// Remove events whose `retention_deadline` is strictly before `cutoff`.
    /// An event is never eligible before its own deadline, regardless of how
    /// old `occurred_at` is. Returns the number of events purged.
    async fn purge_before(&self, cutoff: DateTime<Utc>) -> OccamResult<u64>;
}
