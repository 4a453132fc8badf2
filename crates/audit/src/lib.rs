//! Tamper-evident audit trail: an `AuditStore` trait plus decorators that
//! add hash-chaining, redaction, and at-rest encryption around any backing
//! implementation.

pub mod chain;
pub mod encrypt;
pub mod memory;
pub mod query;
pub mod redact;
pub mod store;
pub mod trail;

pub use chain::HashChainAuditStore;
pub use encrypt::EncryptingAuditStore;
pub use memory::InMemoryAuditStore;
pub use query::{AuditPage, AuditQuery};
pub use redact::RedactingAuditStore;
pub use store::AuditStore;
pub use trail::Trail;
