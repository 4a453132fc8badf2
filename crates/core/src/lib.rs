//! Shared types and abstractions used by every OCCAM crate: identifiers,
//! the domain model (entities, licenses, credentials, actions, audit
//! events, approvals, alerts), the error taxonomy, the clock abstraction,
//! and configuration.

pub mod action;
pub mod alert;
pub mod approval;
pub mod clock;
pub mod config;
pub mod credential;
pub mod crypto;
pub mod entity;
pub mod error;
pub mod event;
pub mod ids;
pub mod license;

pub use action::{ActionKind, ComplianceAction};
pub use alert::{Alert, AlertKind, DeliveryChannel};
pub use approval::{ApprovalDecision, ApprovalRequest, ApprovalStatus};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{OrchestratorConfig, PasswordPolicy, DEFAULT_AUDIT_RETENTION_DAYS};
pub use credential::CredentialRecord;
pub use crypto::{CryptoError, ExposeSecret, MasterKey, PayloadEncryptor, SecretString};
pub use entity::{ContactInfo, Entity, KycStatus, Registration};
pub use error::{OccamError, OccamResult};
pub use event::{AuditEvent, EventStatus, Severity};
pub use ids::{
    ActionId, AgentId, AlertId, ApprovalId, CredentialId, EntityId, EventId, LicenseId, TraceId,
    WorkflowId,
};
pub use license::{License, LicenseStatus};
