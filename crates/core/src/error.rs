use thiserror::Error;

/// Error taxonomy for the OCCAM core.
///
/// Variants are distinguished by *kind*, not by message text, so the
/// Orchestrator and other callers can branch on `match` rather than string
/// matching (see spec §7 / §9: "exception-driven control flow" is replaced
/// by tagged results).
#[derive(Debug, Error, Clone)]
pub enum OccamError {
    /// Bad input. Never retried.
    #[error("validation error: {0}")]
    Validation(String),

    /// Governance rejected the action. Carries structured violations
    /// upstream via `occam_governance::ValidationResult`; this variant is
    /// used when a caller needs to surface the rejection as an error.
    #[error("policy violation: {0}")]
    PolicyViolation(String),

    /// The requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The resource exists but is past its deadline (credential or approval).
    #[error("expired: {0}")]
    Expired(String),

    /// The caller or actor lacks the privilege to perform this action.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Network, timeout, or deadline error. Retried with backoff by the
    /// Orchestrator.
    #[error("transient error: {0}")]
    Transient(String),

    /// Audit append failure, checksum mismatch, or vault authentication-tag
    /// mismatch. Always fatal for the enclosing action.
    #[error("integrity error: {0}")]
    Integrity(String),

    /// The side effect's outcome is unknown after cancellation or timeout.
    /// Treated as potentially-succeeded; idempotency keys prevent double
    /// commit on retry.
    #[error("indeterminate: {0}")]
    Indeterminate(String),
}

impl OccamError {
    /// Returns `true` if the Orchestrator should retry the action that
    /// produced this error (subject to its retry budget).
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_) | Self::Indeterminate(_))
    }

    /// Short, stable kind label suitable for audit payloads and metrics.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::PolicyViolation(_) => "policy_violation",
            Self::NotFound(_) => "not_found",
            Self::Expired(_) => "expired",
            Self::Unauthorized(_) => "unauthorized",
            Self::Transient(_) => "transient",
            Self::Integrity(_) => "integrity",
            Self::Indeterminate(_) => "indeterminate",
        }
    }
}

pub type OccamResult<T> = Result<T, OccamError>;
