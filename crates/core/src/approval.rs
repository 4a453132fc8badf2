use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{OccamError, OccamResult};
use crate::ids::{ApprovalId, EntityId, WorkflowId};

/// Current status of a governance approval request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
    Expired,
}

/// The decision an approver can render on a pending request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalDecision {
    Approve,
    Reject,
}

/// A human-in-the-loop approval gate raised by Governance for a transaction
/// or workflow stage that exceeds automatic-approval thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalRequest {
    pub id: ApprovalId,
    pub workflow_id: WorkflowId,
    pub entity_id: EntityId,
    pub reason: String,
    pub requested_amount: Option<f64>,
    pub status: ApprovalStatus,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub decided_at: Option<DateTime<Utc>>,
    pub decided_by: Option<String>,
    pub decision_note: Option<String>,
}

impl ApprovalRequest {
    #[must_use]
    pub fn new(
        workflow_id: impl Into<WorkflowId>,
        entity_id: impl Into<EntityId>,
        reason: impl Into<String>,
        requested_amount: Option<f64>,
        now: DateTime<Utc>,
        ttl: chrono::Duration,
    ) -> Self {
        Self {
            id: ApprovalId::generate(),
            workflow_id: workflow_id.into(),
            entity_id: entity_id.into(),
            reason: reason.into(),
            requested_amount,
            status: ApprovalStatus::Pending,
            created_at: now,
            expires_at: now + ttl,
            decided_at: None,
            decided_by: None,
            decision_note: None,
        }
    }

    /// Returns `true` if a pending request's TTL has elapsed as of `at`.
    #[must_use]
    pub fn is_expired(&self, at: DateTime<Utc>) -> bool {
        self.status == ApprovalStatus::Pending && at >= self.expires_at
    }

    /// Apply an approver's decision. The only legal transition is from
    /// `pending`; a request that has already expired, or already been
    /// decided, cannot be decided again.
    ///
    /// # Errors
    /// Returns [`OccamError::Expired`] if the request's TTL has passed, or
    /// [`OccamError::Validation`] if it is not currently `pending`.
    pub fn decide(
        &mut self,
        decision: ApprovalDecision,
        decided_by: impl Into<String>,
        note: Option<String>,
        at: DateTime<Utc>,
    ) -> OccamResult<()> {
        if self.is_expired(at) {
            self.status = ApprovalStatus::Expired;
            return Err(OccamError::Expired(format!(
                "approval request {} expired at {}",
                self.id, self.expires_at
            )));
        }
        if self.status != ApprovalStatus::Pending {
            return Err(OccamError::Validation(format!(
                "approval request {} is not pending (status: {:?})",
                self.id, self.status
            )));
        }
        self.status = match decision {
            ApprovalDecision::Approve => ApprovalStatus::Approved,
            ApprovalDecision::Reject => ApprovalStatus::Rejected,
        };
        self.decided_at = Some(at);
        self.decided_by = Some(decided_by.into());
        self.decision_note = note;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh(ttl_hours: i64) -> ApprovalRequest {
        ApprovalRequest::new(
            "wf-1",
            "ent-1",
            "amount exceeds threshold",
            Some(50_000.0),
            Utc::now(),
            chrono::Duration::hours(ttl_hours),
        )
    }

    #[test]
    fn approve_transitions_from_pending() {
        let mut req = fresh(24);
        req.decide(ApprovalDecision::Approve, "alice", None, Utc::now())
            .unwrap();
        assert_eq!(req.status, ApprovalStatus::Approved);
        assert_eq!(req.decided_by.as_deref(), Some("alice"));
    }

    #[test]
    fn reject_transitions_from_pending() {
        let mut req = fresh(24);
        req.decide(
            ApprovalDecision::Reject,
            "bob",
            Some("insufficient docs".into()),
            Utc::now(),
        )
        .unwrap();
        assert_eq!(req.status, ApprovalStatus::Rejected);
    }

    #[test]
    fn expired_request_cannot_be_decided() {
        let mut req = fresh(1);
        let later = Utc::now() + chrono::Duration::hours(2);
        let result = req.decide(ApprovalDecision::Approve, "alice", None, later);
        assert!(matches!(result, Err(OccamError::Expired(_))));
        assert_eq!(req.status, ApprovalStatus::Expired);
    }

    #[test]
    fn already_decided_request_cannot_be_decided_again() {
        let mut req = fresh(24);
        req.decide(ApprovalDecision::Approve, "alice", None, Utc::now())
            .unwrap();
        let result = req.decide(ApprovalDecision::Reject, "bob", None, Utc::now());
        assert!(matches!(result, Err(OccamError::Validation(_))));
    }
}
