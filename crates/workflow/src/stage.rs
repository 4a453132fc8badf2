use serde::{Deserialize, Serialize};

/// A workflow's current position in the compliance lifecycle (spec.md
/// §4.6). `Pending` is the stage a freshly created workflow starts in,
/// before intake (`apply`) begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStage {
    Pending,
    Apply,
    Verify,
    Pay,
    AwaitingApproval,
    Submit,
    Confirm,
    Archive,
    Completed,
    Renew,
    Failed,
}

impl WorkflowStage {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Deterministic progress percentage for status reporting (spec.md
    /// §4.6). `AwaitingApproval` reports the same percentage as `Pay`
    /// since it is a suspension of that stage, not a distinct milestone.
    #[must_use]
    pub fn progress_percent(self) -> u8 {
        match self {
            Self::Pending => 5,
            Self::Apply => 10,
            Self::Renew => 15,
            Self::Verify => 25,
            Self::Pay | Self::AwaitingApproval => 40,
            Self::Submit => 60,
            Self::Confirm => 80,
            Self::Archive => 90,
            Self::Completed => 100,
            Self::Failed => 0,
        }
    }

    /// Whether `self -> target` is a legal transition per spec.md §4.6's
    /// table. Any non-terminal stage may transition to `Failed`.
    #[must_use]
    pub fn can_transition_to(self, target: Self) -> bool {
        if target == Self::Failed {
            return !self.is_terminal();
        }
        matches!(
            (self, target),
            (Self::Pending, Self::Apply)
                | (Self::Apply, Self::Verify)
                | (Self::Verify, Self::Pay)
                | (Self::Verify, Self::Submit)
                | (Self::Pay, Self::AwaitingApproval)
                | (Self::Pay, Self::Submit)
                | (Self::AwaitingApproval, Self::Submit)
                | (Self::Submit, Self::Confirm)
                | (Self::Confirm, Self::Archive)
                | (Self::Archive, Self::Completed)
                | (Self::Completed, Self::Renew)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_to_verify_is_legal() {
        assert!(WorkflowStage::Apply.can_transition_to(WorkflowStage::Verify));
    }

    #[test]
    fn verify_can_branch_to_pay_or_submit() {
        assert!(WorkflowStage::Verify.can_transition_to(WorkflowStage::Pay));
        assert!(WorkflowStage::Verify.can_transition_to(WorkflowStage::Submit));
    }

    #[test]
    fn any_non_terminal_can_fail() {
        assert!(WorkflowStage::Verify.can_transition_to(WorkflowStage::Failed));
        assert!(WorkflowStage::AwaitingApproval.can_transition_to(WorkflowStage::Failed));
    }

    #[test]
    fn terminal_stages_cannot_transition_to_failed() {
        assert!(!WorkflowStage::Completed.can_transition_to(WorkflowStage::Failed));
        assert!(!WorkflowStage::Failed.can_transition_to(WorkflowStage::Failed));
    }

    #[test]
    fn illegal_jump_is_rejected() {
        assert!(!WorkflowStage::Apply.can_transition_to(WorkflowStage::Archive));
    }

    #[test]
    fn progress_percentages_match_table() {
        assert_eq!(WorkflowStage::Apply.progress_percent(), 10);
        assert_eq!(WorkflowStage::Completed.progress_percent(), 100);
        assert_eq!(WorkflowStage::Failed.progress_percent(), 0);
    }

    #[test]
    fn completed_can_renew() {
        assert!(WorkflowStage::Completed.can_transition_to(WorkflowStage::Renew));
    }
}
