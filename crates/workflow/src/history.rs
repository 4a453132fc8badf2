use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::stage::WorkflowStage;

/// One append-only entry in a workflow's stage history (spec.md §4.6).
/// `duration` is `None` for the very first entry (no previous stage to
/// measure from).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageHistoryEntry {
    pub stage: WorkflowStage,
    pub entered_at: DateTime<Utc>,
    pub duration_since_previous: Option<chrono::Duration>,
    pub attempt: u32,
}

impl StageHistoryEntry {
    #[must_use]
    pub fn new(stage: WorkflowStage, entered_at: DateTime<Utc>, previous_entered_at: Option<DateTime<Utc>>, attempt: u32) -> Self {
        Self {
            stage,
            entered_at,
            duration_since_previous: previous_entered_at.map(|prev| entered_at - prev),
            attempt,
        }
    }
}
