use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A regulatory rule applicable to a regulation/jurisdiction pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegulatoryRule {
    pub id: String,
    pub regulation: String,
    pub jurisdiction: String,
    pub description: String,
    pub effective_from: DateTime<Utc>,
    pub effective_to: Option<DateTime<Utc>>,
}

impl RegulatoryRule {
    /// Returns `true` if the rule is in force at `at`.
    #[must_use]
    pub fn is_active_at(&self, at: DateTime<Utc>) -> bool {
        at >= self.effective_from && self.effective_to.map_or(true, |end| at < end)
    }
}
