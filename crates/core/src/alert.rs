use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::event::Severity;
use crate::ids::{AlertId, EntityId, LicenseId};

/// What triggered an alert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    LicenseExpiringSoon,
    LicenseExpired,
    CredentialRotationDue,
    AnomalousTransaction,
    WorkflowFailed,
    AgentDemoted,
}

/// A channel an alert can be delivered over. Status maintains a pluggable
/// delivery-channel trait (`occam_status::DeliveryChannel`); this enum is the
/// closed set of channel kinds the built-in router understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryChannel {
    Email,
    Webhook,
    Log,
}

/// A notification raised by the Status subsystem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: AlertId,
    pub kind: AlertKind,
    pub severity: Severity,
    pub entity_id: Option<EntityId>,
    pub license_id: Option<LicenseId>,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub dedup_key: String,
}

impl Alert {
    /// Build an alert. `dedup_key` should uniquely identify the
    /// `(subject, alert_class, window_bucket)` tuple so the renewal sweep can
    /// guarantee exactly-once delivery per window.
    #[must_use]
    pub fn new(
        kind: AlertKind,
        severity: Severity,
        message: impl Into<String>,
        dedup_key: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: AlertId::generate(),
            kind,
            severity,
            entity_id: None,
            license_id: None,
            message: message.into(),
            created_at: now,
            dedup_key: dedup_key.into(),
        }
    }

    #[must_use]
    pub fn with_entity(mut self, entity_id: impl Into<EntityId>) -> Self {
        self.entity_id = Some(entity_id.into());
        self
    }

    #[must_use]
    pub fn with_license(mut self, license_id: impl Into<LicenseId>) -> Self {
        self.license_id = Some(license_id.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedup_key_is_preserved() {
        let alert = Alert::new(
            AlertKind::LicenseExpiringSoon,
            Severity::Warning,
            "license expires in 7 days",
            "lic-1:expiring_soon:2026-07",
            Utc::now(),
        )
        .with_license("lic-1");
        assert_eq!(alert.dedup_key, "lic-1:expiring_soon:2026-07");
        assert_eq!(alert.license_id.unwrap().as_str(), "lic-1");
    }
}
