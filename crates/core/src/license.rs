use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{OccamError, OccamResult};
use crate::ids::{EntityId, LicenseId};

/// Lifecycle status of a license record.
///
/// Legal transitions (spec §3): `pending -> active`, `active -> expired`,
/// `active -> suspended`. All other transitions are rejected by
/// [`License::transition_to`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LicenseStatus {
    Pending,
    Active,
    Expired,
    Suspended,
}

impl LicenseStatus {
    fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Active)
                | (Self::Active, Self::Expired)
                | (Self::Active, Self::Suspended)
        )
    }
}

/// A license or permit held by an entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct License {
    pub id: LicenseId,
    pub entity_id: EntityId,
    pub license_type: String,
    pub jurisdiction: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub status: LicenseStatus,
}

impl License {
    /// Construct a new license in `pending` status.
    ///
    /// # Errors
    /// Returns [`OccamError::Validation`] if `expires_at` is not strictly
    /// after `issued_at` (spec §3 invariant: expiry > issue).
    pub fn new(
        id: impl Into<LicenseId>,
        entity_id: impl Into<EntityId>,
        license_type: impl Into<String>,
        jurisdiction: impl Into<String>,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> OccamResult<Self> {
        if expires_at <= issued_at {
            return Err(OccamError::Validation(
                "license expiry must be after issue date".into(),
            ));
        }
        Ok(Self {
            id: id.into(),
            entity_id: entity_id.into(),
            license_type: license_type.into(),
            jurisdiction: jurisdiction.into(),
            issued_at,
            expires_at,
            status: LicenseStatus::Pending,
        })
    }

    /// Returns `true` if `at` is on or after the license's expiry instant.
    #[must_use]
    pub fn is_expired_at(&self, at: DateTime<Utc>) -> bool {
        at >= self.expires_at
    }

    /// Days remaining until expiry, counted from `at`. Negative if already
    /// expired.
    #[must_use]
    pub fn days_until_expiry(&self, at: DateTime<Utc>) -> i64 {
        (self.expires_at - at).num_days()
    }

    /// Attempt a status transition, enforcing the legal-transition table.
    ///
    /// # Errors
    /// Returns [`OccamError::Validation`] if the transition is not legal.
    pub fn transition_to(&mut self, next: LicenseStatus) -> OccamResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(OccamError::Validation(format!(
                "illegal license transition {:?} -> {:?}",
                self.status, next
            )));
        }
        self.status = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(offset_days: i64) -> DateTime<Utc> {
        Utc::now() + chrono::Duration::days(offset_days)
    }

    #[test]
    fn rejects_expiry_before_issue() {
        let result = License::new("lic-1", "ent-1", "broker", "US", t(10), t(5));
        assert!(result.is_err());
    }

    #[test]
    fn accepts_valid_dates() {
        let lic = License::new("lic-1", "ent-1", "broker", "US", t(0), t(365)).unwrap();
        assert_eq!(lic.status, LicenseStatus::Pending);
    }

    #[test]
    fn legal_transitions_succeed() {
        let mut lic = License::new("lic-1", "ent-1", "broker", "US", t(0), t(365)).unwrap();
        lic.transition_to(LicenseStatus::Active).unwrap();
        assert_eq!(lic.status, LicenseStatus::Active);
        lic.transition_to(LicenseStatus::Suspended).unwrap();
        assert_eq!(lic.status, LicenseStatus::Suspended);
    }

    #[test]
    fn illegal_transitions_rejected() {
        let mut lic = License::new("lic-1", "ent-1", "broker", "US", t(0), t(365)).unwrap();
        assert!(lic.transition_to(LicenseStatus::Expired).is_err());
        lic.transition_to(LicenseStatus::Active).unwrap();
        assert!(lic.transition_to(LicenseStatus::Pending).is_err());
    }

    #[test]
    fn expiry_helpers() {
        let lic = License::new("lic-1", "ent-1", "broker", "US", t(-10), t(5)).unwrap();
        assert!(!lic.is_expired_at(Utc::now()));
        assert!(lic.days_until_expiry(Utc::now()) <= 5);
    }
}
