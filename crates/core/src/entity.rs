use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::EntityId;

/// KYC verification status of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KycStatus {
    Unverified,
    Verified,
    Rejected,
}

/// A jurisdictional registration held by an entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registration {
    pub registration_type: String,
    pub jurisdiction: String,
    pub status: String,
    pub effective_from: DateTime<Utc>,
    pub effective_to: Option<DateTime<Utc>>,
}

/// Contact information for an entity.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContactInfo {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// An identity record owned by FactBox.
///
/// Immutable except via explicit update events (spec §3): callers never
/// mutate a live `Entity` in place, they construct a new one and persist it
/// through `FactBox::save_entity`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub name: String,
    pub entity_type: String,
    pub jurisdiction: String,
    pub contact: ContactInfo,
    pub kyc_status: KycStatus,
    pub registrations: Vec<Registration>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity {
    /// Create a new entity record with an `unverified` KYC status.
    #[must_use]
    pub fn new(
        id: impl Into<EntityId>,
        name: impl Into<String>,
        entity_type: impl Into<String>,
        jurisdiction: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            entity_type: entity_type.into(),
            jurisdiction: jurisdiction.into(),
            contact: ContactInfo::default(),
            kyc_status: KycStatus::Unverified,
            registrations: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns `true` iff the KYC status is `verified` (spec §4.3
    /// `verifyKYC`).
    #[must_use]
    pub fn is_kyc_verified(&self) -> bool {
        self.kyc_status == KycStatus::Verified
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_entity_is_unverified() {
        let e = Entity::new("ent-1", "Acme Corp", "company", "US", Utc::now());
        assert_eq!(e.kyc_status, KycStatus::Unverified);
        assert!(!e.is_kyc_verified());
    }

    #[test]
    fn verified_entity_reports_verified() {
        let mut e = Entity::new("ent-1", "Acme Corp", "company", "US", Utc::now());
        e.kyc_status = KycStatus::Verified;
        assert!(e.is_kyc_verified());
    }

    #[test]
    fn serde_roundtrip() {
        let e = Entity::new("ent-2", "Beta LLC", "llc", "UK", Utc::now());
        let json = serde_json::to_string(&e).unwrap();
        let back: Entity = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, e.id);
        assert_eq!(back.name, e.name);
    }
}
