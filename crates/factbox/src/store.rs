use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use occam_core::{Entity, EntityId, License, LicenseId, OccamResult};

use crate::rule::RegulatoryRule;

/// Compliance-score snapshot produced by `getEntityStatus` (spec.md §4.3):
/// the fraction of the entity's active licenses that are not expired,
/// scaled to 0-100 and rounded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityStatus {
    pub entity_id: EntityId,
    pub kyc_verified: bool,
    pub active_license_count: usize,
    pub expired_license_count: usize,
    pub compliance_score: u8,
}

/// Trusted read (and write-of-record) layer for entities, licenses, and
/// regulatory rules.
///
/// Writes go through `save_entity`/`save_license` rather than a generic
/// upsert so the implementation can guarantee the spec's ordering rule:
/// the audit event for a write is emitted before the write is visible to
/// readers.
#[async_trait]
pub trait FactBox: Send + Sync {
    async fn get_entity(&self, id: &EntityId) -> OccamResult<Option<Entity>>;
    async fn get_licenses_by_entity(&self, id: &EntityId) -> OccamResult<Vec<License>>;
    async fn get_license(&self, id: &LicenseId) -> OccamResult<Option<License>>;

    /// Active licenses where `0 < days_to_expiry <= within_days`.
    async fn get_expiring_licenses(&self, within_days: i64) -> OccamResult<Vec<License>>;

    async fn get_entity_status(&self, id: &EntityId) -> OccamResult<EntityStatus>;

    /// `true` iff the entity's KYC status is `verified`.
    async fn verify_kyc(&self, id: &EntityId) -> OccamResult<bool>;

    async fn get_regulatory_rules(
        &self,
        regulation: &str,
        jurisdiction: &str,
    ) -> OccamResult<Vec<RegulatoryRule>>;

    /// Persist an entity, invalidate any cached copy, and emit an audit
    /// event before returning.
    async fn save_entity(&self, entity: Entity) -> OccamResult<()>;

    /// Persist a license, invalidate any cached copy, and emit an audit
    /// event before returning.
    async fn save_license(&self, license: License) -> OccamResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn _assert_object_safe(_: &dyn FactBox) {}
}
