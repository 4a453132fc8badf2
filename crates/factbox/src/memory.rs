use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use moka::sync::Cache;
use tracing::instrument;

use occam_audit::AuditStore;
use occam_core::{
    Clock, Entity, EntityId, EventStatus, License, LicenseId, LicenseStatus, OccamResult, Severity,
    TraceId,
};

use crate::rule::RegulatoryRule;
use crate::store::{EntityStatus, FactBox};

const CACHE_TTL: Duration = Duration::from_secs(30);

/// In-memory [`FactBox`] backing. Entities and licenses are the system of
/// record in `DashMap`s; a `moka` read-through cache sits in front of
/// `get_entity`/`get_license` and is invalidated explicitly on every write,
/// matching spec.md §4.3's "cache must be invalidated on any write."
pub struct InMemoryFactBox {
    entities: DashMap<EntityId, Entity>,
    licenses: DashMap<LicenseId, License>,
    rules: DashMap<(String, String), Vec<RegulatoryRule>>,
    entity_cache: Cache<EntityId, Entity>,
    license_cache: Cache<LicenseId, License>,
    audit: Arc<dyn AuditStore>,
    clock: Arc<dyn Clock>,
}

impl InMemoryFactBox {
    #[must_use]
    pub fn new(audit: Arc<dyn AuditStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            entities: DashMap::new(),
            licenses: DashMap::new(),
            rules: DashMap::new(),
            entity_cache: Cache::builder().time_to_live(CACHE_TTL).build(),
            license_cache: Cache::builder().time_to_live(CACHE_TTL).build(),
            audit,
            clock,
        }
    }

    /// Seed a regulatory rule. Not part of the `FactBox` trait: rule
    /// ingestion is an administrative path, not a runtime compliance
    /// operation.
    pub fn register_rule(&self, rule: RegulatoryRule) {
        self.rules
            .entry((rule.regulation.clone(), rule.jurisdiction.clone()))
            .or_default()
            .push(rule);
    }
}

#[async_trait]
impl FactBox for InMemoryFactBox {
    async fn get_entity(&self, id: &EntityId) -> OccamResult<Option<Entity>> {
        if let Some(entity) = self.entity_cache.get(id) {
            return Ok(Some(entity));
        }
        let entity = self.entities.get(id).map(|e| e.value().clone());
        if let Some(entity) = &entity {
            self.entity_cache.insert(id.clone(), entity.clone());
        }
        Ok(entity)
    }

    async fn get_licenses_by_entity(&self, id: &EntityId) -> OccamResult<Vec<License>> {
        Ok(self
            .licenses
            .iter()
            .filter(|entry| &entry.value().entity_id == id)
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn get_license(&self, id: &LicenseId) -> OccamResult<Option<License>> {
        if let Some(license) = self.license_cache.get(id) {
            return Ok(Some(license));
        }
        let license = self.licenses.get(id).map(|l| l.value().clone());
        if let Some(license) = &license {
            self.license_cache.insert(id.clone(), license.clone());
        }
        Ok(license)
    }

    async fn get_expiring_licenses(&self, within_days: i64) -> OccamResult<Vec<License>> {
        let now = self.clock.now();
        Ok(self
            .licenses
            .iter()
            .map(|entry| entry.value().clone())
            .filter(|license| license.status == LicenseStatus::Active)
            .filter(|license| {
                let days = license.days_until_expiry(now);
                days > 0 && days <= within_days
            })
            .collect())
    }

    async fn get_entity_status(&self, id: &EntityId) -> OccamResult<EntityStatus> {
        let entity = self.get_entity(id).await?.ok_or_else(|| {
            occam_core::OccamError::NotFound(format!("entity {id} not found"))
        })?;
        let licenses = self.get_licenses_by_entity(id).await?;
        let now = self.clock.now();

        let active = licenses
            .iter()
            .filter(|l| l.status == LicenseStatus::Active)
            .count();
        let expired = licenses
            .iter()
            .filter(|l| l.status == LicenseStatus::Active && l.is_expired_at(now))
            .count();
        let non_expired_active = active.saturating_sub(expired);

        let score = if active == 0 {
            100
        } else {
            ((non_expired_active as f64 / active as f64) * 100.0).round() as u8
        };

        Ok(EntityStatus {
            entity_id: id.clone(),
            kyc_verified: entity.is_kyc_verified(),
            active_license_count: active,
            expired_license_count: expired,
            compliance_score: score,
        })
    }

    async fn verify_kyc(&self, id: &EntityId) -> OccamResult<bool> {
        Ok(self
            .get_entity(id)
            .await?
            .map(|e| e.is_kyc_verified())
            .unwrap_or(false))
    }

    async fn get_regulatory_rules(
        &self,
        regulation: &str,
        jurisdiction: &str,
    ) -> OccamResult<Vec<RegulatoryRule>> {
        let now = self.clock.now();
        Ok(self
            .rules
            .get(&(regulation.to_owned(), jurisdiction.to_owned()))
            .map(|rules| {
                rules
                    .iter()
                    .filter(|r| r.is_active_at(now))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    #[instrument(skip(self, entity))]
    async fn save_entity(&self, entity: Entity) -> OccamResult<()> {
        let now = self.clock.now();
        let event = occam_core::AuditEvent::new(
            TraceId::generate(),
            "factbox.save_entity",
            EventStatus::Succeeded,
            Severity::Info,
            "entity saved",
            now,
        )
        .with_entity(entity.id.clone());
        self.audit.append(event).await?;

        self.entity_cache.invalidate(&entity.id);
        self.entities.insert(entity.id.clone(), entity);
        Ok(())
    }

    #[instrument(skip(self, license))]
    async fn save_license(&self, license: License) -> OccamResult<()> {
        let now = self.clock.now();
        let event = occam_core::AuditEvent::new(
            TraceId::generate(),
            "factbox.save_license",
            EventStatus::Succeeded,
            Severity::Info,
            "license saved",
            now,
        )
        .with_entity(license.entity_id.clone());
        self.audit.append(event).await?;

        self.license_cache.invalidate(&license.id);
        self.licenses.insert(license.id.clone(), license);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use occam_audit::InMemoryAuditStore;
    use occam_core::SystemClock;

    fn factbox() -> InMemoryFactBox {
        InMemoryFactBox::new(Arc::new(InMemoryAuditStore::new()), Arc::new(SystemClock))
    }

    #[tokio::test]
    async fn save_then_get_entity_roundtrips() {
        let fb = factbox();
        let entity = Entity::new("ent-1", "Acme", "company", "US", now());
        fb.save_entity(entity.clone()).await.unwrap();
        let fetched = fb.get_entity(&entity.id).await.unwrap().unwrap();
        assert_eq!(fetched.name, "Acme");
    }

    fn now() -> chrono::DateTime<chrono::Utc> {
        chrono::Utc::now()
    }

    #[tokio::test]
    async fn verify_kyc_false_for_unverified() {
        let fb = factbox();
        let entity = Entity::new("ent-2", "Beta", "llc", "UK", now());
        fb.save_entity(entity.clone()).await.unwrap();
        assert!(!fb.verify_kyc(&entity.id).await.unwrap());
    }

    #[tokio::test]
    async fn expiring_licenses_filters_by_window() {
        let fb = factbox();
        let entity = Entity::new("ent-3", "Gamma", "llc", "US", now());
        fb.save_entity(entity.clone()).await.unwrap();

        let mut near = License::new(
            "lic-near",
            entity.id.clone(),
            "broker",
            "US",
            now() - chrono::Duration::days(10),
            now() + chrono::Duration::days(5),
        )
        .unwrap();
        near.transition_to(LicenseStatus::Active).unwrap();

        let mut far = License::new(
            "lic-far",
            entity.id.clone(),
            "broker",
            "US",
            now() - chrono::Duration::days(10),
            now() + chrono::Duration::days(100),
        )
        .unwrap();
        far.transition_to(LicenseStatus::Active).unwrap();

        fb.save_license(near.clone()).await.unwrap();
        fb.save_license(far).await.unwrap();

        let expiring = fb.get_expiring_licenses(30).await.unwrap();
        assert_eq!(expiring.len(), 1);
        assert_eq!(expiring[0].id, near.id);
    }

    #[tokio::test]
    async fn entity_status_computes_compliance_score() {
        let fb = factbox();
        let entity = Entity::new("ent-4", "Delta", "llc", "US", now());
        fb.save_entity(entity.clone()).await.unwrap();

        let mut active = License::new(
            "lic-a",
            entity.id.clone(),
            "broker",
            "US",
            now() - chrono::Duration::days(100),
            now() + chrono::Duration::days(100),
        )
        .unwrap();
        active.transition_to(LicenseStatus::Active).unwrap();
        fb.save_license(active).await.unwrap();

        let mut expired = License::new(
            "lic-b",
            entity.id.clone(),
            "broker",
            "US",
            now() - chrono::Duration::days(200),
            now() - chrono::Duration::days(1),
        )
        .unwrap();
        expired.transition_to(LicenseStatus::Active).unwrap();
        fb.save_license(expired).await.unwrap();

        let status = fb.get_entity_status(&entity.id).await.unwrap();
        assert_eq!(status.active_license_count, 2);
        assert_eq!(status.expired_license_count, 1);
        assert_eq!(status.compliance_score, 50);
    }

    #[tokio::test]
    async fn cache_invalidated_on_save() {
        let fb = factbox();
        let entity = Entity::new("ent-5", "Epsilon", "llc", "US", now());
        fb.save_entity(entity.clone()).await.unwrap();
        fb.get_entity(&entity.id).await.unwrap();

        let mut updated = entity.clone();
        updated.name = "Epsilon Renamed".into();
        fb.save_entity(updated).await.unwrap();

        let fetched = fb.get_entity(&entity.id).await.unwrap().unwrap();
        assert_eq!(fetched.name, "Epsilon Renamed");
    }

    #[tokio::test]
    async fn regulatory_rules_filters_by_active_window() {
        let fb = factbox();
        fb.register_rule(RegulatoryRule {
            id: "r1".into(),
            regulation: "AML".into(),
            jurisdiction: "US".into(),
            description: "expired rule".into(),
            effective_from: now() - chrono::Duration::days(100),
            effective_to: Some(now() - chrono::Duration::days(1)),
        });
        fb.register_rule(RegulatoryRule {
            id: "r2".into(),
            regulation: "AML".into(),
            jurisdiction: "US".into(),
            description: "active rule".into(),
            effective_from: now() - chrono::Duration::days(10),
            effective_to: None,
        });

        let rules = fb.get_regulatory_rules("AML", "US").await.unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].id, "r2");
    }
}
