use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::json;

use occam_audit::{AuditQuery, AuditStore};
use occam_core::alert::{Alert, AlertKind};
use occam_core::{AuditEvent, EventStatus, OccamResult, OrchestratorConfig, Severity, TraceId};
use occam_factbox::FactBox;

use crate::delivery::{dispatch, DeliveryChannel};

const RENEWAL_SWEEP_STAGE: &str = "renewal_sweep";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RenewalWindow {
    Warning,
    Critical,
}

impl RenewalWindow {
    fn alert_class(self) -> &'static str {
        match self {
            Self::Warning => "renewal_warning",
            Self::Critical => "renewal_critical",
        }
    }

    fn severity(self) -> Severity {
        match self {
            Self::Warning => Severity::Warning,
            Self::Critical => Severity::Critical,
        }
    }

    fn alert_kind(self) -> AlertKind {
        AlertKind::LicenseExpiringSoon
    }
}

/// Critical is checked first: it is the narrower, more urgent sub-window of
/// the warning window (spec.md §4.8: warning at `renewal_warning_days`,
/// critical at `renewal_critical_days`, critical_days < warning_days).
fn classify(days_until_expiry: i64, config: &OrchestratorConfig) -> Option<RenewalWindow> {
    if days_until_expiry <= config.renewal_critical_days {
        Some(RenewalWindow::Critical)
    } else if days_until_expiry <= config.renewal_warning_days {
        Some(RenewalWindow::Warning)
    } else {
        None
    }
}

/// `true` if a renewal-sweep receipt for `dedup_key` was already recorded
/// against `entity_id`. Consulted before sending so a license sitting in the
/// same window across repeated sweep runs is only alerted once (spec.md
/// §4.8, scenario S2).
async fn receipt_exists(audit: &dyn AuditStore, entity_id: &occam_core::EntityId, dedup_key: &str) -> OccamResult<bool> {
    let query = AuditQuery {
        entity_id: Some(entity_id.clone()),
        limit: Some(1_000),
        ..Default::default()
    };
    let page = audit.query(&query).await?;
    Ok(page
        .events
        .iter()
        .any(|event| event.stage == RENEWAL_SWEEP_STAGE && event.details.get("dedup_key").and_then(|v| v.as_str()) == Some(dedup_key)))
}

/// Scan every license expiring within the warning window and raise a
/// renewal alert for each one that has entered a window it hasn't already
/// been alerted for. Returns the alerts actually sent this call.
///
/// Delivery is attempted on a best-effort basis across channels (see
/// [`crate::delivery::dispatch`]); the receipt is recorded regardless of
/// per-channel delivery outcome so a channel outage does not cause the same
/// alert to be resent indefinitely on every sweep.
pub async fn run_renewal_sweep(
    factbox: &dyn FactBox,
    audit: &dyn AuditStore,
    channels: &[Arc<dyn DeliveryChannel>],
    config: &OrchestratorConfig,
    now: DateTime<Utc>,
) -> OccamResult<Vec<Alert>> {
    let expiring = factbox.get_expiring_licenses(config.renewal_warning_days).await?;
    let mut sent = Vec::new();

    for license in expiring {
        let days = license.days_until_expiry(now);
        let Some(window) = classify(days, config) else {
            continue;
        };
        let dedup_key = format!("{}:{}", license.id.as_str(), window.alert_class());

        if receipt_exists(audit, &license.entity_id, &dedup_key).await? {
            tracing::debug!(license = %license.id, alert_class = window.alert_class(), "renewal alert already sent, skipping");
            continue;
        }

        let message = format!("license {} expires in {} day(s)", license.id.as_str(), days);
        let alert = Alert::new(window.alert_kind(), window.severity(), message.clone(), dedup_key.clone(), now)
            .with_entity(license.entity_id.clone())
            .with_license(license.id.clone());

        dispatch(channels, &alert).await;

        let receipt = AuditEvent::new(TraceId::generate(), RENEWAL_SWEEP_STAGE, EventStatus::Succeeded, window.severity(), message, now)
            .with_entity(license.entity_id.clone())
            .with_details(json!({
                "dedup_key": dedup_key,
                "alert_class": window.alert_class(),
                "license_id": license.id.as_str(),
                "days_until_expiry": days,
            }));
        audit.append(receipt).await?;
        tracing::info!(license = %alert.license_id.as_ref().map(|id| id.as_str()).unwrap_or_default(), alert_class = window.alert_class(), days, "renewal alert raised");

        sent.push(alert);
    }

    Ok(sent)
}
