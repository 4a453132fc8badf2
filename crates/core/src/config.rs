use serde::{Deserialize, Serialize};

/// Default `audit_retention_days`: roughly seven years, shared between
/// `OrchestratorConfig`'s default and `occam_audit::InMemoryAuditStore`'s
/// fallback so a store built without an explicit retention period still
/// honors spec.md §3's retention-deadline invariant.
pub const DEFAULT_AUDIT_RETENTION_DAYS: i64 = 2555;

/// Password policy applied by `occam_vault` when provisioning or rotating
/// credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PasswordPolicy {
    pub min_length: usize,
    pub require_upper: bool,
    pub require_lower: bool,
    pub require_digit: bool,
    pub require_symbol: bool,
    pub reject_common_passwords: bool,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: 12,
            require_upper: true,
            require_lower: true,
            require_digit: true,
            require_symbol: true,
            reject_common_passwords: true,
        }
    }
}

/// Top-level configuration for the OCCAM orchestrator, loaded from a TOML
/// file and overridable via CLI flags, the way `acteon-cli` layers config
/// file defaults under `clap`-parsed overrides.
///
/// `vault_master_key` is intentionally absent from this struct: per spec §6
/// it is supplied out-of-band (environment variable or secrets mount) and
/// its absence is a fatal startup error, never silently defaulted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Max concurrent workflow stages. Defaults to `cores * 2` when `None`.
    pub worker_pool_size: Option<usize>,
    pub max_retries: u32,
    pub retry_base_ms: u64,
    pub retry_cap_ms: u64,
    /// `deadline = agent.estimated_latency_ms * stage_deadline_multiplier`,
    /// clamped to `stage_deadline_max_ms`.
    pub stage_deadline_multiplier: f64,
    pub stage_deadline_max_ms: u64,
    pub approval_expiry_hours: i64,
    pub renewal_warning_days: i64,
    pub renewal_critical_days: i64,
    pub audit_retention_days: i64,
    pub password_policy: PasswordPolicy,
    pub daily_spend_limit: f64,
    pub max_transaction_amount: f64,
    pub approval_threshold: f64,
    pub rate_limit_window_minutes: i64,
    pub max_transactions_per_window: u32,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            worker_pool_size: None,
            max_retries: 3,
            retry_base_ms: 250,
            retry_cap_ms: 30_000,
            stage_deadline_multiplier: 5.0,
            stage_deadline_max_ms: 120_000,
            approval_expiry_hours: 24,
            renewal_warning_days: 30,
            renewal_critical_days: 7,
            audit_retention_days: DEFAULT_AUDIT_RETENTION_DAYS,
            password_policy: PasswordPolicy::default(),
            daily_spend_limit: 1_000_000.0,
            max_transaction_amount: 250_000.0,
            approval_threshold: 50_000.0,
            rate_limit_window_minutes: 60,
            max_transactions_per_window: 100,
        }
    }
}

impl OrchestratorConfig {
    /// Effective worker pool size: the configured value, or `cores * 2`.
    #[must_use]
    pub fn effective_worker_pool_size(&self) -> usize {
        self.worker_pool_size
            .unwrap_or_else(|| std::thread::available_parallelism().map_or(4, |n| n.get() * 2))
    }

    /// Parse from a TOML document. Callers layer CLI overrides on top of the
    /// returned value before constructing the Orchestrator.
    ///
    /// # Errors
    /// Returns an error if `raw` is not valid TOML or does not match the
    /// config schema.
    pub fn from_toml_str(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let cfg = OrchestratorConfig::default();
        assert_eq!(cfg.max_retries, 3);
        assert_eq!(cfg.retry_base_ms, 250);
        assert_eq!(cfg.retry_cap_ms, 30_000);
        assert_eq!(cfg.renewal_warning_days, 30);
        assert_eq!(cfg.renewal_critical_days, 7);
        assert_eq!(cfg.audit_retention_days, 2555);
        assert_eq!(cfg.password_policy.min_length, 12);
    }

    #[test]
    fn parses_partial_toml_with_defaults() {
        let cfg = OrchestratorConfig::from_toml_str("max_retries = 5\n").unwrap();
        assert_eq!(cfg.max_retries, 5);
        assert_eq!(cfg.retry_base_ms, 250);
    }

    #[test]
    fn worker_pool_size_falls_back_to_cores() {
        let cfg = OrchestratorConfig::default();
        assert!(cfg.effective_worker_pool_size() >= 1);
    }
}
