use chrono::{DateTime, Utc};

use crate::history::TransactionHistory;

/// Severity of a detected anomaly. Anomalies never block a transaction by
/// themselves (spec.md §4.4) — only a `High` finding sets
/// `requires_approval` on the enclosing `ValidationResult`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AnomalySeverity {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone)]
pub struct AnomalyFinding {
    pub rule: &'static str,
    pub severity: AnomalySeverity,
    pub detail: String,
}

pub const DEFAULT_RAPID_TRANSACTION_COUNT: usize = 10;
pub const DEFAULT_RAPID_WINDOW_MINUTES: i64 = 5;
const DUPLICATE_WINDOW_MINUTES: i64 = 5;

/// Evaluate the three anomaly rules against `amount` occurring at `at`,
/// given the entity's prior rolling history (not yet including this
/// transaction).
#[must_use]
pub fn detect_anomalies(
    history: &TransactionHistory,
    amount: f64,
    at: DateTime<Utc>,
) -> Vec<AnomalyFinding> {
    let mut findings = Vec::new();

    // (a) amount > 3x rolling mean; severity scales with the multiplier.
    let mean = history.rolling_mean();
    if mean > 0.0 {
        let multiplier = amount / mean;
        if multiplier > 3.0 {
            let severity = if multiplier >= 5.0 {
                AnomalySeverity::High
            } else {
                AnomalySeverity::Medium
            };
            findings.push(AnomalyFinding {
                rule: "amount_exceeds_rolling_mean",
                severity,
                detail: format!("amount is {multiplier:.2}x the rolling mean of {mean:.2}"),
            });
        }
    }

    // (b) rapid transaction count within the rapid window.
    let rapid_window_start = at - chrono::Duration::minutes(DEFAULT_RAPID_WINDOW_MINUTES);
    let rapid_count = history.count_in_window(rapid_window_start, at);
    if rapid_count >= DEFAULT_RAPID_TRANSACTION_COUNT {
        findings.push(AnomalyFinding {
            rule: "rapid_transaction_count",
            severity: AnomalySeverity::High,
            detail: format!(
                "{rapid_count} transactions in the last {DEFAULT_RAPID_WINDOW_MINUTES} minutes"
            ),
        });
    }

    // (c) duplicate amount within the duplicate window.
    let duplicate_window_start = at - chrono::Duration::minutes(DUPLICATE_WINDOW_MINUTES);
    let has_duplicate = history
        .entries()
        .iter()
        .any(|e| e.occurred_at >= duplicate_window_start && e.occurred_at <= at && (e.amount - amount).abs() < f64::EPSILON);
    if has_duplicate {
        findings.push(AnomalyFinding {
            rule: "duplicate_amount",
            severity: AnomalySeverity::Medium,
            detail: format!("duplicate amount {amount:.2} within {DUPLICATE_WINDOW_MINUTES} minutes"),
        });
    }

    findings
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_amount_spike() {
        let mut history = TransactionHistory::new();
        let now = Utc::now();
        for _ in 0..5 {
            history.record(100.0, now - chrono::Duration::hours(1));
        }
        let findings = detect_anomalies(&history, 600.0, now);
        assert!(findings.iter().any(|f| f.rule == "amount_exceeds_rolling_mean"));
        let spike = findings.iter().find(|f| f.rule == "amount_exceeds_rolling_mean").unwrap();
        assert_eq!(spike.severity, AnomalySeverity::High);
    }

    #[test]
    fn detects_rapid_transactions() {
        let mut history = TransactionHistory::new();
        let now = Utc::now();
        for i in 0..10 {
            history.record(50.0, now - chrono::Duration::seconds(i));
        }
        let findings = detect_anomalies(&history, 50.0, now);
        assert!(findings.iter().any(|f| f.rule == "rapid_transaction_count"));
    }

    #[test]
    fn detects_duplicate_amount() {
        let mut history = TransactionHistory::new();
        let now = Utc::now();
        history.record(250.0, now - chrono::Duration::minutes(2));
        let findings = detect_anomalies(&history, 250.0, now);
        assert!(findings.iter().any(|f| f.rule == "duplicate_amount"));
    }

    #[test]
    fn no_findings_for_ordinary_transaction() {
        let mut history = TransactionHistory::new();
        let now = Utc::now();
        history.record(100.0, now - chrono::Duration::hours(2));
        let findings = detect_anomalies(&history, 105.0, now);
        assert!(findings.is_empty());
    }
}
