//! Monetary and rate-sensitive compliance policy gate (spec §4.4):
//! transaction limits, approval workflow, and anomaly detection over a
//! bounded per-entity rolling history.

pub mod anomaly;
pub mod governance;
pub mod history;
pub mod validate;

pub use anomaly::{detect_anomalies, AnomalyFinding, AnomalySeverity};
pub use governance::Governance;
pub use history::{TransactionHistory, TransactionRecord};
pub use validate::{TransactionContext, ValidationResult, Violation, Warning};
