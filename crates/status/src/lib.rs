//! Progress tracking, entity risk summaries, and the renewal/anomaly alert
//! sweep (spec.md §4.8). Depends on `occam-workflow`, `occam-factbox`, and
//! `occam-audit` as read models; never depends on `occam-orchestrator`
//! itself, `occam-agent`, `occam-governance`, or `occam-vault`.

pub mod analytics;
pub mod delivery;
pub mod engine;
pub mod progress;
pub mod summary;
pub mod sweep;

pub use analytics::AnalyticsSnapshot;
pub use delivery::{DeliveryChannel, DeliveryOutcome};
pub use engine::StatusEngine;
pub use progress::ProgressSnapshot;
pub use summary::{EntitySummary, RiskLevel};
pub use sweep::run_renewal_sweep;
