use std::collections::VecDeque;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const PANIC_BUDGET: usize = 3;
const PANIC_WINDOW_MINUTES: i64 = 5;

/// Lifecycle status of a registered agent (spec.md §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Active,
    Inactive,
    Error,
    Initializing,
}

/// Rolling execution health for one agent: counts plus an incrementally
/// updated mean latency, following the teacher's
/// `avg' = avg + (latency - avg) / total` formula.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentHealth {
    pub status: AgentStatus,
    pub total_executions: u64,
    pub successful_executions: u64,
    pub failed_executions: u64,
    pub rolling_mean_latency_ms: f64,
    #[serde(skip)]
    panic_timestamps: VecDeque<DateTime<Utc>>,
}

impl Default for AgentHealth {
    fn default() -> Self {
        Self {
            status: AgentStatus::Initializing,
            total_executions: 0,
            successful_executions: 0,
            failed_executions: 0,
            rolling_mean_latency_ms: 0.0,
            panic_timestamps: VecDeque::new(),
        }
    }
}

impl AgentHealth {
    pub fn record_execution(&mut self, success: bool, latency: Duration) {
        self.total_executions += 1;
        if success {
            self.successful_executions += 1;
        } else {
            self.failed_executions += 1;
        }
        let latency_ms = latency.as_secs_f64() * 1000.0;
        self.rolling_mean_latency_ms +=
            (latency_ms - self.rolling_mean_latency_ms) / self.total_executions as f64;
        if self.status == AgentStatus::Initializing {
            self.status = AgentStatus::Active;
        }
    }

    /// Record a panic at `at`. Returns `true` if the panic budget (3 panics
    /// in 5 minutes) has been exceeded, in which case the caller demotes the
    /// agent's status to `error`.
    pub fn record_panic(&mut self, at: DateTime<Utc>) -> bool {
        while let Some(front) = self.panic_timestamps.front() {
            if at - *front > chrono::Duration::minutes(PANIC_WINDOW_MINUTES) {
                self.panic_timestamps.pop_front();
            } else {
                break;
            }
        }
        self.panic_timestamps.push_back(at);
        self.failed_executions += 1;
        self.total_executions += 1;
        if self.panic_timestamps.len() >= PANIC_BUDGET {
            self.status = AgentStatus::Error;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rolling_mean_converges_to_average() {
        let mut health = AgentHealth::default();
        health.record_execution(true, Duration::from_millis(100));
        health.record_execution(true, Duration::from_millis(200));
        health.record_execution(true, Duration::from_millis(300));
        assert!((health.rolling_mean_latency_ms - 200.0).abs() < 1e-9);
        assert_eq!(health.total_executions, 3);
        assert_eq!(health.status, AgentStatus::Active);
    }

    #[test]
    fn third_panic_within_window_demotes_to_error() {
        let mut health = AgentHealth::default();
        let now = Utc::now();
        assert!(!health.record_panic(now));
        assert!(!health.record_panic(now + chrono::Duration::minutes(1)));
        assert!(health.record_panic(now + chrono::Duration::minutes(2)));
        assert_eq!(health.status, AgentStatus::Error);
    }

    #[test]
    fn panics_outside_window_do_not_accumulate() {
        let mut health = AgentHealth::default();
        let now = Utc::now();
        assert!(!health.record_panic(now));
        assert!(!health.record_panic(now + chrono::Duration::minutes(10)));
        assert!(!health.record_panic(now + chrono::Duration::minutes(11)));
    }
}
