use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Outcome of one `Agent::execute` call (spec.md §4.5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentResult {
    pub success: bool,
    pub data: Value,
    /// Confidence score in `[0.0, 1.0]`.
    pub confidence: f64,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
    pub latency: Duration,
}

impl AgentResult {
    #[must_use]
    pub fn success(data: Value, confidence: f64, latency: Duration) -> Self {
        Self {
            success: true,
            data,
            confidence: confidence.clamp(0.0, 1.0),
            warnings: Vec::new(),
            errors: Vec::new(),
            latency,
        }
    }

    #[must_use]
    pub fn failure(errors: Vec<String>, latency: Duration) -> Self {
        Self {
            success: false,
            data: Value::Null,
            confidence: 0.0,
            warnings: Vec::new(),
            errors,
            latency,
        }
    }

    #[must_use]
    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings = warnings;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_clamps_confidence() {
        let result = AgentResult::success(Value::Null, 1.5, Duration::from_millis(10));
        assert!((result.confidence - 1.0).abs() < f64::EPSILON);
        assert!(result.success);
    }

    #[test]
    fn failure_has_zero_confidence() {
        let result = AgentResult::failure(vec!["boom".into()], Duration::from_millis(1));
        assert!(!result.success);
        assert_eq!(result.confidence, 0.0);
        assert_eq!(result.errors.len(), 1);
    }
}
