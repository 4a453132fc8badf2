use occam_core::PasswordPolicy;

const COMMON_PASSWORDS: &[&str] = &[
    "password", "password1", "123456", "12345678", "qwerty", "letmein", "admin123", "welcome1",
    "iloveyou", "monkey123",
];

/// Qualitative strength label reported alongside policy evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordStrength {
    Weak,
    Moderate,
    Strong,
}

/// Result of evaluating a candidate password against a [`PasswordPolicy`].
#[derive(Debug, Clone)]
pub struct PasswordEvaluation {
    pub meets_policy: bool,
    pub strength: PasswordStrength,
    pub violations: Vec<String>,
}

/// Evaluate `candidate` against `policy`. Common-password rejection, class
/// requirements, and minimum length are spec.md §4.2's explicit rules; the
/// strength label is a derived convenience on top of them.
#[must_use]
pub fn evaluate_password(candidate: &str, policy: &PasswordPolicy) -> PasswordEvaluation {
    let mut violations = Vec::new();

    if candidate.len() < policy.min_length {
        violations.push(format!(
            "password must be at least {} characters",
            policy.min_length
        ));
    }
    if policy.require_upper && !candidate.chars().any(char::is_uppercase) {
        violations.push("password must contain an uppercase letter".into());
    }
    if policy.require_lower && !candidate.chars().any(char::is_lowercase) {
        violations.push("password must contain a lowercase letter".into());
    }
    if policy.require_digit && !candidate.chars().any(|c| c.is_ascii_digit()) {
        violations.push("password must contain a digit".into());
    }
    if policy.require_symbol && !candidate.chars().any(|c| !c.is_alphanumeric()) {
        violations.push("password must contain a symbol".into());
    }
    if policy.reject_common_passwords {
        let lower = candidate.to_lowercase();
        if COMMON_PASSWORDS.iter().any(|common| lower == *common) {
            violations.push("password is on the common-password list".into());
        }
    }

    let class_count = [
        candidate.chars().any(char::is_uppercase),
        candidate.chars().any(char::is_lowercase),
        candidate.chars().any(|c| c.is_ascii_digit()),
        candidate.chars().any(|c| !c.is_alphanumeric()),
    ]
    .into_iter()
    .filter(|x| *x)
    .count();

    let strength = match (candidate.len(), class_count) {
        (len, classes) if len >= 16 && classes >= 4 => PasswordStrength::Strong,
        (len, classes) if len >= 12 && classes >= 3 => PasswordStrength::Moderate,
        _ => PasswordStrength::Weak,
    };

    PasswordEvaluation {
        meets_policy: violations.is_empty(),
        strength,
        violations,
    }
}

/// Default rotation policy (spec.md §4.2): rotate every 90 days, warn 7
/// days before expiry, never allow more than 180 days between rotations.
#[derive(Debug, Clone, Copy)]
pub struct RotationPolicy {
    pub rotation_period_days: i64,
    pub warning_days: i64,
    pub max_period_days: i64,
}

impl Default for RotationPolicy {
    fn default() -> Self {
        Self {
            rotation_period_days: 90,
            warning_days: 7,
            max_period_days: 180,
        }
    }
}
