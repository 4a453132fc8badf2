use std::collections::VecDeque;

use chrono::{DateTime, Utc};

const MAX_HISTORY: usize = 1_000;

/// One recorded transaction, retained for daily-total, rate-limit-window,
/// and anomaly-detection lookups.
#[derive(Debug, Clone)]
pub struct TransactionRecord {
    pub amount: f64,
    pub occurred_at: DateTime<Utc>,
}

/// A bounded rolling history of transactions for one entity. Oldest
/// entries are dropped once the cap is reached (spec.md §4.4:
/// "append to rolling history bounded at 1,000 entries"), mirroring the
/// teacher's `DeadLetterQueue`'s capped `Vec` in shape if not in purpose.
#[derive(Debug, Default)]
pub struct TransactionHistory {
    entries: VecDeque<TransactionRecord>,
}

impl TransactionHistory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, amount: f64, occurred_at: DateTime<Utc>) {
        if self.entries.len() >= MAX_HISTORY {
            self.entries.pop_front();
        }
        self.entries.push_back(TransactionRecord { amount, occurred_at });
    }

    #[must_use]
    pub fn entries(&self) -> &VecDeque<TransactionRecord> {
        &self.entries
    }

    /// Sum of amounts since `since` (inclusive).
    #[must_use]
    pub fn total_since(&self, since: DateTime<Utc>) -> f64 {
        self.entries
            .iter()
            .filter(|e| e.occurred_at >= since)
            .map(|e| e.amount)
            .sum()
    }

    /// Count of transactions in `[since, until]`.
    #[must_use]
    pub fn count_in_window(&self, since: DateTime<Utc>, until: DateTime<Utc>) -> usize {
        self.entries
            .iter()
            .filter(|e| e.occurred_at >= since && e.occurred_at <= until)
            .count()
    }

    /// Mean amount across the whole retained history. `0.0` if empty.
    #[must_use]
    pub fn rolling_mean(&self) -> f64 {
        if self.entries.is_empty() {
            return 0.0;
        }
        self.entries.iter().map(|e| e.amount).sum::<f64>() / self.entries.len() as f64
    }
}
