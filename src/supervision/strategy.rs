//! Restart policy: propagation scope, retry budget and sliding window.

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Which children are restarted when one of them fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Propagation {
    /// Only the failed child.
    #[default]
    OneForOne,
    /// Every child currently linked to the supervisor.
    AllForOne,
}

/// Whether a supervised actor is restarted at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permanence {
    #[default]
    Permanent,
    /// Stopped for good on its first failure.
    Temporary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestartStrategy {
    pub propagation: Propagation,
    /// Restarts allowed inside `within` before the failure is escalated.
    pub max_retries: u32,
    /// Sliding window. Zero means failures never age out.
    pub within: Duration,
}

impl Default for RestartStrategy {
    fn default() -> Self {
        Self::one_for_one(3, Duration::from_secs(5))
    }
}

impl RestartStrategy {
    pub fn one_for_one(max_retries: u32, within: Duration) -> Self {
        Self {
            propagation: Propagation::OneForOne,
            max_retries,
            within,
        }
    }

    pub fn all_for_one(max_retries: u32, within: Duration) -> Self {
        Self {
            propagation: Propagation::AllForOne,
            max_retries,
            within,
        }
    }
}

/// Rolling failure count for one supervised subtree.
#[derive(Debug, Default)]
pub struct RestartStatistics {
    failures: Vec<Instant>,
}

impl RestartStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a failure at `now` and returns how many fall inside `window`.
    pub fn record_failure(&mut self, now: Instant, window: Duration) -> usize {
        self.prune(now, window);
        self.failures.push(now);
        self.failures.len()
    }

    /// True when the failure just recorded exceeds the strategy's budget.
    pub fn exceeds(&mut self, strategy: &RestartStrategy, now: Instant) -> bool {
        self.record_failure(now, strategy.within) > strategy.max_retries as usize
    }

    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    pub fn reset(&mut self) {
        self.failures.clear();
    }

    fn prune(&mut self, now: Instant, window: Duration) {
        if window.is_zero() {
            return;
        }
        self.failures
            .retain(|&at| now.saturating_duration_since(at) < window);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fourth_failure_in_window_exceeds_budget_of_three() {
        let strategy = RestartStrategy::one_for_one(3, Duration::from_secs(10));
        let mut stats = RestartStatistics::new();
        let start = Instant::now();

        for i in 0..3 {
            assert!(!stats.exceeds(&strategy, start + Duration::from_millis(i)));
        }
        assert!(stats.exceeds(&strategy, start + Duration::from_millis(3)));
    }

    #[test]
    fn window_elapsing_resets_the_count() {
        let strategy = RestartStrategy::one_for_one(1, Duration::from_millis(100));
        let mut stats = RestartStatistics::new();
        let start = Instant::now();

        assert!(!stats.exceeds(&strategy, start));
        assert!(!stats.exceeds(&strategy, start + Duration::from_millis(150)));
        assert_eq!(stats.failure_count(), 1);
        assert!(stats.exceeds(&strategy, start + Duration::from_millis(160)));
    }

    #[test]
    fn zero_window_never_forgets() {
        let strategy = RestartStrategy::all_for_one(2, Duration::ZERO);
        let mut stats = RestartStatistics::new();
        let start = Instant::now();

        assert!(!stats.exceeds(&strategy, start));
        assert!(!stats.exceeds(&strategy, start + Duration::from_secs(3600)));
        assert!(stats.exceeds(&strategy, start + Duration::from_secs(7200)));
    }

    #[test]
    fn decodes_from_snake_case() {
        let strategy: RestartStrategy = serde_json::from_str(
            r#"{"propagation":"all_for_one","max_retries":5,"within":{"secs":2,"nanos":0}}"#,
        )
        .unwrap();
        assert_eq!(strategy, RestartStrategy::all_for_one(5, Duration::from_secs(2)));
    }
}
