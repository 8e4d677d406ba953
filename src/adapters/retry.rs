//! Backoff schedule for transient API failures.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How many times a request is tried, and how long to wait in between.
///
/// Waits double from `initial_delay_ms` and never exceed `max_delay_ms`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Tries per request, the first one included
    pub max_attempts: u32,

    /// Wait before the second try
    pub initial_delay_ms: u64,

    /// Upper bound for a single wait
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 1000,
            max_delay_ms: 30_000,
        }
    }
}

impl RetryPolicy {
    /// Try once, never wait
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }

    /// The waits between tries, one fewer than `max_attempts`
    pub fn delays(&self) -> impl Iterator<Item = Duration> {
        let cap = self.max_delay_ms;
        let first = self.initial_delay_ms.min(cap);
        let waits = self.max_attempts.saturating_sub(1) as usize;

        std::iter::successors(Some(first), move |ms| Some(ms.saturating_mul(2).min(cap)))
            .take(waits)
            .map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn millis(policy: &RetryPolicy) -> Vec<u64> {
        policy.delays().map(|d| d.as_millis() as u64).collect()
    }

    #[test]
    fn test_delays_double_up_to_cap() {
        let policy = RetryPolicy {
            max_attempts: 6,
            initial_delay_ms: 500,
            max_delay_ms: 3000,
        };
        assert_eq!(millis(&policy), vec![500, 1000, 2000, 3000, 3000]);
    }

    #[test]
    fn test_default_waits_twice() {
        assert_eq!(millis(&RetryPolicy::default()), vec![1000, 2000]);
        assert!(millis(&RetryPolicy::none()).is_empty());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let policy: RetryPolicy = serde_yaml::from_str("max_attempts: 5").unwrap();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.initial_delay_ms, 1000);
        assert_eq!(policy.max_delay_ms, 30_000);
    }
}
