//! Bounded retry policy for malformed model output.

use backon::ExponentialBuilder;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::humantime_duration;

/// Exponential backoff with a hard attempt limit.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts, including the first call
    pub max_attempts: usize,

    /// Delay before the second attempt
    #[serde(with = "humantime_duration")]
    pub initial_delay: Duration,

    /// Upper bound on any single delay
    #[serde(with = "humantime_duration")]
    pub max_delay: Duration,

    /// Multiplier applied after each retry
    pub factor: f32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            factor: 2.0,
        }
    }
}

impl RetryPolicy {
    /// A policy without delays, for tests and dry runs.
    pub fn immediate(max_attempts: usize) -> Self {
        Self {
            max_attempts,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            factor: 1.0,
        }
    }

    /// Backoff builder for `backon`; retries are attempts minus the first call.
    pub fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.initial_delay)
            .with_max_delay(self.max_delay)
            .with_factor(self.factor)
            .with_max_times(self.max_attempts.saturating_sub(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use backon::BackoffBuilder;

    #[test]
    fn test_backoff_delays_grow_and_stop() {
        let policy = RetryPolicy {
            max_attempts: 4,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(250),
            factor: 2.0,
        };
        let delays: Vec<Duration> = policy.backoff().build().collect();
        let expected = [100, 200, 250].map(Duration::from_millis);
        assert_eq!(delays.len(), expected.len());

        // backon scales delays in f32
        let tolerance = Duration::from_millis(1);
        for (delay, want) in delays.iter().zip(expected) {
            assert!(
                (*delay).max(want) - (*delay).min(want) <= tolerance,
                "delay {:?} not within {:?} of {:?}",
                delay,
                tolerance,
                want
            );
        }
        assert!(delays.iter().all(|d| *d <= policy.max_delay));
    }

    #[test]
    fn test_single_attempt_never_retries() {
        assert_eq!(RetryPolicy::immediate(1).backoff().build().count(), 0);
    }

    #[test]
    fn test_deserialize_human_durations() {
        let policy: RetryPolicy =
            serde_yaml::from_str("max_attempts: 3\ninitial_delay: 250ms\nmax_delay: 10s\n").unwrap();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.initial_delay, Duration::from_millis(250));
        assert_eq!(policy.max_delay, Duration::from_secs(10));
        assert_eq!(policy.factor, 2.0);
    }
}
