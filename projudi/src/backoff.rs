use rand::Rng;
use serde::Deserialize;
use std::time::Duration;

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DelayKind {
    Fixed,
    /// `base_delay_ms * 2^(attempt - 1)`
    Exponential,
}

/// Retry policy for a step that is worth repeating.
///
/// Attempts are numbered from 1. The delay returned for attempt `n` is the
/// pause taken after attempt `n` failed, before attempt `n + 1` starts.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct Backoff {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub kind: DelayKind,
    /// Upper bound of a uniformly random amount added to every delay. Zero disables jitter.
    pub max_jitter_ms: u64,
}

impl Default for Backoff {
    fn default() -> Self {
        Backoff {
            max_attempts: 3,
            base_delay_ms: 2000,
            kind: DelayKind::Fixed,
            max_jitter_ms: 0,
        }
    }
}

impl Backoff {
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Backoff {
            max_attempts,
            base_delay_ms: delay.as_millis() as u64,
            kind: DelayKind::Fixed,
            max_jitter_ms: 0,
        }
    }

    pub fn delay_for(&self, attempt: u32) -> Duration {
        let base = match self.kind {
            DelayKind::Fixed => self.base_delay_ms,
            DelayKind::Exponential => self
                .base_delay_ms
                .saturating_mul(2_u64.saturating_pow(attempt.saturating_sub(1))),
        };
        let jitter = if self.max_jitter_ms > 0 {
            rand::thread_rng().gen_range(0..=self.max_jitter_ms)
        } else {
            0
        };
        Duration::from_millis(base.saturating_add(jitter))
    }

    /// A policy with zero attempts still runs the step once.
    pub fn is_last(&self, attempt: u32) -> bool {
        attempt >= self.max_attempts.max(1)
    }

    pub async fn pause(&self, attempt: u32) {
        tokio::time::sleep(self.delay_for(attempt)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_delay() {
        let backoff = Backoff::default();
        assert_eq!(backoff.delay_for(1), Duration::from_secs(2));
        assert_eq!(backoff.delay_for(2), Duration::from_secs(2));
        assert!(!backoff.is_last(2));
        assert!(backoff.is_last(3));
    }

    #[test]
    fn test_exponential_delay_with_jitter() {
        let backoff = Backoff {
            max_attempts: 5,
            base_delay_ms: 500,
            kind: DelayKind::Exponential,
            max_jitter_ms: 100,
        };
        for (attempt, base) in [(1, 500), (2, 1000), (3, 2000)] {
            let delay = backoff.delay_for(attempt).as_millis() as u64;
            assert!((base..=base + 100).contains(&delay), "attempt {attempt}: {delay}");
        }
    }

    #[test]
    fn test_zero_attempts_runs_once() {
        let backoff = Backoff::fixed(0, Duration::ZERO);
        assert!(backoff.is_last(1));
    }

    #[test]
    fn test_deserialize() {
        let backoff: Backoff =
            serde_yaml::from_str("kind: exponential\nbase_delay_ms: 100").unwrap();
        assert_eq!(backoff.kind, DelayKind::Exponential);
        assert_eq!(backoff.max_attempts, 3);
    }
}
