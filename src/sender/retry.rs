//! Backoff policy for re-submitting transactions

use std::time::Duration;

use crate::config;
use crate::errors::{kinds, SenderError, SenderResult};

/// Retry policy: bounded attempts, geometric wait between rounds
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including initial attempt)
    pub max_attempts: u32,
    /// Wait before the second attempt
    pub initial_wait: Duration,
    /// Multiplier applied after every retryable failure
    pub wait_backoff: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 12,
            initial_wait: Duration::from_millis(500),
            wait_backoff: 1.5,
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &config::RetryConfig) -> SenderResult<Self> {
        config.validate()?;
        Ok(Self {
            max_attempts: config.max_attempts,
            initial_wait: config.initial_wait(),
            wait_backoff: config.wait_backoff,
        })
    }

    /// Wait after the failed attempt with 0-based index `round`
    pub fn wait_after(&self, round: u32) -> Duration {
        self.initial_wait
            .mul_f64(self.wait_backoff.powi(round.min(i32::MAX as u32) as i32))
    }

    /// Waits between consecutive attempts; one fewer than `max_attempts`
    pub fn schedule(&self) -> impl Iterator<Item = Duration> + '_ {
        (0..self.max_attempts.saturating_sub(1)).map(move |round| self.wait_after(round))
    }

    /// Upper bound on time spent sleeping when every attempt is retried
    pub fn total_wait(&self) -> Duration {
        self.schedule().sum()
    }
}

/// What the broadcaster does with a failed submission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Stale nonce: drop the cached key and retry
    EvictAndRetry,
    /// Expired reference block: retry with the cached key
    Retry,
    /// Anything else ends the send
    Abort,
}

impl RetryDecision {
    pub fn classify(error: &SenderError) -> Self {
        match error.error_type() {
            kinds::INVALID_NONCE => RetryDecision::EvictAndRetry,
            kinds::EXPIRED => RetryDecision::Retry,
            _ => RetryDecision::Abort,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_schedule() {
        let policy = RetryPolicy::default();
        let waits: Vec<u128> = policy.schedule().map(|d| d.as_millis()).collect();
        assert_eq!(waits.len(), 11);
        assert_eq!(&waits[..4], &[500, 750, 1125, 1687]);
    }

    #[test]
    fn test_single_attempt_never_waits() {
        let policy = RetryPolicy {
            max_attempts: 1,
            ..RetryPolicy::default()
        };
        assert_eq!(policy.schedule().count(), 0);
        assert_eq!(policy.total_wait(), Duration::ZERO);
    }

    #[test]
    fn test_from_config_validates() {
        let mut config = config::RetryConfig::default();
        assert_eq!(RetryPolicy::from_config(&config).unwrap(), RetryPolicy::default());

        config.max_attempts = 0;
        assert!(RetryPolicy::from_config(&config).is_err());
    }

    #[test]
    fn test_classification() {
        assert_eq!(
            RetryDecision::classify(&SenderError::typed("n", kinds::INVALID_NONCE)),
            RetryDecision::EvictAndRetry
        );
        assert_eq!(
            RetryDecision::classify(&SenderError::typed("e", kinds::EXPIRED)),
            RetryDecision::Retry
        );
        assert_eq!(
            RetryDecision::classify(&SenderError::typed("t", kinds::TIMEOUT)),
            RetryDecision::Abort
        );
        assert_eq!(
            RetryDecision::classify(&SenderError::Transport("x".to_string())),
            RetryDecision::Abort
        );
    }
}
