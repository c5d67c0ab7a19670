//! Retry policy with pluggable backoff for the task executor.
//!
//! A [`RetryPolicy`] decides, given the classified kind of a failure and the
//! attempt number that just failed, whether another attempt should be made
//! and how long to wait before making it.

pub mod backoff;
pub mod config;
pub mod events;

pub use backoff::BackoffStrategy;
pub use config::{RetryConfig, RetryConfigBuilder, RetryConfigError};
pub use events::RetryEvent;

use std::time::{Duration, Instant};
use taskforge_core::{Clock, ErrorKind, TaskFailure};

/// A retry decision for a failure at a given attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after the given delay. `next_attempt` is the attempt number
    /// the caller is about to make.
    Retry {
        next_attempt: usize,
        delay: Duration,
    },
    /// Give up; the failure is terminal.
    Exhausted,
}

/// A retry policy built from a [`RetryConfig`].
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    /// Wraps a validated [`RetryConfig`] as a usable policy.
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// The policy's name, for logs and events.
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Decides whether `attempt` (the attempt number that just failed) should
    /// be retried, and if so the delay before the next attempt.
    ///
    /// A retry happens iff both the raw-failure predicate and the kind
    /// predicate (when present) allow it, AND `attempt < max_attempts + 1`.
    pub fn next_action(
        &self,
        failure: &TaskFailure,
        kind: ErrorKind,
        attempt: usize,
        clock: &dyn Clock,
    ) -> RetryDecision {
        let _ = clock; // reserved for future time-bounded retry budgets
        if attempt > self.config.max_attempts {
            return RetryDecision::Exhausted;
        }

        if let Some(predicate) = &self.config.retry_predicate {
            if !predicate(failure, attempt) {
                return RetryDecision::Exhausted;
            }
        }

        let kind_allows = match &self.config.kind_predicate {
            Some(predicate) => predicate(kind, attempt),
            None => kind.default_retryable(),
        };
        if !kind_allows {
            return RetryDecision::Exhausted;
        }

        let next_attempt = attempt + 1;
        let delay = self.delay_for(next_attempt);
        RetryDecision::Retry {
            next_attempt,
            delay,
        }
    }

    /// Computes the delay before `attempt` (attempt 1 is always zero).
    pub fn delay_for(&self, attempt: usize) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        backoff::delay_for_attempt(
            self.config.backoff_strategy,
            attempt,
            self.config.base_delay,
            self.config.max_delay,
            self.config.multiplier,
            self.config.jitter_factor,
            self.config.random_source.as_ref(),
        )
    }

    /// The configured maximum number of attempts beyond the first.
    pub fn max_attempts(&self) -> usize {
        self.config.max_attempts
    }

    /// Emits a [`RetryEvent`] to any registered listeners.
    pub fn emit(&self, event: RetryEvent) {
        #[cfg(feature = "tracing")]
        log_event(&event);
        #[cfg(feature = "metrics")]
        record_event_metric(&event, &self.config.name);

        self.config.event_listeners.emit(&event);
    }

    /// Convenience: builds a `Retry { .. }` or `Exhausted` event timestamp
    /// at the moment of the call.
    pub fn now() -> Instant {
        Instant::now()
    }
}

#[cfg(feature = "tracing")]
fn log_event(event: &RetryEvent) {
    match event {
        RetryEvent::Retry {
            pattern_name,
            attempt,
            delay,
            ..
        } => tracing::debug!(policy = pattern_name, attempt, ?delay, "retrying"),
        RetryEvent::Success {
            pattern_name,
            attempts,
            ..
        } => tracing::debug!(policy = pattern_name, attempts, "succeeded"),
        RetryEvent::Exhausted {
            pattern_name,
            attempts,
            ..
        } => tracing::warn!(policy = pattern_name, attempts, "retries exhausted"),
        RetryEvent::IgnoredError {
            pattern_name,
            attempt,
            ..
        } => tracing::debug!(policy = pattern_name, attempt, "error not retryable"),
    }
}

#[cfg(feature = "metrics")]
fn record_event_metric(event: &RetryEvent, name: &str) {
    let name_label = name.to_string();
    match event {
        RetryEvent::Retry { .. } => {
            metrics::counter!("taskforge_retry_attempts_total", "policy" => name_label)
                .increment(1)
        }
        RetryEvent::Success { .. } => {
            metrics::counter!("taskforge_retry_success_total", "policy" => name_label).increment(1)
        }
        RetryEvent::Exhausted { .. } => {
            metrics::counter!("taskforge_retry_exhausted_total", "policy" => name_label)
                .increment(1)
        }
        RetryEvent::IgnoredError { .. } => {
            metrics::counter!("taskforge_retry_ignored_total", "policy" => name_label).increment(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskforge_core::{FixedRandomSource, SystemClock};

    #[test]
    fn retries_until_max_attempts_then_exhausts() {
        let policy = RetryPolicy::new(RetryConfig::simple());
        let failure = TaskFailure::new("connection reset");
        let clock = SystemClock;

        let first = policy.next_action(&failure, ErrorKind::Network, 1, &clock);
        assert!(matches!(first, RetryDecision::Retry { next_attempt: 2, .. }));

        let second = policy.next_action(&failure, ErrorKind::Network, 2, &clock);
        assert!(matches!(second, RetryDecision::Retry { next_attempt: 3, .. }));

        let third = policy.next_action(&failure, ErrorKind::Network, 3, &clock);
        assert!(matches!(third, RetryDecision::Retry { next_attempt: 4, .. }));

        let fourth = policy.next_action(&failure, ErrorKind::Network, 4, &clock);
        assert_eq!(fourth, RetryDecision::Exhausted);
    }

    #[test]
    fn non_retryable_kind_exhausts_immediately() {
        let policy = RetryPolicy::new(RetryConfig::simple());
        let failure = TaskFailure::new("bad request");
        let clock = SystemClock;

        let decision = policy.next_action(&failure, ErrorKind::Validation, 1, &clock);
        assert_eq!(decision, RetryDecision::Exhausted);
    }

    #[test]
    fn none_preset_never_retries() {
        let policy = RetryPolicy::new(RetryConfig::none());
        let failure = TaskFailure::new("boom");
        let clock = SystemClock;

        let decision = policy.next_action(&failure, ErrorKind::Network, 1, &clock);
        assert_eq!(decision, RetryDecision::Exhausted);
    }

    #[test]
    fn attempt_one_has_zero_delay() {
        let policy = RetryPolicy::new(RetryConfig::network());
        assert_eq!(policy.delay_for(1), Duration::ZERO);
    }

    #[test]
    fn jittered_delay_is_deterministic_with_fixed_source() {
        let config = RetryConfig::builder()
            .max_attempts(3)
            .base_delay(Duration::from_millis(100))
            .backoff_strategy(BackoffStrategy::ExponentialWithJitter)
            .multiplier(2.0)
            .jitter_factor(0.5)
            .random_source(std::sync::Arc::new(FixedRandomSource(0.0)))
            .build()
            .unwrap();
        let policy = RetryPolicy::new(config);
        assert_eq!(policy.delay_for(2), Duration::from_millis(200));
    }

    #[test]
    fn custom_kind_predicate_overrides_default_taxonomy() {
        let config = RetryConfig::builder()
            .max_attempts(2)
            .should_retry_kind(|kind, _attempt| kind == ErrorKind::Validation)
            .build()
            .unwrap();
        let policy = RetryPolicy::new(config);
        let failure = TaskFailure::new("bad input");
        let clock = SystemClock;

        let decision = policy.next_action(&failure, ErrorKind::Validation, 1, &clock);
        assert!(matches!(decision, RetryDecision::Retry { .. }));

        let decision = policy.next_action(&failure, ErrorKind::Network, 1, &clock);
        assert_eq!(decision, RetryDecision::Exhausted);
    }
}
