use crate::backoff::BackoffStrategy;
use crate::events::RetryEvent;
use std::sync::Arc;
use std::time::Duration;
use taskforge_core::{DefaultRandomSource, ErrorKind, EventListeners, RandomSource, TaskFailure};
use thiserror::Error;

/// A predicate deciding whether a particular failure should be retried at all,
/// independent of attempt count. Consulted in addition to `should_retry_kind`.
pub type RetryPredicate = Arc<dyn Fn(&TaskFailure, usize) -> bool + Send + Sync>;

/// A predicate deciding whether a given error kind should be retried.
pub type KindPredicate = Arc<dyn Fn(ErrorKind, usize) -> bool + Send + Sync>;

/// Errors raised while building a [`RetryConfig`].
#[derive(Debug, Error)]
pub enum RetryConfigError {
    #[error("max_delay ({max_delay:?}) must be >= base_delay ({base_delay:?})")]
    MaxDelayTooSmall {
        max_delay: Duration,
        base_delay: Duration,
    },
    #[error("jitter_factor must be in [0, 1], got {0}")]
    JitterFactorOutOfRange(f64),
    #[error("multiplier must be positive, got {0}")]
    NonPositiveMultiplier(f64),
}

/// Retry policy configuration: when to retry and how long to wait.
pub struct RetryConfig {
    pub(crate) max_attempts: usize,
    pub(crate) base_delay: Duration,
    pub(crate) max_delay: Duration,
    pub(crate) backoff_strategy: BackoffStrategy,
    pub(crate) multiplier: f64,
    pub(crate) jitter_factor: f64,
    pub(crate) retry_predicate: Option<RetryPredicate>,
    pub(crate) kind_predicate: Option<KindPredicate>,
    pub(crate) random_source: Arc<dyn RandomSource>,
    pub(crate) event_listeners: EventListeners<RetryEvent>,
    pub(crate) name: String,
}

impl RetryConfig {
    /// Starts building a [`RetryConfig`] with the defaults used by [`RetryConfig::simple`].
    pub fn builder() -> RetryConfigBuilder {
        RetryConfigBuilder::new()
    }

    /// No retries: every failure is terminal after the first attempt.
    pub fn none() -> Self {
        RetryConfig::builder()
            .max_attempts(0)
            .name("none")
            .build()
            .expect("none() preset is always valid")
    }

    /// Three attempts, fixed 100ms delay. A reasonable default for cheap, fast operations.
    pub fn simple() -> Self {
        RetryConfig::builder()
            .max_attempts(3)
            .base_delay(Duration::from_millis(100))
            .backoff_strategy(BackoffStrategy::Fixed)
            .name("simple")
            .build()
            .expect("simple() preset is always valid")
    }

    /// Five attempts, exponential backoff with jitter. For flaky network calls.
    pub fn network() -> Self {
        RetryConfig::builder()
            .max_attempts(5)
            .base_delay(Duration::from_millis(200))
            .max_delay(Duration::from_secs(10))
            .backoff_strategy(BackoffStrategy::ExponentialWithJitter)
            .multiplier(2.0)
            .jitter_factor(0.3)
            .name("network")
            .build()
            .expect("network() preset is always valid")
    }

    /// Eight attempts, aggressive exponential backoff with jitter and a longer cap.
    /// For operations where giving up is expensive.
    pub fn critical() -> Self {
        RetryConfig::builder()
            .max_attempts(8)
            .base_delay(Duration::from_millis(250))
            .max_delay(Duration::from_secs(30))
            .backoff_strategy(BackoffStrategy::ExponentialWithJitter)
            .multiplier(2.0)
            .jitter_factor(0.5)
            .name("critical")
            .build()
            .expect("critical() preset is always valid")
    }

    /// Four attempts, linear backoff. For database contention/transient lock errors.
    pub fn database() -> Self {
        RetryConfig::builder()
            .max_attempts(4)
            .base_delay(Duration::from_millis(50))
            .max_delay(Duration::from_secs(2))
            .backoff_strategy(BackoffStrategy::Linear)
            .name("database")
            .build()
            .expect("database() preset is always valid")
    }
}

/// Builder for [`RetryConfig`].
pub struct RetryConfigBuilder {
    max_attempts: usize,
    base_delay: Duration,
    max_delay: Duration,
    backoff_strategy: BackoffStrategy,
    multiplier: f64,
    jitter_factor: f64,
    retry_predicate: Option<RetryPredicate>,
    kind_predicate: Option<KindPredicate>,
    random_source: Arc<dyn RandomSource>,
    event_listeners: EventListeners<RetryEvent>,
    name: String,
}

impl Default for RetryConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RetryConfigBuilder {
    /// Creates a new builder with defaults: 3 attempts, 100ms base delay,
    /// exponential backoff, multiplier 2.0, no jitter.
    pub fn new() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(30),
            backoff_strategy: BackoffStrategy::Exponential,
            multiplier: 2.0,
            jitter_factor: 0.0,
            retry_predicate: None,
            kind_predicate: None,
            random_source: Arc::new(DefaultRandomSource),
            event_listeners: EventListeners::new(),
            name: "<unnamed>".to_string(),
        }
    }

    /// Sets the maximum number of retry attempts (0 disables retrying entirely).
    pub fn max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Sets the base delay used by every backoff strategy.
    pub fn base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Sets the cap every computed delay is clamped to.
    pub fn max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Sets the backoff strategy.
    pub fn backoff_strategy(mut self, strategy: BackoffStrategy) -> Self {
        self.backoff_strategy = strategy;
        self
    }

    /// Sets the growth multiplier used by the exponential strategies.
    pub fn multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Sets the jitter fraction used by `ExponentialWithJitter`.
    pub fn jitter_factor(mut self, jitter_factor: f64) -> Self {
        self.jitter_factor = jitter_factor;
        self
    }

    /// Sets an additional predicate over the raw failure; both this and
    /// `should_retry_kind` must allow the retry.
    pub fn should_retry<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&TaskFailure, usize) -> bool + Send + Sync + 'static,
    {
        self.retry_predicate = Some(Arc::new(predicate));
        self
    }

    /// Sets a predicate over the classified error kind.
    pub fn should_retry_kind<F>(mut self, predicate: F) -> Self
    where
        F: Fn(ErrorKind, usize) -> bool + Send + Sync + 'static,
    {
        self.kind_predicate = Some(Arc::new(predicate));
        self
    }

    /// Injects the randomness source used to draw jitter. Defaults to
    /// [`DefaultRandomSource`].
    pub fn random_source(mut self, source: Arc<dyn RandomSource>) -> Self {
        self.random_source = source;
        self
    }

    /// Registers a listener for [`RetryEvent`]s.
    pub fn on_event<L>(mut self, listener: L) -> Self
    where
        L: taskforge_core::EventListener<RetryEvent> + 'static,
    {
        self.event_listeners.add(listener);
        self
    }

    /// Names this policy, used in events and log lines.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Validates and constructs the [`RetryConfig`].
    pub fn build(self) -> Result<RetryConfig, RetryConfigError> {
        if self.max_delay < self.base_delay {
            return Err(RetryConfigError::MaxDelayTooSmall {
                max_delay: self.max_delay,
                base_delay: self.base_delay,
            });
        }
        if !(0.0..=1.0).contains(&self.jitter_factor) {
            return Err(RetryConfigError::JitterFactorOutOfRange(self.jitter_factor));
        }
        if self.multiplier <= 0.0 {
            return Err(RetryConfigError::NonPositiveMultiplier(self.multiplier));
        }

        Ok(RetryConfig {
            max_attempts: self.max_attempts,
            base_delay: self.base_delay,
            max_delay: self.max_delay,
            backoff_strategy: self.backoff_strategy,
            multiplier: self.multiplier,
            jitter_factor: self.jitter_factor,
            retry_predicate: self.retry_predicate,
            kind_predicate: self.kind_predicate,
            random_source: self.random_source,
            event_listeners: self.event_listeners,
            name: self.name,
        })
    }
}
