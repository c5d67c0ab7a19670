use crate::events::CircuitBreakerEvent;
use std::sync::Arc;
use std::time::Duration;
use taskforge_core::{Clock, EventListeners, SystemClock};
use thiserror::Error;

/// Errors raised while building a [`CircuitBreakerConfig`].
#[derive(Debug, Error)]
pub enum CircuitBreakerConfigError {
    #[error("failure_threshold must be positive")]
    NonPositiveFailureThreshold,
    #[error("success_threshold must be positive")]
    NonPositiveSuccessThreshold,
    #[error("half_open_limit must be positive")]
    NonPositiveHalfOpenLimit,
    #[error("success_threshold ({success_threshold}) must be <= half_open_limit ({half_open_limit})")]
    SuccessThresholdExceedsHalfOpenLimit {
        success_threshold: u32,
        half_open_limit: u32,
    },
    #[error("time_window must be positive")]
    NonPositiveTimeWindow,
    #[error("open_duration must be positive")]
    NonPositiveOpenDuration,
}

/// Configuration for a [`crate::CircuitBreaker`].
pub struct CircuitBreakerConfig {
    pub(crate) failure_threshold: u32,
    pub(crate) success_threshold: u32,
    pub(crate) half_open_limit: u32,
    pub(crate) time_window: Duration,
    pub(crate) open_duration: Duration,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) event_listeners: EventListeners<CircuitBreakerEvent>,
    pub(crate) name: String,
}

impl CircuitBreakerConfig {
    /// Starts building a [`CircuitBreakerConfig`].
    pub fn builder() -> CircuitBreakerConfigBuilder {
        CircuitBreakerConfigBuilder::new()
    }
}

/// Builder for [`CircuitBreakerConfig`].
pub struct CircuitBreakerConfigBuilder {
    failure_threshold: u32,
    success_threshold: u32,
    half_open_limit: u32,
    time_window: Duration,
    open_duration: Duration,
    clock: Arc<dyn Clock>,
    event_listeners: EventListeners<CircuitBreakerEvent>,
    name: String,
}

impl Default for CircuitBreakerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CircuitBreakerConfigBuilder {
    /// Creates a new builder with defaults: 5 failures in a 60s window opens
    /// the breaker, 30s open duration, 3 half-open probes, 2 successes to close.
    pub fn new() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 2,
            half_open_limit: 3,
            time_window: Duration::from_secs(60),
            open_duration: Duration::from_secs(30),
            clock: Arc::new(SystemClock),
            event_listeners: EventListeners::new(),
            name: "<unnamed>".to_string(),
        }
    }

    /// Sets the number of failures within `time_window` that opens the breaker.
    pub fn failure_threshold(mut self, failure_threshold: u32) -> Self {
        self.failure_threshold = failure_threshold;
        self
    }

    /// Sets the number of consecutive half-open successes needed to close the breaker.
    pub fn success_threshold(mut self, success_threshold: u32) -> Self {
        self.success_threshold = success_threshold;
        self
    }

    /// Sets how many probe calls are permitted per half-open cycle.
    pub fn half_open_limit(mut self, half_open_limit: u32) -> Self {
        self.half_open_limit = half_open_limit;
        self
    }

    /// Sets the rolling window over which failures are counted.
    pub fn time_window(mut self, time_window: Duration) -> Self {
        self.time_window = time_window;
        self
    }

    /// Sets how long the breaker stays open before probing again.
    pub fn open_duration(mut self, open_duration: Duration) -> Self {
        self.open_duration = open_duration;
        self
    }

    /// Injects the clock used for the failure window and open-duration timers.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Registers a listener for [`CircuitBreakerEvent`]s.
    pub fn on_event<L>(mut self, listener: L) -> Self
    where
        L: taskforge_core::EventListener<CircuitBreakerEvent> + 'static,
    {
        self.event_listeners.add(listener);
        self
    }

    /// Names this breaker, used in events, stats and log lines.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Validates and constructs the [`CircuitBreakerConfig`].
    pub fn build(self) -> Result<CircuitBreakerConfig, CircuitBreakerConfigError> {
        if self.failure_threshold == 0 {
            return Err(CircuitBreakerConfigError::NonPositiveFailureThreshold);
        }
        if self.success_threshold == 0 {
            return Err(CircuitBreakerConfigError::NonPositiveSuccessThreshold);
        }
        if self.half_open_limit == 0 {
            return Err(CircuitBreakerConfigError::NonPositiveHalfOpenLimit);
        }
        if self.success_threshold > self.half_open_limit {
            return Err(
                CircuitBreakerConfigError::SuccessThresholdExceedsHalfOpenLimit {
                    success_threshold: self.success_threshold,
                    half_open_limit: self.half_open_limit,
                },
            );
        }
        if self.time_window.is_zero() {
            return Err(CircuitBreakerConfigError::NonPositiveTimeWindow);
        }
        if self.open_duration.is_zero() {
            return Err(CircuitBreakerConfigError::NonPositiveOpenDuration);
        }

        Ok(CircuitBreakerConfig {
            failure_threshold: self.failure_threshold,
            success_threshold: self.success_threshold,
            half_open_limit: self.half_open_limit,
            time_window: self.time_window,
            open_duration: self.open_duration,
            clock: self.clock,
            event_listeners: self.event_listeners,
            name: self.name,
        })
    }
}
