//! Circuit breaker state machine gating task dispatch.
//!
//! Closed allows calls and accumulates failures in a rolling window; once the
//! window holds `failure_threshold` failures the breaker opens and rejects
//! every call until `open_duration` elapses, at which point it half-opens and
//! admits a limited number of probes. Enough consecutive probe successes
//! close the breaker again; any probe failure reopens it.

pub mod circuit;
pub mod config;
pub mod events;

pub use circuit::{CircuitBreakerStats, Phase};
pub use config::{CircuitBreakerConfig, CircuitBreakerConfigBuilder, CircuitBreakerConfigError};
pub use events::CircuitBreakerEvent;

use circuit::CircuitState;
use std::sync::Mutex;
use std::time::Instant;

/// A circuit breaker. Cheap to clone via `Arc`; the executor holds one per
/// processor and shares it across every spawned worker.
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    state: Mutex<CircuitState>,
}

impl CircuitBreaker {
    /// Wraps a validated [`CircuitBreakerConfig`] as a usable breaker.
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            state: Mutex::new(CircuitState::new()),
        }
    }

    /// The breaker's name, for logs, events and stats.
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Returns `true` if the caller should NOT dispatch.
    pub fn should_reject(&self) -> bool {
        let now = self.config.clock.now();
        let mut state = self.state.lock().expect("circuit breaker lock poisoned");
        let (reject, transition) = state.should_reject(
            now,
            self.config.time_window,
            self.config.open_duration,
            self.config.half_open_limit,
        );
        drop(state);

        if let Some((from, to)) = transition {
            self.emit_transition(from, to);
        }

        self.emit(if reject {
            CircuitBreakerEvent::CallRejected {
                pattern_name: self.config.name.clone(),
                timestamp: Instant::now(),
            }
        } else {
            CircuitBreakerEvent::CallPermitted {
                pattern_name: self.config.name.clone(),
                timestamp: Instant::now(),
            }
        });

        reject
    }

    /// Records a successful dispatch.
    pub fn record_success(&self) {
        let mut state = self.state.lock().expect("circuit breaker lock poisoned");
        let transition = state.record_success(self.config.success_threshold);
        drop(state);

        if let Some((from, to)) = transition {
            self.emit_transition(from, to);
        }
        self.emit(CircuitBreakerEvent::Success {
            pattern_name: self.config.name.clone(),
            timestamp: Instant::now(),
        });
    }

    /// Records a failed dispatch.
    pub fn record_failure(&self) {
        let now = self.config.clock.now();
        let mut state = self.state.lock().expect("circuit breaker lock poisoned");
        let transition = state.record_failure(now, self.config.time_window, self.config.failure_threshold);
        drop(state);

        if let Some((from, to)) = transition {
            self.emit_transition(from, to);
        }
        self.emit(CircuitBreakerEvent::Failure {
            pattern_name: self.config.name.clone(),
            timestamp: Instant::now(),
        });
    }

    /// Forces the breaker open regardless of the current failure window.
    pub fn force_open(&self) {
        let now = self.config.clock.now();
        let mut state = self.state.lock().expect("circuit breaker lock poisoned");
        let transition = state.force_open(now);
        drop(state);
        if let Some((from, to)) = transition {
            self.emit_transition(from, to);
        }
    }

    /// Forces the breaker closed, clearing the failure window.
    pub fn force_closed(&self) {
        let mut state = self.state.lock().expect("circuit breaker lock poisoned");
        let transition = state.force_closed();
        drop(state);
        if let Some((from, to)) = transition {
            self.emit_transition(from, to);
        }
    }

    /// Resets the breaker to its initial Closed state.
    pub fn reset(&self) {
        let mut state = self.state.lock().expect("circuit breaker lock poisoned");
        let transition = state.reset();
        drop(state);
        if let Some((from, to)) = transition {
            self.emit_transition(from, to);
        }
    }

    /// A point-in-time snapshot of phase, failure count and time until retry.
    pub fn stats(&self) -> CircuitBreakerStats {
        let now = self.config.clock.now();
        let state = self.state.lock().expect("circuit breaker lock poisoned");
        state.stats(now, self.config.open_duration)
    }

    fn emit_transition(&self, from: Phase, to: Phase) {
        self.emit(CircuitBreakerEvent::StateTransition {
            pattern_name: self.config.name.clone(),
            timestamp: Instant::now(),
            from,
            to,
        });
    }

    fn emit(&self, event: CircuitBreakerEvent) {
        #[cfg(feature = "tracing")]
        log_event(&event);
        #[cfg(feature = "metrics")]
        record_event_metric(&event);

        self.config.event_listeners.emit(&event);
    }
}

#[cfg(feature = "tracing")]
fn log_event(event: &CircuitBreakerEvent) {
    use taskforge_core::ResilienceEvent;
    match event {
        CircuitBreakerEvent::StateTransition {
            pattern_name,
            from,
            to,
            ..
        } => tracing::info!(breaker = pattern_name, ?from, ?to, "circuit breaker transitioned"),
        CircuitBreakerEvent::CallRejected { pattern_name, .. } => {
            tracing::debug!(breaker = pattern_name, "call rejected")
        }
        _ => tracing::trace!(
            breaker = event.pattern_name(),
            event = event.event_type(),
            "circuit breaker event"
        ),
    }
}

#[cfg(feature = "metrics")]
fn record_event_metric(event: &CircuitBreakerEvent) {
    let name_label = event.pattern_name_owned();
    match event {
        CircuitBreakerEvent::StateTransition { to, .. } => {
            metrics::counter!("taskforge_circuitbreaker_transitions_total", "breaker" => name_label, "to" => format!("{to:?}"))
                .increment(1)
        }
        CircuitBreakerEvent::CallRejected { .. } => {
            metrics::counter!("taskforge_circuitbreaker_rejected_total", "breaker" => name_label)
                .increment(1)
        }
        CircuitBreakerEvent::CallPermitted { .. }
        | CircuitBreakerEvent::Success { .. }
        | CircuitBreakerEvent::Failure { .. } => {}
    }
}

#[cfg(feature = "metrics")]
impl CircuitBreakerEvent {
    fn pattern_name_owned(&self) -> String {
        use taskforge_core::ResilienceEvent;
        self.pattern_name().to_string()
    }
}
