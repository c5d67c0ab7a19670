use std::time::Instant;
use taskforge_core::ResilienceEvent;

use crate::Phase;

/// Events emitted by a [`crate::CircuitBreaker`].
#[derive(Debug, Clone)]
pub enum CircuitBreakerEvent {
    /// The breaker moved from one phase to another.
    StateTransition {
        pattern_name: String,
        timestamp: Instant,
        from: Phase,
        to: Phase,
    },
    /// A call was permitted to dispatch.
    CallPermitted {
        pattern_name: String,
        timestamp: Instant,
    },
    /// A call was rejected because the breaker is open (or half-open and out of budget).
    CallRejected {
        pattern_name: String,
        timestamp: Instant,
    },
    /// A dispatched call succeeded.
    Success {
        pattern_name: String,
        timestamp: Instant,
    },
    /// A dispatched call failed.
    Failure {
        pattern_name: String,
        timestamp: Instant,
    },
}

impl ResilienceEvent for CircuitBreakerEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CircuitBreakerEvent::StateTransition { .. } => "StateTransition",
            CircuitBreakerEvent::CallPermitted { .. } => "CallPermitted",
            CircuitBreakerEvent::CallRejected { .. } => "CallRejected",
            CircuitBreakerEvent::Success { .. } => "Success",
            CircuitBreakerEvent::Failure { .. } => "Failure",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            CircuitBreakerEvent::StateTransition { timestamp, .. }
            | CircuitBreakerEvent::CallPermitted { timestamp, .. }
            | CircuitBreakerEvent::CallRejected { timestamp, .. }
            | CircuitBreakerEvent::Success { timestamp, .. }
            | CircuitBreakerEvent::Failure { timestamp, .. } => *timestamp,
        }
    }

    fn pattern_name(&self) -> &str {
        match self {
            CircuitBreakerEvent::StateTransition { pattern_name, .. }
            | CircuitBreakerEvent::CallPermitted { pattern_name, .. }
            | CircuitBreakerEvent::CallRejected { pattern_name, .. }
            | CircuitBreakerEvent::Success { pattern_name, .. }
            | CircuitBreakerEvent::Failure { pattern_name, .. } => pattern_name,
        }
    }
}
