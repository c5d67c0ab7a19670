use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// The breaker's current phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Calls are permitted; failures accumulate in the rolling window.
    Closed,
    /// Calls are rejected until `open_duration` elapses.
    Open,
    /// A limited number of probe calls are permitted.
    HalfOpen,
}

/// A point-in-time snapshot of breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitBreakerStats {
    pub phase: Phase,
    pub failure_count: usize,
    pub time_until_retry: Option<Duration>,
}

/// The mutable state protected by the breaker's single internal lock.
pub(crate) struct CircuitState {
    phase: Phase,
    failure_window: VecDeque<Instant>,
    opened_at: Option<Instant>,
    half_open_attempts_used: u32,
    half_open_successes: u32,
}

impl CircuitState {
    pub(crate) fn new() -> Self {
        Self {
            phase: Phase::Closed,
            failure_window: VecDeque::new(),
            opened_at: None,
            half_open_attempts_used: 0,
            half_open_successes: 0,
        }
    }

    fn evict_stale(&mut self, now: Instant, time_window: Duration) {
        while let Some(&front) = self.failure_window.front() {
            if now.duration_since(front) > time_window {
                self.failure_window.pop_front();
            } else {
                break;
            }
        }
    }

    /// Returns `true` if the caller should NOT dispatch, transitioning
    /// Open -> HalfOpen as a side effect when `open_duration` has elapsed.
    pub(crate) fn should_reject(
        &mut self,
        now: Instant,
        time_window: Duration,
        open_duration: Duration,
        half_open_limit: u32,
    ) -> (bool, Option<(Phase, Phase)>) {
        self.evict_stale(now, time_window);

        match self.phase {
            Phase::Closed => (false, None),
            Phase::Open => {
                let opened_at = self.opened_at.expect("open phase always has opened_at");
                if now.duration_since(opened_at) >= open_duration {
                    let from = self.phase;
                    self.phase = Phase::HalfOpen;
                    self.half_open_attempts_used = 0;
                    self.half_open_successes = 0;
                    (false, Some((from, Phase::HalfOpen)))
                } else {
                    (true, None)
                }
            }
            Phase::HalfOpen => {
                if self.half_open_attempts_used >= half_open_limit {
                    (true, None)
                } else {
                    self.half_open_attempts_used += 1;
                    (false, None)
                }
            }
        }
    }

    /// Records a success, returning a transition if one occurred.
    pub(crate) fn record_success(
        &mut self,
        success_threshold: u32,
    ) -> Option<(Phase, Phase)> {
        match self.phase {
            Phase::Closed => None,
            Phase::Open => None,
            Phase::HalfOpen => {
                self.half_open_successes += 1;
                if self.half_open_successes >= success_threshold {
                    let from = self.phase;
                    self.phase = Phase::Closed;
                    self.failure_window.clear();
                    self.opened_at = None;
                    Some((from, Phase::Closed))
                } else {
                    None
                }
            }
        }
    }

    /// Records a failure, returning a transition if one occurred.
    pub(crate) fn record_failure(
        &mut self,
        now: Instant,
        time_window: Duration,
        failure_threshold: u32,
    ) -> Option<(Phase, Phase)> {
        match self.phase {
            Phase::Closed => {
                self.evict_stale(now, time_window);
                self.failure_window.push_back(now);
                if self.failure_window.len() as u32 >= failure_threshold {
                    self.phase = Phase::Open;
                    self.opened_at = Some(now);
                    Some((Phase::Closed, Phase::Open))
                } else {
                    None
                }
            }
            Phase::Open => None,
            Phase::HalfOpen => {
                self.phase = Phase::Open;
                self.opened_at = Some(now);
                Some((Phase::HalfOpen, Phase::Open))
            }
        }
    }

    pub(crate) fn force_open(&mut self, now: Instant) -> Option<(Phase, Phase)> {
        let from = self.phase;
        if from == Phase::Open {
            return None;
        }
        self.phase = Phase::Open;
        self.opened_at = Some(now);
        Some((from, Phase::Open))
    }

    pub(crate) fn force_closed(&mut self) -> Option<(Phase, Phase)> {
        let from = self.phase;
        if from == Phase::Closed {
            return None;
        }
        self.phase = Phase::Closed;
        self.failure_window.clear();
        self.opened_at = None;
        Some((from, Phase::Closed))
    }

    pub(crate) fn reset(&mut self) -> Option<(Phase, Phase)> {
        self.force_closed()
    }

    pub(crate) fn stats(&self, now: Instant, open_duration: Duration) -> CircuitBreakerStats {
        let time_until_retry = match (self.phase, self.opened_at) {
            (Phase::Open, Some(opened_at)) => {
                let elapsed = now.duration_since(opened_at);
                Some(open_duration.saturating_sub(elapsed))
            }
            _ => None,
        };

        CircuitBreakerStats {
            phase: self.phase,
            failure_count: self.failure_window.len(),
            time_until_retry,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_secs(60);
    const OPEN: Duration = Duration::from_secs(30);

    #[test]
    fn opens_after_failure_threshold() {
        let mut state = CircuitState::new();
        let now = Instant::now();
        assert!(state.record_failure(now, WINDOW, 2).is_none());
        let transition = state.record_failure(now, WINDOW, 2);
        assert_eq!(transition, Some((Phase::Closed, Phase::Open)));
    }

    #[test]
    fn rejects_while_open_then_probes_after_elapsed() {
        let mut state = CircuitState::new();
        let now = Instant::now();
        state.record_failure(now, WINDOW, 1);
        assert_eq!(state.phase, Phase::Open);

        let (reject, transition) = state.should_reject(now, WINDOW, OPEN, 3);
        assert!(reject);
        assert!(transition.is_none());

        let later = now + OPEN;
        let (reject, transition) = state.should_reject(later, WINDOW, OPEN, 3);
        assert!(!reject);
        assert_eq!(transition, Some((Phase::Open, Phase::HalfOpen)));
    }

    #[test]
    fn half_open_closes_after_success_threshold() {
        let mut state = CircuitState::new();
        let now = Instant::now();
        state.record_failure(now, WINDOW, 1);
        state.should_reject(now + OPEN, WINDOW, OPEN, 3);
        assert_eq!(state.phase, Phase::HalfOpen);

        assert!(state.record_success(2).is_none());
        let transition = state.record_success(2);
        assert_eq!(transition, Some((Phase::HalfOpen, Phase::Closed)));
    }

    #[test]
    fn half_open_reopens_on_any_failure() {
        let mut state = CircuitState::new();
        let now = Instant::now();
        state.record_failure(now, WINDOW, 1);
        state.should_reject(now + OPEN, WINDOW, OPEN, 3);
        assert_eq!(state.phase, Phase::HalfOpen);

        let transition = state.record_failure(now + OPEN, WINDOW, 1);
        assert_eq!(transition, Some((Phase::HalfOpen, Phase::Open)));
    }

    #[test]
    fn half_open_rejects_once_probe_budget_exhausted() {
        let mut state = CircuitState::new();
        let now = Instant::now();
        state.record_failure(now, WINDOW, 1);
        state.should_reject(now + OPEN, WINDOW, OPEN, 1);
        assert_eq!(state.phase, Phase::HalfOpen);

        let (reject, _) = state.should_reject(now + OPEN, WINDOW, OPEN, 1);
        assert!(reject);
    }

    #[test]
    fn stale_failures_are_evicted_from_the_window() {
        let mut state = CircuitState::new();
        let now = Instant::now();
        state.record_failure(now, WINDOW, 3);
        let later = now + WINDOW + Duration::from_secs(1);
        let (reject, _) = state.should_reject(later, WINDOW, OPEN, 3);
        assert!(!reject);
        assert_eq!(state.stats(later, OPEN).failure_count, 0);
    }
}
