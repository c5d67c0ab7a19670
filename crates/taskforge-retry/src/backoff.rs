//! Backoff strategies for delaying a retry attempt.

use std::time::Duration;
use taskforge_core::RandomSource;

/// How the delay before attempt `n` (n ≥ 2) grows with `n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackoffStrategy {
    /// Always `base_delay`.
    Fixed,
    /// `base_delay * n`.
    Linear,
    /// `base_delay * multiplier^(n-1)`.
    Exponential,
    /// `Exponential`, plus a random amount up to `jitter_factor * (exponential delay)`.
    ExponentialWithJitter,
}

/// Computes the delay before attempt `n`, given `n ≥ 2`. Attempt 1 always has
/// zero delay; callers should not call this for `n < 2`.
pub fn delay_for_attempt(
    strategy: BackoffStrategy,
    attempt: usize,
    base_delay: Duration,
    max_delay: Duration,
    multiplier: f64,
    jitter_factor: f64,
    random: &dyn RandomSource,
) -> Duration {
    debug_assert!(attempt >= 2);
    let n = (attempt - 1) as i32;

    let raw = match strategy {
        BackoffStrategy::Fixed => base_delay,
        BackoffStrategy::Linear => base_delay.saturating_mul(attempt as u32),
        BackoffStrategy::Exponential => scale(base_delay, multiplier.powi(n)),
        BackoffStrategy::ExponentialWithJitter => {
            let exp = scale(base_delay, multiplier.powi(n));
            let jitter_span = scale(exp, jitter_factor);
            let jitter = scale(jitter_span, random.next_f64());
            exp.saturating_add(jitter)
        }
    };

    raw.min(max_delay)
}

fn scale(duration: Duration, factor: f64) -> Duration {
    if factor <= 0.0 {
        return Duration::ZERO;
    }
    Duration::from_secs_f64(duration.as_secs_f64() * factor)
}
