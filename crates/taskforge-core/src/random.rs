//! Randomness injection for jittered backoff. Kept separate from [`crate::clock`]
//! so a test can fix the clock while still observing real jitter, or vice versa.

use std::fmt;

/// A source of randomness in the unit interval.
///
/// Production code uses [`DefaultRandomSource`] (backed by `rand`'s thread-local
/// generator); tests substitute a fixed or scripted sequence to make jittered
/// backoff assertions deterministic.
pub trait RandomSource: Send + Sync {
    /// Returns a value in `[0.0, 1.0)`.
    fn next_f64(&self) -> f64;
}

impl fmt::Debug for dyn RandomSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("dyn RandomSource")
    }
}

/// The default [`RandomSource`], backed by `rand::rng()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultRandomSource;

impl RandomSource for DefaultRandomSource {
    fn next_f64(&self) -> f64 {
        use rand::Rng;
        rand::rng().random::<f64>()
    }
}

/// A fixed-value source for deterministic tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedRandomSource(pub f64);

impl RandomSource for FixedRandomSource {
    fn next_f64(&self) -> f64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_source_stays_in_unit_interval() {
        let source = DefaultRandomSource;
        for _ in 0..100 {
            let value = source.next_f64();
            assert!((0.0..1.0).contains(&value));
        }
    }

    #[test]
    fn fixed_source_is_fixed() {
        let source = FixedRandomSource(0.42);
        assert_eq!(source.next_f64(), 0.42);
        assert_eq!(source.next_f64(), 0.42);
    }
}
