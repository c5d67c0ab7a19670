//! Core infrastructure for taskforge.
//!
//! This crate provides shared functionality used across all taskforge crates:
//! - Event system for observability
//! - Clock and randomness injection for deterministic tests
//! - The shared task failure / error kind taxonomy

pub mod clock;
pub mod events;
pub mod kinds;
pub mod random;

pub use clock::{Clock, SystemClock};
pub use events::{EventListener, EventListeners, FnListener, ResilienceEvent};
pub use kinds::{ErrorKind, TaskFailure};
pub use random::{DefaultRandomSource, FixedRandomSource, RandomSource};
