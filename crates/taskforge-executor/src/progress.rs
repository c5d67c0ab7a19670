//! Progress reporting for batch and dependency-ordered dispatch.

use std::sync::{Arc, Mutex};

/// A point-in-time view of a batch's completion state.
#[derive(Debug, Clone, Default)]
pub struct ProgressSnapshot {
    pub total: usize,
    pub completed: usize,
    pub successful: usize,
    pub failed: usize,
    pub in_flight: usize,
    pub current_name: Option<String>,
}

/// A sink notified after every task completion. Invoked with snapshots in
/// non-decreasing `completed` order, one at a time.
pub type ProgressSink = Arc<dyn Fn(&ProgressSnapshot) + Send + Sync>;

pub(crate) struct ProgressTracker {
    sink: Option<ProgressSink>,
    state: Mutex<ProgressSnapshot>,
}

impl ProgressTracker {
    pub(crate) fn new(total: usize, sink: Option<ProgressSink>) -> Self {
        Self {
            sink,
            state: Mutex::new(ProgressSnapshot {
                total,
                ..Default::default()
            }),
        }
    }

    pub(crate) fn task_started(&self, name: &str) {
        let mut state = self.state.lock().expect("progress lock poisoned");
        state.in_flight += 1;
        state.current_name = Some(name.to_string());
    }

    /// Mutates the shared snapshot and, while still holding the lock, hands
    /// it to the sink — this is what keeps snapshots ordered and guarantees
    /// at most one worker calls the sink at a time.
    pub(crate) fn task_finished(&self, name: &str, successful: bool) {
        let mut state = self.state.lock().expect("progress lock poisoned");
        state.in_flight = state.in_flight.saturating_sub(1);
        state.completed += 1;
        if successful {
            state.successful += 1;
        } else {
            state.failed += 1;
        }
        state.current_name = Some(name.to_string());

        if let Some(sink) = &self.sink {
            sink(&state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn snapshots_are_emitted_in_non_decreasing_completed_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);
        let tracker = ProgressTracker::new(
            3,
            Some(Arc::new(move |snapshot: &ProgressSnapshot| {
                seen_clone.lock().unwrap().push(snapshot.completed);
            })),
        );

        tracker.task_started("a");
        tracker.task_finished("a", true);
        tracker.task_started("b");
        tracker.task_finished("b", false);
        tracker.task_started("c");
        tracker.task_finished("c", true);

        let observed = seen.lock().unwrap().clone();
        assert_eq!(observed, vec![1, 2, 3]);
    }

    #[test]
    fn counts_successes_and_failures_independently() {
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = Arc::clone(&counter);
        let tracker = ProgressTracker::new(
            2,
            Some(Arc::new(move |snapshot: &ProgressSnapshot| {
                counter_clone.store(snapshot.failed, Ordering::SeqCst);
            })),
        );

        tracker.task_started("a");
        tracker.task_finished("a", false);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn works_without_a_sink() {
        let tracker = ProgressTracker::new(1, None);
        tracker.task_started("a");
        tracker.task_finished("a", true);
    }
}
