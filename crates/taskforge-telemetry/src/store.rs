use crate::exporter::TelemetryExporter;
use crate::health::{evaluate, HealthCheckOptions, HealthStatus};
use crate::record::TelemetryRecord;
use crate::summary::TelemetrySummary;
use std::sync::{Arc, Mutex};
use taskforge_circuitbreaker::Phase;
use tokio_util::sync::CancellationToken;

/// An append-only, thread-safe log of [`TelemetryRecord`]s.
///
/// Readers call [`TelemetryStore::snapshot`] to get a stable, immutable view;
/// appends invalidate the cached snapshot so the next read rebuilds it.
/// Summaries and health checks are computed lazily over the current snapshot.
pub struct TelemetryStore {
    inner: Mutex<Inner>,
    detailed: bool,
}

struct Inner {
    records: Vec<TelemetryRecord>,
    cached_snapshot: Option<Arc<[TelemetryRecord]>>,
}

impl TelemetryStore {
    /// Creates an empty store. `detailed` enables percentile computation in
    /// [`TelemetryStore::summary`].
    pub fn new(detailed: bool) -> Self {
        Self {
            inner: Mutex::new(Inner {
                records: Vec::new(),
                cached_snapshot: None,
            }),
            detailed,
        }
    }

    /// Appends a record, invalidating the cached snapshot.
    pub fn append(&self, record: TelemetryRecord) {
        let mut inner = self.inner.lock().expect("telemetry store lock poisoned");
        inner.records.push(record);
        inner.cached_snapshot = None;

        #[cfg(feature = "metrics")]
        metrics::counter!("taskforge_telemetry_records_total").increment(1);
        #[cfg(feature = "tracing")]
        tracing::trace!("telemetry record appended");
    }

    /// Returns a stable, immutable view of every record appended so far.
    pub fn snapshot(&self) -> Arc<[TelemetryRecord]> {
        let mut inner = self.inner.lock().expect("telemetry store lock poisoned");
        if let Some(cached) = &inner.cached_snapshot {
            return Arc::clone(cached);
        }
        let snapshot: Arc<[TelemetryRecord]> = inner.records.clone().into();
        inner.cached_snapshot = Some(Arc::clone(&snapshot));
        snapshot
    }

    /// Computes the summary over the current snapshot. Pure: calling this
    /// twice without an intervening append returns equal summaries.
    pub fn summary(&self) -> TelemetrySummary {
        TelemetrySummary::compute(&self.snapshot(), self.detailed)
    }

    /// Evaluates health against the current summary and, if supplied, the
    /// breaker's current phase. Does not mutate the store.
    pub fn health_check(
        &self,
        options: &HealthCheckOptions,
        breaker_phase: Option<Phase>,
    ) -> HealthStatus {
        let snapshot = self.snapshot();
        let filtered;
        let records: &[TelemetryRecord] = if let Some(window) = options.health_window {
            let now = std::time::SystemTime::now();
            filtered = snapshot
                .iter()
                .filter(|r| {
                    now.duration_since(r.timestamp)
                        .map(|age| age <= window)
                        .unwrap_or(true)
                })
                .cloned()
                .collect::<Vec<_>>();
            &filtered
        } else {
            &snapshot
        };
        let summary = TelemetrySummary::compute(records, self.detailed);
        evaluate(&summary, options, breaker_phase)
    }

    /// Exports the current snapshot via `exporter`. Does not mutate the store.
    pub async fn export(&self, exporter: &dyn TelemetryExporter, cancel: &CancellationToken) -> bool {
        let snapshot = self.snapshot();
        exporter.export(&snapshot, cancel).await
    }

    /// The number of records appended so far.
    pub fn len(&self) -> usize {
        self.inner.lock().expect("telemetry store lock poisoned").records.len()
    }

    /// Returns true if no records have been appended.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::SystemTime;

    #[test]
    fn summary_is_pure_over_a_stable_snapshot() {
        let store = TelemetryStore::new(false);
        store.append(TelemetryRecord::success("a", 10, SystemTime::now()));
        store.append(TelemetryRecord::success("b", 20, SystemTime::now()));

        assert_eq!(store.summary(), store.summary());
    }

    #[test]
    fn append_invalidates_cached_snapshot() {
        let store = TelemetryStore::new(false);
        store.append(TelemetryRecord::success("a", 10, SystemTime::now()));
        let first = store.snapshot();
        store.append(TelemetryRecord::success("b", 20, SystemTime::now()));
        let second = store.snapshot();

        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 2);
    }

    #[tokio::test]
    async fn exporting_does_not_mutate_the_store() {
        let store = TelemetryStore::new(false);
        store.append(TelemetryRecord::success("a", 10, SystemTime::now()));

        let exporter = crate::exporter::MemoryExporter::new();
        let ok = store.export(&exporter, &CancellationToken::new()).await;

        assert!(ok);
        assert_eq!(store.len(), 1);
        assert_eq!(exporter.exported().len(), 1);
    }
}
