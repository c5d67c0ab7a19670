use crate::record::TelemetryRecord;

/// Aggregate statistics computed over a telemetry snapshot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TelemetrySummary {
    pub total: usize,
    pub successes: usize,
    pub failures: usize,
    pub success_rate: f64,
    pub sum_elapsed_ms: u64,
    pub avg_elapsed_ms: f64,
    pub min_elapsed_ms: u64,
    pub max_elapsed_ms: u64,
    pub p50_elapsed_ms: Option<u64>,
    pub p95_elapsed_ms: Option<u64>,
    pub p99_elapsed_ms: Option<u64>,
}

impl TelemetrySummary {
    /// Computes a summary over `records`. Percentiles are only populated when
    /// `detailed` is true.
    pub fn compute(records: &[TelemetryRecord], detailed: bool) -> Self {
        let total = records.len();
        if total == 0 {
            return Self {
                total: 0,
                successes: 0,
                failures: 0,
                success_rate: 0.0,
                sum_elapsed_ms: 0,
                avg_elapsed_ms: 0.0,
                min_elapsed_ms: 0,
                max_elapsed_ms: 0,
                p50_elapsed_ms: None,
                p95_elapsed_ms: None,
                p99_elapsed_ms: None,
            };
        }

        let successes = records.iter().filter(|r| r.successful).count();
        let failures = total - successes;
        let sum_elapsed_ms: u64 = records.iter().map(|r| r.elapsed_ms).sum();
        let min_elapsed_ms = records.iter().map(|r| r.elapsed_ms).min().unwrap_or(0);
        let max_elapsed_ms = records.iter().map(|r| r.elapsed_ms).max().unwrap_or(0);

        let (p50, p95, p99) = if detailed {
            let mut durations: Vec<u64> = records.iter().map(|r| r.elapsed_ms).collect();
            durations.sort_unstable();
            (
                Some(percentile(&durations, 0.50)),
                Some(percentile(&durations, 0.95)),
                Some(percentile(&durations, 0.99)),
            )
        } else {
            (None, None, None)
        };

        Self {
            total,
            successes,
            failures,
            success_rate: successes as f64 / total as f64 * 100.0,
            sum_elapsed_ms,
            avg_elapsed_ms: sum_elapsed_ms as f64 / total as f64,
            min_elapsed_ms,
            max_elapsed_ms,
            p50_elapsed_ms: p50,
            p95_elapsed_ms: p95,
            p99_elapsed_ms: p99,
        }
    }
}

/// Nearest-rank percentile over a pre-sorted slice.
fn percentile(sorted: &[u64], fraction: f64) -> u64 {
    if sorted.is_empty() {
        return 0;
    }
    let rank = ((sorted.len() as f64) * fraction).ceil() as usize;
    let index = rank.saturating_sub(1).min(sorted.len() - 1);
    sorted[index]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::SystemTime;

    fn record(elapsed_ms: u64, successful: bool) -> TelemetryRecord {
        if successful {
            TelemetryRecord::success("t", elapsed_ms, SystemTime::now())
        } else {
            TelemetryRecord::failure(
                "t",
                elapsed_ms,
                taskforge_core::ErrorKind::Unknown,
                "boom",
                SystemTime::now(),
            )
        }
    }

    #[test]
    fn empty_snapshot_has_zeroed_summary() {
        let summary = TelemetrySummary::compute(&[], true);
        assert_eq!(summary.total, 0);
        assert_eq!(summary.success_rate, 0.0);
    }

    #[test]
    fn computes_basic_aggregates() {
        let records = vec![record(100, true), record(200, true), record(300, false)];
        let summary = TelemetrySummary::compute(&records, false);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.successes, 2);
        assert_eq!(summary.failures, 1);
        assert_eq!(summary.sum_elapsed_ms, 600);
        assert_eq!(summary.min_elapsed_ms, 100);
        assert_eq!(summary.max_elapsed_ms, 300);
        assert!((summary.success_rate - 66.666).abs() < 0.01);
        assert!(summary.p50_elapsed_ms.is_none());
    }

    #[test]
    fn detailed_mode_computes_percentiles() {
        let records: Vec<_> = (1..=100).map(|ms| record(ms, true)).collect();
        let summary = TelemetrySummary::compute(&records, true);
        assert_eq!(summary.p50_elapsed_ms, Some(50));
        assert_eq!(summary.p95_elapsed_ms, Some(95));
        assert_eq!(summary.p99_elapsed_ms, Some(99));
    }
}
