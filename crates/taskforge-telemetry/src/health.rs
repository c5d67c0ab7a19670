use crate::summary::TelemetrySummary;
use std::sync::Arc;
use std::time::Duration;
use taskforge_circuitbreaker::Phase;

/// A custom health predicate evaluated against the current summary. Returns
/// `Err(reason)` when the predicate considers the system unhealthy.
pub type HealthPredicate = Arc<dyn Fn(&TelemetrySummary) -> Result<(), String> + Send + Sync>;

/// Options controlling [`crate::TelemetryStore::health_check`].
#[derive(Clone, Default)]
pub struct HealthCheckOptions {
    pub min_success_rate: Option<f64>,
    pub max_avg_execution_ms: Option<f64>,
    pub health_window: Option<Duration>,
    pub custom_predicates: Vec<HealthPredicate>,
}

impl HealthCheckOptions {
    /// Starts building [`HealthCheckOptions`].
    pub fn builder() -> HealthCheckOptionsBuilder {
        HealthCheckOptionsBuilder::default()
    }
}

/// Builder for [`HealthCheckOptions`].
#[derive(Default)]
pub struct HealthCheckOptionsBuilder {
    options: HealthCheckOptions,
}

impl HealthCheckOptionsBuilder {
    /// Requires the success rate (as a percentage) to be at least this value.
    pub fn min_success_rate(mut self, rate: f64) -> Self {
        self.options.min_success_rate = Some(rate);
        self
    }

    /// Requires the average execution time to be at most this many milliseconds.
    pub fn max_avg_execution_ms(mut self, ms: f64) -> Self {
        self.options.max_avg_execution_ms = Some(ms);
        self
    }

    /// Restricts the health computation to records within this window of now.
    pub fn health_window(mut self, window: Duration) -> Self {
        self.options.health_window = Some(window);
        self
    }

    /// Adds a custom predicate over the computed summary.
    pub fn custom_predicate<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&TelemetrySummary) -> Result<(), String> + Send + Sync + 'static,
    {
        self.options.custom_predicates.push(Arc::new(predicate));
        self
    }

    /// Builds the options. No validation is needed: every field is optional.
    pub fn build(self) -> HealthCheckOptions {
        self.options
    }
}

/// The result of a health check.
#[derive(Debug, Clone)]
pub struct HealthStatus {
    pub healthy: bool,
    pub success_rate: f64,
    pub avg_execution_ms: f64,
    pub reasons: Vec<String>,
}

/// Evaluates `options` against `summary` and, if a breaker is configured,
/// its current `phase`, collecting every failing reason.
pub fn evaluate(
    summary: &TelemetrySummary,
    options: &HealthCheckOptions,
    breaker_phase: Option<Phase>,
) -> HealthStatus {
    let mut reasons = Vec::new();

    if let Some(min) = options.min_success_rate {
        if summary.success_rate < min {
            reasons.push(format!(
                "success_rate {:.2}% below minimum {:.2}%",
                summary.success_rate, min
            ));
        }
    }

    if let Some(max) = options.max_avg_execution_ms {
        if summary.avg_elapsed_ms > max {
            reasons.push(format!(
                "avg_execution_ms {:.2} exceeds maximum {:.2}",
                summary.avg_elapsed_ms, max
            ));
        }
    }

    if let Some(Phase::Open) = breaker_phase {
        reasons.push("circuit breaker is open".to_string());
    }

    for predicate in &options.custom_predicates {
        if let Err(reason) = predicate(summary) {
            reasons.push(reason);
        }
    }

    HealthStatus {
        healthy: reasons.is_empty(),
        success_rate: summary.success_rate,
        avg_execution_ms: summary.avg_elapsed_ms,
        reasons,
    }
}
