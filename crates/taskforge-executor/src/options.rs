//! Immutable, validated configuration for a [`crate::TaskProcessor`] (C11).

use std::sync::Arc;
use std::time::Duration;
use taskforge_circuitbreaker::CircuitBreakerConfig;
use taskforge_classifier::{DefaultClassifier, FailureClassifier};
use taskforge_core::{Clock, SystemClock};
use taskforge_retry::RetryConfig;
use taskforge_telemetry::{HealthCheckOptions, TelemetryExporter};

use crate::progress::ProgressSink;

/// How dispatch order is chosen among tasks whose dependency constraints tie
/// (or that declare no dependencies at all).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulingStrategy {
    /// Dispatch in submission order.
    Fifo,
    /// Dispatch higher-priority tasks first.
    Priority,
    /// Respect the declared dependency graph (see `run_dependency_ordered`).
    DependencyTopological,
}

/// Validated options a [`crate::TaskProcessor`] is built from. Consumed once
/// at construction; later mutation of the original builder has no effect on
/// a processor already built from it.
pub struct ExecutorOptions {
    pub(crate) max_concurrency: usize,
    pub(crate) default_timeout: Duration,
    pub(crate) continue_on_failure: bool,
    pub(crate) enable_detailed_telemetry: bool,
    pub(crate) enable_progress_reporting: bool,
    pub(crate) scheduling_strategy: SchedulingStrategy,
    pub(crate) retry_config: RetryConfig,
    pub(crate) circuit_breaker_config: CircuitBreakerConfig,
    pub(crate) health_check_options: HealthCheckOptions,
    pub(crate) exporters: Vec<Arc<dyn TelemetryExporter>>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) classifier: Arc<dyn FailureClassifier>,
    pub(crate) progress_sink: Option<ProgressSink>,
}

impl ExecutorOptions {
    /// Starts building [`ExecutorOptions`].
    pub fn builder() -> ExecutorOptionsBuilder {
        ExecutorOptionsBuilder::default()
    }
}

fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        * 2
}

/// Builder for [`ExecutorOptions`].
pub struct ExecutorOptionsBuilder {
    max_concurrency: usize,
    default_timeout: Duration,
    continue_on_failure: bool,
    enable_detailed_telemetry: bool,
    enable_progress_reporting: bool,
    scheduling_strategy: SchedulingStrategy,
    retry_config: RetryConfig,
    circuit_breaker_config: CircuitBreakerConfig,
    health_check_options: HealthCheckOptions,
    exporters: Vec<Arc<dyn TelemetryExporter>>,
    clock: Arc<dyn Clock>,
    classifier: Arc<dyn FailureClassifier>,
    progress_sink: Option<ProgressSink>,
}

impl Default for ExecutorOptionsBuilder {
    fn default() -> Self {
        Self {
            max_concurrency: default_concurrency(),
            default_timeout: Duration::from_secs(30),
            continue_on_failure: true,
            enable_detailed_telemetry: false,
            enable_progress_reporting: false,
            scheduling_strategy: SchedulingStrategy::Fifo,
            retry_config: RetryConfig::none(),
            circuit_breaker_config: CircuitBreakerConfig::builder()
                .build()
                .expect("default circuit breaker config is valid"),
            health_check_options: HealthCheckOptions::builder().build(),
            exporters: Vec::new(),
            clock: Arc::new(SystemClock),
            classifier: Arc::new(DefaultClassifier),
            progress_sink: None,
        }
    }
}

impl ExecutorOptionsBuilder {
    /// Sets the bounded-concurrency gate size. Defaults to `2 × available_parallelism`.
    pub fn max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency;
        self
    }

    /// Sets the timeout applied to a task unless it declares its own.
    pub fn default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// When `false`, the first failed task in a batch cancels the rest. Defaults to `true`.
    pub fn continue_on_failure(mut self, continue_on_failure: bool) -> Self {
        self.continue_on_failure = continue_on_failure;
        self
    }

    /// Enables percentile computation in telemetry summaries.
    pub fn enable_detailed_telemetry(mut self, enabled: bool) -> Self {
        self.enable_detailed_telemetry = enabled;
        self
    }

    /// Enables invoking the registered progress sink after every completion.
    pub fn enable_progress_reporting(mut self, enabled: bool) -> Self {
        self.enable_progress_reporting = enabled;
        self
    }

    /// Sets the scheduling strategy used for ties among ready tasks.
    pub fn scheduling_strategy(mut self, strategy: SchedulingStrategy) -> Self {
        self.scheduling_strategy = strategy;
        self
    }

    /// Sets the retry policy configuration.
    pub fn retry_config(mut self, config: RetryConfig) -> Self {
        self.retry_config = config;
        self
    }

    /// Sets the circuit breaker configuration.
    pub fn circuit_breaker_config(mut self, config: CircuitBreakerConfig) -> Self {
        self.circuit_breaker_config = config;
        self
    }

    /// Sets the health-check thresholds.
    pub fn health_check_options(mut self, options: HealthCheckOptions) -> Self {
        self.health_check_options = options;
        self
    }

    /// Registers a telemetry exporter, invoked on `export_telemetry()`.
    pub fn exporter(mut self, exporter: Arc<dyn TelemetryExporter>) -> Self {
        self.exporters.push(exporter);
        self
    }

    /// Injects the clock driving breaker windows, retry delays and telemetry timestamps.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Injects the failure classifier.
    pub fn classifier(mut self, classifier: Arc<dyn FailureClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    /// Registers the progress sink invoked after every task completion
    /// (only takes effect when `enable_progress_reporting` is set).
    pub fn progress_sink(mut self, sink: ProgressSink) -> Self {
        self.progress_sink = Some(sink);
        self
    }

    /// Builds the options. Concurrency and timeout validation happens here
    /// rather than at processor construction, so a misconfigured builder
    /// fails close to the call site that built it.
    pub fn build(self) -> Result<ExecutorOptions, crate::error::ExecutorError> {
        if self.max_concurrency == 0 {
            return Err(crate::error::ExecutorError::NonPositiveConcurrency);
        }
        if self.default_timeout.is_zero() {
            return Err(crate::error::ExecutorError::NonPositiveTimeout);
        }

        Ok(ExecutorOptions {
            max_concurrency: self.max_concurrency,
            default_timeout: self.default_timeout,
            continue_on_failure: self.continue_on_failure,
            enable_detailed_telemetry: self.enable_detailed_telemetry,
            enable_progress_reporting: self.enable_progress_reporting,
            scheduling_strategy: self.scheduling_strategy,
            retry_config: self.retry_config,
            circuit_breaker_config: self.circuit_breaker_config,
            health_check_options: self.health_check_options,
            exporters: self.exporters,
            clock: self.clock,
            classifier: self.classifier,
            progress_sink: self.progress_sink,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_build_successfully() {
        let options = ExecutorOptions::builder().build().unwrap();
        assert!(options.max_concurrency > 0);
    }

    #[test]
    fn rejects_zero_concurrency() {
        let err = ExecutorOptions::builder()
            .max_concurrency(0)
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            crate::error::ExecutorError::NonPositiveConcurrency
        ));
    }

    #[test]
    fn rejects_zero_timeout() {
        let err = ExecutorOptions::builder()
            .default_timeout(Duration::ZERO)
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            crate::error::ExecutorError::NonPositiveTimeout
        ));
    }
}
