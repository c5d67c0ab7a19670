//! taskforge-executor: the concurrent task batch executor built on top of
//! the retry, circuit-breaker, classifier and telemetry crates in this
//! workspace. [`TaskProcessor`] is the facade most callers construct; the
//! individual executors (single/batch/stream/dependency-ordered) are public
//! for callers who want to compose them directly.

pub mod batch;
pub mod dependency;
pub mod error;
pub mod options;
pub mod progress;
pub mod single;
pub mod stream;
pub mod task;

pub use batch::BatchExecutor;
pub use dependency::DependencyOrderedExecutor;
pub use error::ExecutorError;
pub use options::{ExecutorOptions, ExecutorOptionsBuilder, SchedulingStrategy};
pub use progress::{ProgressSink, ProgressSnapshot};
pub use single::SingleTaskExecutor;
pub use stream::{StreamExecutor, TaskStream};
pub use task::{TaskDefinition, TaskFactory, TaskResult};

use std::sync::Arc;

use taskforge_circuitbreaker::CircuitBreaker;
use taskforge_retry::RetryPolicy;
use taskforge_telemetry::{
    CompositeExporter, HealthCheckOptions, HealthStatus, TelemetryExporter, TelemetryStore,
    TelemetrySummary,
};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

/// The facade most callers build: one `TaskProcessor` per logical workload,
/// shared across every `run_*` call it makes.
pub struct TaskProcessor<T> {
    single: Arc<SingleTaskExecutor<T>>,
    semaphore: Arc<Semaphore>,
    telemetry: Arc<TelemetryStore>,
    default_timeout: std::time::Duration,
    continue_on_failure: bool,
    scheduling_strategy: SchedulingStrategy,
    progress_sink: Option<ProgressSink>,
    health_check_options: HealthCheckOptions,
    exporters: Vec<Arc<dyn TelemetryExporter>>,
}

impl<T: Send + 'static> TaskProcessor<T> {
    /// Builds a processor from validated options.
    pub fn new(options: ExecutorOptions) -> Self {
        let ExecutorOptions {
            max_concurrency,
            default_timeout,
            continue_on_failure,
            enable_detailed_telemetry,
            enable_progress_reporting,
            scheduling_strategy,
            retry_config,
            circuit_breaker_config,
            health_check_options,
            exporters,
            clock,
            classifier,
            progress_sink,
        } = options;

        let telemetry = Arc::new(TelemetryStore::new(enable_detailed_telemetry));
        let circuit_breaker = Arc::new(CircuitBreaker::new(circuit_breaker_config));
        let retry_policy = Arc::new(RetryPolicy::new(retry_config));
        let single = Arc::new(SingleTaskExecutor::new(
            circuit_breaker,
            retry_policy,
            Arc::clone(&telemetry),
            classifier,
            clock,
        ));
        let semaphore = Arc::new(Semaphore::new(max_concurrency));

        Self {
            single,
            semaphore,
            telemetry,
            default_timeout,
            continue_on_failure,
            scheduling_strategy,
            progress_sink: if enable_progress_reporting { progress_sink } else { None },
            health_check_options,
            exporters,
        }
    }

    /// Runs a single task in isolation.
    pub async fn run_one(
        &self,
        task: TaskDefinition<T>,
        cancel: CancellationToken,
    ) -> TaskResult<T> {
        let timeout = task.timeout.unwrap_or(self.default_timeout);
        self.single.run(&task.name, &task.factory, timeout, &cancel).await
    }

    /// Runs every task concurrently under the configured concurrency gate.
    pub async fn run_batch(
        &self,
        tasks: Vec<TaskDefinition<T>>,
        cancel: CancellationToken,
    ) -> Result<Vec<TaskResult<T>>, ExecutorError> {
        let executor = BatchExecutor::new(
            Arc::clone(&self.single),
            Arc::clone(&self.semaphore),
            self.default_timeout,
            self.continue_on_failure,
            self.scheduling_strategy,
            self.progress_sink.clone(),
        );
        executor.run(tasks, cancel).await
    }

    /// Runs every task concurrently, yielding each result as it finalizes.
    pub fn run_stream(
        &self,
        tasks: Vec<TaskDefinition<T>>,
        cancel: CancellationToken,
    ) -> Result<TaskStream<T>, ExecutorError> {
        let executor = StreamExecutor::new(
            Arc::clone(&self.single),
            Arc::clone(&self.semaphore),
            self.default_timeout,
            self.continue_on_failure,
            self.progress_sink.clone(),
        );
        executor.run(tasks, cancel)
    }

    /// Runs tasks honoring their declared dependency graph, skipping the
    /// transitive successors of any task that fails.
    pub async fn run_dependency_ordered(
        &self,
        tasks: Vec<TaskDefinition<T>>,
        cancel: CancellationToken,
    ) -> Result<Vec<TaskResult<T>>, ExecutorError> {
        let executor = DependencyOrderedExecutor::new(
            Arc::clone(&self.single),
            Arc::clone(&self.semaphore),
            self.default_timeout,
            self.continue_on_failure,
            self.progress_sink.clone(),
        );
        executor.run(tasks, cancel).await
    }

    /// Computes the current telemetry summary.
    pub fn telemetry_summary(&self) -> TelemetrySummary {
        self.telemetry.summary()
    }

    /// Evaluates health against the configured thresholds and the breaker's
    /// current phase.
    pub fn health_check(&self) -> HealthStatus {
        let phase = self.single.circuit_breaker().stats().phase;
        self.telemetry.health_check(&self.health_check_options, Some(phase))
    }

    /// Fans the current telemetry snapshot out to every registered exporter.
    pub async fn export_telemetry(&self) {
        if self.exporters.is_empty() {
            return;
        }
        let mut composite = CompositeExporter::new();
        for exporter in &self.exporters {
            composite = composite.add(Arc::clone(exporter));
        }
        self.telemetry.export(&composite, &CancellationToken::new()).await;
    }
}
