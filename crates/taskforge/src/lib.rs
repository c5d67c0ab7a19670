//! A concurrent task batch executor built from small, independently testable
//! pieces: failure classification, retry with pluggable backoff, a circuit
//! breaker, telemetry aggregation, dependency resolution, and four executor
//! shapes layered on top.
//!
//! # Quick Start
//!
//! ```toml
//! [dependencies]
//! taskforge = "0.1"
//! ```
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use taskforge::{ExecutorOptions, TaskDefinition, TaskFailure, TaskProcessor};
//! use tokio_util::sync::CancellationToken;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let processor: TaskProcessor<String> =
//!     TaskProcessor::new(ExecutorOptions::builder().max_concurrency(8).build().unwrap());
//!
//! let tasks = vec![
//!     TaskDefinition::new("fetch-user", Arc::new(|_cancel| {
//!         Box::pin(async { Ok("alice".to_string()) })
//!     })),
//!     TaskDefinition::new("fetch-order", Arc::new(|_cancel| {
//!         Box::pin(async { Err(TaskFailure::new("order service unreachable")) })
//!     })),
//! ];
//!
//! let results = processor.run_batch(tasks, CancellationToken::new()).await.unwrap();
//! for result in results {
//!     println!("{}: {}", result.name, result.successful);
//! }
//! # }
//! ```
//!
//! # Executor Shapes
//!
//! - **[`TaskProcessor::run_one`]** — a single task, circuit-breaker-gated and
//!   retried, with no batch bookkeeping.
//! - **[`TaskProcessor::run_batch`]** — a flat list dispatched under a bounded
//!   concurrency gate; returns once every task has published a result.
//! - **[`TaskProcessor::run_stream`]** — the same dispatch, but results arrive
//!   as a [`TaskStream`] in completion order; dropping the stream cancels
//!   whatever is still in flight.
//! - **[`TaskProcessor::run_dependency_ordered`]** — tasks declare named
//!   dependencies; a task only dispatches once every dependency has
//!   succeeded, and a failure skips its transitive successors instead of
//!   dispatching them.
//!
//! ### When to Use Dependency Ordering
//!
//! - **Pipelines**: a later stage reads the output shape of an earlier one
//! - **Fan-in**: several independent fetches feed one aggregation step
//! - **Partial failure containment**: one broken stage shouldn't silently run
//!   everything downstream of it
//!
//! ### Anti-Patterns
//!
//! ❌ **Using dependency ordering for plain concurrency limiting** — if
//! nothing actually depends on anything else, [`TaskProcessor::run_batch`] is
//! simpler and avoids the topological-sort overhead.
//!
//! ❌ **Ignoring `continue_on_failure`** — with it left at the default
//! (`true`), every task still runs even after a sibling fails; set it to
//! `false` explicitly when a failure should cut the batch short.
//!
//! # Telemetry and Health
//!
//! Every dispatched task publishes exactly one [`TaskResult`] and one
//! telemetry record. [`TaskProcessor::telemetry_summary`] and
//! [`TaskProcessor::health_check`] read that log without mutating it;
//! [`TaskProcessor::export_telemetry`] fans the current snapshot out to every
//! exporter registered on [`ExecutorOptions`].

pub use taskforge_circuitbreaker::{
    CircuitBreaker, CircuitBreakerConfig, CircuitBreakerConfigBuilder, CircuitBreakerConfigError,
    CircuitBreakerEvent, CircuitBreakerStats, Phase,
};
pub use taskforge_classifier::{DefaultClassifier, FailureClassifier, FnClassifier};
pub use taskforge_core::{
    Clock, DefaultRandomSource, ErrorKind, FixedRandomSource, RandomSource, SystemClock, TaskFailure,
};
pub use taskforge_executor::{
    BatchExecutor, DependencyOrderedExecutor, ExecutorError, ExecutorOptions, ExecutorOptionsBuilder,
    ProgressSink, ProgressSnapshot, SchedulingStrategy, SingleTaskExecutor, StreamExecutor,
    TaskDefinition, TaskFactory, TaskProcessor, TaskResult, TaskStream,
};
pub use taskforge_retry::{
    BackoffStrategy, RetryConfig, RetryConfigBuilder, RetryConfigError, RetryDecision, RetryEvent,
    RetryPolicy,
};
pub use taskforge_scheduler::{resolve, transitive_successors, ResolverError, TaskNode};
pub use taskforge_telemetry::{
    CompositeExporter, HealthCheckOptions, HealthCheckOptionsBuilder, HealthStatus, MemoryExporter,
    TelemetryExporter, TelemetryRecord, TelemetryStore, TelemetrySummary,
};
