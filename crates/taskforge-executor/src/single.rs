//! The single-task executor (C7): circuit breaker gate, retry-driven attempt
//! loop with timeout and cancellation, and telemetry capture, combined into
//! one middleware-shaped pipeline over `(name, factory, cancel) -> result`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use taskforge_circuitbreaker::CircuitBreaker;
use taskforge_classifier::FailureClassifier;
use taskforge_core::{Clock, ErrorKind, TaskFailure};
use taskforge_retry::{RetryDecision, RetryEvent, RetryPolicy};
use taskforge_telemetry::{TelemetryRecord, TelemetryStore};
use tokio_util::sync::CancellationToken;

use crate::task::{TaskFactory, TaskResult};

/// Runs one named unit of work to completion, publishing exactly one
/// [`TaskResult`] and one telemetry record per invocation.
///
/// Cheap to share: every field is an `Arc`, so a processor builds this once
/// and clones the `Arc<SingleTaskExecutor<T>>` into every spawned worker.
pub struct SingleTaskExecutor<T> {
    circuit_breaker: Arc<CircuitBreaker>,
    retry_policy: Arc<RetryPolicy>,
    telemetry: Arc<TelemetryStore>,
    classifier: Arc<dyn FailureClassifier>,
    clock: Arc<dyn Clock>,
    _marker: std::marker::PhantomData<fn() -> T>,
}

impl<T> SingleTaskExecutor<T> {
    pub fn new(
        circuit_breaker: Arc<CircuitBreaker>,
        retry_policy: Arc<RetryPolicy>,
        telemetry: Arc<TelemetryStore>,
        classifier: Arc<dyn FailureClassifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            circuit_breaker,
            retry_policy,
            telemetry,
            classifier,
            clock,
            _marker: std::marker::PhantomData,
        }
    }

    /// The breaker gating this executor's dispatch, for callers that need to
    /// read its phase (e.g. health checks) without going through `run`.
    pub fn circuit_breaker(&self) -> &Arc<CircuitBreaker> {
        &self.circuit_breaker
    }

    /// Runs `factory` under `timeout`, retrying on classified-retryable
    /// failures until the retry policy exhausts, gated by the circuit
    /// breaker. Never panics or returns early without publishing telemetry.
    pub async fn run(
        &self,
        name: &str,
        factory: &TaskFactory<T>,
        timeout: Duration,
        parent_token: &CancellationToken,
    ) -> TaskResult<T> {
        let started_at = self.clock.now();

        if self.circuit_breaker.should_reject() {
            let result = TaskResult::failure(
                name,
                ErrorKind::System,
                format!("circuit open: {}", self.circuit_breaker.name()),
                false,
                1u32,
                started_at,
                Duration::ZERO,
            );
            self.publish(&result);
            return result;
        }

        let mut attempt: usize = 1;
        loop {
            let child_token = parent_token.child_token();
            let fut = factory(child_token);
            let timed = tokio::time::timeout(timeout, fut);
            tokio::pin!(timed);

            let body_outcome = tokio::select! {
                biased;
                _ = parent_token.cancelled() => None,
                res = &mut timed => Some(res),
            };

            match body_outcome {
                None => {
                    let result = TaskResult::failure(
                        name,
                        ErrorKind::Timeout,
                        "cancelled",
                        false,
                        attempt as u32,
                        started_at,
                        started_at.elapsed(),
                    );
                    self.circuit_breaker.record_failure();
                    self.publish(&result);
                    return result;
                }
                Some(Ok(Ok(value))) => {
                    self.retry_policy.emit(RetryEvent::Success {
                        pattern_name: self.retry_policy.name().to_string(),
                        timestamp: Instant::now(),
                        attempts: attempt,
                    });
                    let result = TaskResult::success(
                        name,
                        value,
                        attempt as u32,
                        started_at,
                        started_at.elapsed(),
                    );
                    self.circuit_breaker.record_success();
                    self.publish(&result);
                    return result;
                }
                Some(Ok(Err(failure))) => {
                    let kind = self.classifier.classify(&failure);
                    match self.next_action(&failure, kind, attempt) {
                        RetryDecision::Retry { next_attempt, delay } => {
                            self.emit_retry(attempt, delay);
                            if !self.cancellable_sleep(delay, parent_token).await {
                                let result = self.cancelled_during_backoff(
                                    name, attempt, started_at,
                                );
                                self.publish(&result);
                                return result;
                            }
                            attempt = next_attempt;
                        }
                        RetryDecision::Exhausted => {
                            self.emit_exhausted(attempt);
                            let retryable = self.classifier.is_retryable(kind);
                            let result = TaskResult::failure(
                                name,
                                kind,
                                failure.message(),
                                retryable,
                                attempt as u32,
                                started_at,
                                started_at.elapsed(),
                            );
                            self.circuit_breaker.record_failure();
                            self.publish(&result);
                            return result;
                        }
                    }
                }
                Some(Err(_elapsed)) => {
                    let failure = TaskFailure::with_kind("task timed out", ErrorKind::Timeout);
                    match self.next_action(&failure, ErrorKind::Timeout, attempt) {
                        RetryDecision::Retry { next_attempt, delay } => {
                            self.emit_retry(attempt, delay);
                            if !self.cancellable_sleep(delay, parent_token).await {
                                let result = self.cancelled_during_backoff(
                                    name, attempt, started_at,
                                );
                                self.publish(&result);
                                return result;
                            }
                            attempt = next_attempt;
                        }
                        RetryDecision::Exhausted => {
                            self.emit_exhausted(attempt);
                            let result = TaskResult::failure(
                                name,
                                ErrorKind::Timeout,
                                "task timed out",
                                self.classifier.is_retryable(ErrorKind::Timeout),
                                attempt as u32,
                                started_at,
                                started_at.elapsed(),
                            );
                            self.circuit_breaker.record_failure();
                            self.publish(&result);
                            return result;
                        }
                    }
                }
            }
        }
    }

    fn next_action(&self, failure: &TaskFailure, kind: ErrorKind, attempt: usize) -> RetryDecision {
        self.retry_policy
            .next_action(failure, kind, attempt, self.clock.as_ref())
    }

    fn emit_retry(&self, attempt: usize, delay: Duration) {
        self.retry_policy.emit(RetryEvent::Retry {
            pattern_name: self.retry_policy.name().to_string(),
            timestamp: Instant::now(),
            attempt,
            delay,
        });
    }

    fn emit_exhausted(&self, attempts: usize) {
        self.retry_policy.emit(RetryEvent::Exhausted {
            pattern_name: self.retry_policy.name().to_string(),
            timestamp: Instant::now(),
            attempts,
        });
    }

    fn cancelled_during_backoff(
        &self,
        name: &str,
        attempt: usize,
        started_at: Instant,
    ) -> TaskResult<T> {
        self.circuit_breaker.record_failure();
        TaskResult::failure(
            name,
            ErrorKind::Timeout,
            "cancelled during retry backoff",
            false,
            attempt as u32,
            started_at,
            started_at.elapsed(),
        )
    }

    /// Sleeps for `delay`, cancellation-aware. Returns `false` if `parent_token`
    /// was cancelled before the delay elapsed.
    async fn cancellable_sleep(&self, delay: Duration, parent_token: &CancellationToken) -> bool {
        if delay.is_zero() {
            return true;
        }
        tokio::select! {
            biased;
            _ = parent_token.cancelled() => false,
            _ = tokio::time::sleep(delay) => true,
        }
    }

    fn publish(&self, result: &TaskResult<T>) {
        let elapsed_ms = result.execution_time.as_millis() as u64;
        let timestamp = self.clock.wall_now();
        let record = if result.successful {
            TelemetryRecord::success(&result.name, elapsed_ms, timestamp)
        } else {
            TelemetryRecord::failure(
                &result.name,
                elapsed_ms,
                result.error_kind.expect("failed result always carries a kind"),
                result.error_message.clone().unwrap_or_default(),
                timestamp,
            )
        };
        self.telemetry.append(record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use taskforge_circuitbreaker::CircuitBreakerConfig;
    use taskforge_classifier::DefaultClassifier;
    use taskforge_core::SystemClock;
    use taskforge_retry::RetryConfig;

    fn executor() -> SingleTaskExecutor<u32> {
        SingleTaskExecutor::new(
            Arc::new(CircuitBreaker::new(
                CircuitBreakerConfig::builder()
                    .failure_threshold(100)
                    .build()
                    .unwrap(),
            )),
            Arc::new(RetryPolicy::new(RetryConfig::simple())),
            Arc::new(TelemetryStore::new(false)),
            Arc::new(DefaultClassifier),
            Arc::new(SystemClock),
        )
    }

    #[tokio::test]
    async fn successful_task_publishes_one_result_and_one_record() {
        let executor = executor();
        let factory: TaskFactory<u32> =
            Arc::new(|_token| Box::pin(async { Ok(42u32) }));

        let result = executor
            .run("t", &factory, Duration::from_secs(1), &CancellationToken::new())
            .await;

        assert!(result.successful);
        assert_eq!(result.data, Some(42));
        assert_eq!(result.attempt_number, 1);
        assert_eq!(executor.telemetry.len(), 1);
    }

    #[tokio::test]
    async fn retries_until_success() {
        let executor = executor();
        let attempts = Arc::new(AtomicUsize::new(0));
        let attempts_clone = Arc::clone(&attempts);
        let factory: TaskFactory<u32> = Arc::new(move |_token| {
            let attempts = Arc::clone(&attempts_clone);
            Box::pin(async move {
                let n = attempts.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(TaskFailure::new("connection reset"))
                } else {
                    Ok(7u32)
                }
            })
        });

        let result = executor
            .run("t", &factory, Duration::from_secs(1), &CancellationToken::new())
            .await;

        assert!(result.successful);
        assert_eq!(result.attempt_number, 3);
    }

    #[tokio::test]
    async fn non_retryable_failure_exhausts_after_one_attempt() {
        let executor = executor();
        let factory: TaskFactory<u32> =
            Arc::new(|_token| Box::pin(async { Err(TaskFailure::new("invalid request")) }));

        let result = executor
            .run("t", &factory, Duration::from_secs(1), &CancellationToken::new())
            .await;

        assert!(!result.successful);
        assert_eq!(result.error_kind, Some(ErrorKind::Validation));
        assert_eq!(result.attempt_number, 1);
        assert!(!result.retryable);
    }

    #[tokio::test]
    async fn open_breaker_rejects_without_dispatching() {
        let circuit_breaker = Arc::new(CircuitBreaker::new(
            CircuitBreakerConfig::builder()
                .failure_threshold(1)
                .name("test")
                .build()
                .unwrap(),
        ));
        circuit_breaker.force_open();
        let executor = SingleTaskExecutor::new(
            circuit_breaker,
            Arc::new(RetryPolicy::new(RetryConfig::simple())),
            Arc::new(TelemetryStore::new(false)),
            Arc::new(DefaultClassifier),
            Arc::new(SystemClock),
        );

        let dispatched = Arc::new(AtomicUsize::new(0));
        let dispatched_clone = Arc::clone(&dispatched);
        let factory: TaskFactory<u32> = Arc::new(move |_token| {
            dispatched_clone.fetch_add(1, Ordering::SeqCst);
            Box::pin(async { Ok(1u32) })
        });

        let result = executor
            .run("t", &factory, Duration::from_secs(1), &CancellationToken::new())
            .await;

        assert!(!result.successful);
        assert_eq!(result.error_kind, Some(ErrorKind::System));
        assert_eq!(dispatched.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn slow_task_times_out() {
        let executor = executor();
        let factory: TaskFactory<u32> = Arc::new(|_token| {
            Box::pin(async {
                tokio::time::sleep(Duration::from_secs(10)).await;
                Ok(1u32)
            })
        });

        let result = executor
            .run("t", &factory, Duration::from_millis(10), &CancellationToken::new())
            .await;

        assert!(!result.successful);
        assert_eq!(result.error_kind, Some(ErrorKind::Timeout));
    }

    #[tokio::test]
    async fn parent_cancellation_aborts_immediately() {
        let executor = executor();
        let token = CancellationToken::new();
        token.cancel();
        let factory: TaskFactory<u32> = Arc::new(|_token| Box::pin(async { Ok(1u32) }));

        let result = executor
            .run("t", &factory, Duration::from_secs(1), &token)
            .await;

        assert!(!result.successful);
        assert_eq!(result.error_kind, Some(ErrorKind::Timeout));
    }
}
