//! The stream executor (C9): same dispatch behavior as the batch executor,
//! but yields each result as soon as it finalizes instead of waiting for the
//! whole batch.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use futures::Stream;
use tokio::sync::Semaphore;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;

use crate::error::ExecutorError;
use crate::progress::{ProgressSink, ProgressTracker};
use crate::single::SingleTaskExecutor;
use crate::task::{TaskDefinition, TaskResult};

pub struct StreamExecutor<T> {
    single: Arc<SingleTaskExecutor<T>>,
    semaphore: Arc<Semaphore>,
    default_timeout: Duration,
    continue_on_failure: bool,
    progress_sink: Option<ProgressSink>,
}

impl<T: Send + 'static> StreamExecutor<T> {
    pub(crate) fn new(
        single: Arc<SingleTaskExecutor<T>>,
        semaphore: Arc<Semaphore>,
        default_timeout: Duration,
        continue_on_failure: bool,
        progress_sink: Option<ProgressSink>,
    ) -> Self {
        Self {
            single,
            semaphore,
            default_timeout,
            continue_on_failure,
            progress_sink,
        }
    }

    /// Dispatches every task and returns a finite, completion-ordered,
    /// one-shot stream of results. Dropping the stream cancels every
    /// outstanding task.
    pub fn run(
        &self,
        tasks: Vec<TaskDefinition<T>>,
        parent_token: CancellationToken,
    ) -> Result<TaskStream<T>, ExecutorError> {
        if tasks.is_empty() {
            return Err(ExecutorError::EmptyBatch);
        }

        let tracker = Arc::new(ProgressTracker::new(tasks.len(), self.progress_sink.clone()));
        let batch_token = parent_token.child_token();
        let (tx, rx) = tokio::sync::mpsc::channel(tasks.len());

        for task in tasks {
            let semaphore = Arc::clone(&self.semaphore);
            let single = Arc::clone(&self.single);
            let timeout = task.timeout.unwrap_or(self.default_timeout);
            let tracker = Arc::clone(&tracker);
            let token = batch_token.clone();
            let cancel_token = batch_token.clone();
            let name = task.name;
            let factory = task.factory;
            let continue_on_failure = self.continue_on_failure;
            let tx = tx.clone();

            tokio::spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return;
                };
                tracker.task_started(&name);
                let result = single.run(&name, &factory, timeout, &token).await;
                if !result.successful && !continue_on_failure {
                    cancel_token.cancel();
                }
                tracker.task_finished(&name, result.successful);
                // A dropped receiver means the consumer cancelled; there is
                // nothing further to do with this result.
                let _ = tx.send(result).await;
            });
        }
        drop(tx);

        Ok(TaskStream {
            inner: ReceiverStream::new(rx),
            cancel: batch_token,
        })
    }
}

/// A completion-ordered stream of [`TaskResult`]s. Dropping it cancels every
/// task that has not yet finalized.
pub struct TaskStream<T> {
    inner: ReceiverStream<TaskResult<T>>,
    cancel: CancellationToken,
}

impl<T> Stream for TaskStream<T> {
    type Item = TaskResult<T>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        Pin::new(&mut this.inner).poll_next(cx)
    }
}

impl<T> Drop for TaskStream<T> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use taskforge_circuitbreaker::{CircuitBreaker, CircuitBreakerConfig};
    use taskforge_classifier::DefaultClassifier;
    use taskforge_core::SystemClock;
    use taskforge_retry::{RetryConfig, RetryPolicy};
    use taskforge_telemetry::TelemetryStore;

    use crate::task::TaskFactory;

    fn executor() -> StreamExecutor<u32> {
        StreamExecutor::new(
            Arc::new(SingleTaskExecutor::new(
                Arc::new(CircuitBreaker::new(
                    CircuitBreakerConfig::builder()
                        .failure_threshold(1000)
                        .build()
                        .unwrap(),
                )),
                Arc::new(RetryPolicy::new(RetryConfig::none())),
                Arc::new(TelemetryStore::new(false)),
                Arc::new(DefaultClassifier),
                Arc::new(SystemClock),
            )),
            Arc::new(Semaphore::new(4)),
            Duration::from_secs(5),
            true,
            None,
        )
    }

    #[tokio::test]
    async fn yields_every_result_exactly_once() {
        let executor = executor();
        let tasks: Vec<TaskDefinition<u32>> = (0..5)
            .map(|i| {
                TaskDefinition::new(
                    format!("t{i}"),
                    Arc::new(move |_token| Box::pin(async move { Ok(i) })) as TaskFactory<u32>,
                )
            })
            .collect();

        let stream = executor.run(tasks, CancellationToken::new()).unwrap();
        let results: Vec<_> = stream.collect().await;
        assert_eq!(results.len(), 5);
        assert!(results.iter().all(|r| r.successful));
    }

    #[tokio::test]
    async fn empty_batch_is_rejected() {
        let executor = executor();
        let err = executor.run(Vec::new(), CancellationToken::new()).unwrap_err();
        assert!(matches!(err, ExecutorError::EmptyBatch));
    }
}
