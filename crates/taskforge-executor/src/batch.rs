//! The batch executor (C8): bounded-concurrency dispatch over a flat list of
//! tasks, isolating failures unless `continue_on_failure` is disabled.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use crate::error::ExecutorError;
use crate::options::SchedulingStrategy;
use crate::progress::{ProgressSink, ProgressTracker};
use crate::single::SingleTaskExecutor;
use crate::task::{TaskDefinition, TaskResult};

/// Runs many tasks concurrently under a [`tokio::sync::Semaphore`]-backed gate,
/// grounded on the same bulkhead pattern used elsewhere in this workspace.
pub struct BatchExecutor<T> {
    single: Arc<SingleTaskExecutor<T>>,
    semaphore: Arc<Semaphore>,
    default_timeout: Duration,
    continue_on_failure: bool,
    scheduling_strategy: SchedulingStrategy,
    progress_sink: Option<ProgressSink>,
}

impl<T: Send + 'static> BatchExecutor<T> {
    pub(crate) fn new(
        single: Arc<SingleTaskExecutor<T>>,
        semaphore: Arc<Semaphore>,
        default_timeout: Duration,
        continue_on_failure: bool,
        scheduling_strategy: SchedulingStrategy,
        progress_sink: Option<ProgressSink>,
    ) -> Self {
        Self {
            single,
            semaphore,
            default_timeout,
            continue_on_failure,
            scheduling_strategy,
            progress_sink,
        }
    }

    /// Dispatches every task, returning once every worker has published its
    /// result. Publication order within the returned vector is completion
    /// order, not submission order.
    pub async fn run(
        &self,
        mut tasks: Vec<TaskDefinition<T>>,
        parent_token: CancellationToken,
    ) -> Result<Vec<TaskResult<T>>, ExecutorError> {
        if tasks.is_empty() {
            return Err(ExecutorError::EmptyBatch);
        }

        if self.scheduling_strategy == SchedulingStrategy::Priority {
            tasks.sort_by(|a, b| b.priority.cmp(&a.priority));
        }

        let tracker = Arc::new(ProgressTracker::new(tasks.len(), self.progress_sink.clone()));
        let batch_token = parent_token.child_token();

        let mut handles = Vec::with_capacity(tasks.len());
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

            handles.push(tokio::spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .expect("semaphore is never closed while a batch is running");
                tracker.task_started(&name);
                let result = single.run(&name, &factory, timeout, &token).await;
                if !result.successful && !continue_on_failure {
                    cancel_token.cancel();
                }
                tracker.task_finished(&name, result.successful);
                result
            }));
        }

        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            results.push(handle.await.expect("task worker panicked"));
        }
        Ok(results)
    }
}
