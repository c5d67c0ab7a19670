//! The dependency-ordered executor (C10): a batch executor that only
//! dispatches a task once every declared predecessor has succeeded, and
//! propagates failure as a dependency-skip to every transitive successor.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use taskforge_scheduler::TaskNode;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use crate::error::ExecutorError;
use crate::progress::{ProgressSink, ProgressTracker};
use crate::single::SingleTaskExecutor;
use crate::task::{TaskDefinition, TaskResult};

pub struct DependencyOrderedExecutor<T> {
    single: Arc<SingleTaskExecutor<T>>,
    semaphore: Arc<Semaphore>,
    default_timeout: Duration,
    continue_on_failure: bool,
    progress_sink: Option<ProgressSink>,
}

impl<T: Send + 'static> DependencyOrderedExecutor<T> {
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

    /// Validates the dependency graph, then dispatches tasks as their
    /// predecessors succeed. A failed task's transitive successors are
    /// published as dependency-skipped (`kind=Business`) and never dispatched.
    pub async fn run(
        &self,
        tasks: Vec<TaskDefinition<T>>,
        parent_token: CancellationToken,
    ) -> Result<Vec<TaskResult<T>>, ExecutorError> {
        if tasks.is_empty() {
            return Err(ExecutorError::EmptyBatch);
        }

        let nodes: Vec<TaskNode> = tasks
            .iter()
            .map(|task| {
                let mut node = TaskNode::new(task.name.clone()).priority(task.priority);
                for dependency in &task.dependencies {
                    node = node.depends_on(dependency.clone());
                }
                node
            })
            .collect();
        taskforge_scheduler::resolve(&nodes)?;

        let total = tasks.len();
        let tracker = Arc::new(ProgressTracker::new(total, self.progress_sink.clone()));
        let batch_token = parent_token.child_token();

        let mut by_name: HashMap<String, TaskDefinition<T>> =
            tasks.into_iter().map(|task| (task.name.clone(), task)).collect();
        let mut remaining_deps: HashMap<String, usize> = by_name
            .iter()
            .map(|(name, task)| (name.clone(), task.dependencies.len()))
            .collect();
        let mut dependents: HashMap<String, Vec<String>> = HashMap::new();
        for (name, task) in &by_name {
            for dependency in &task.dependencies {
                dependents.entry(dependency.clone()).or_default().push(name.clone());
            }
        }

        let (result_tx, mut result_rx) = tokio::sync::mpsc::unbounded_channel::<TaskResult<T>>();
        let mut results = Vec::with_capacity(total);
        let mut settled = std::collections::HashSet::new();
        let mut ready: Vec<String> = remaining_deps
            .iter()
            .filter(|(_, &count)| count == 0)
            .map(|(name, _)| name.clone())
            .collect();

        let mut completed_count = 0usize;
        while completed_count < total {
            ready.sort_by(|a, b| {
                let priority_a = by_name.get(a).map(|t| t.priority).unwrap_or(0);
                let priority_b = by_name.get(b).map(|t| t.priority).unwrap_or(0);
                priority_b.cmp(&priority_a)
            });

            for name in ready.drain(..) {
                if !settled.insert(name.clone()) {
                    continue;
                }
                let Some(task) = by_name.remove(&name) else {
                    continue;
                };
                let semaphore = Arc::clone(&self.semaphore);
                let single = Arc::clone(&self.single);
                let timeout = task.timeout.unwrap_or(self.default_timeout);
                let tracker = Arc::clone(&tracker);
                let token = batch_token.clone();
                let cancel_token = batch_token.clone();
                let continue_on_failure = self.continue_on_failure;
                let tx = result_tx.clone();
                let task_name = task.name;
                let factory = task.factory;

                tokio::spawn(async move {
                    let Ok(_permit) = semaphore.acquire_owned().await else {
                        return;
                    };
                    tracker.task_started(&task_name);
                    let result = single.run(&task_name, &factory, timeout, &token).await;
                    if !result.successful && !continue_on_failure {
                        cancel_token.cancel();
                    }
                    tracker.task_finished(&task_name, result.successful);
                    let _ = tx.send(result);
                });
            }

            let Some(result) = result_rx.recv().await else {
                break;
            };
            completed_count += 1;
            let name = result.name.clone();
            let successful = result.successful;
            results.push(result);

            if successful {
                if let Some(children) = dependents.get(&name) {
                    for child in children {
                        if let Some(count) = remaining_deps.get_mut(child) {
                            *count -= 1;
                            if *count == 0 && !settled.contains(child) {
                                ready.push(child.clone());
                            }
                        }
                    }
                }
            } else {
                let successors = taskforge_scheduler::transitive_successors(&nodes, &name);
                for successor in successors {
                    if !settled.insert(successor.clone()) {
                        continue;
                    }
                    if by_name.remove(&successor).is_some() {
                        tracker.task_finished(&successor, false);
                        results.push(TaskResult::dependency_skipped(successor, &name));
                        completed_count += 1;
                    }
                }
            }
        }

        Ok(results)
    }
}
