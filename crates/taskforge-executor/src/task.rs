use futures::future::BoxFuture;
use std::sync::Arc;
use std::time::{Duration, Instant};
use taskforge_core::{ErrorKind, TaskFailure};
use tokio_util::sync::CancellationToken;

/// A named, cancellation-aware producer of a single value. A batch is
/// homogeneous in `T` but heterogeneous in the work each factory performs.
pub type TaskFactory<T> =
    Arc<dyn Fn(CancellationToken) -> BoxFuture<'static, Result<T, TaskFailure>> + Send + Sync>;

/// A declared unit of work, optionally depending on the success of other
/// named units in the same batch.
pub struct TaskDefinition<T> {
    pub name: String,
    pub factory: TaskFactory<T>,
    pub dependencies: Vec<String>,
    pub priority: i64,
    pub timeout: Option<Duration>,
}

impl<T> TaskDefinition<T> {
    /// Creates a task definition with no dependencies and the batch's default timeout.
    pub fn new(name: impl Into<String>, factory: TaskFactory<T>) -> Self {
        Self {
            name: name.into(),
            factory,
            dependencies: Vec::new(),
            priority: 0,
            timeout: None,
        }
    }

    /// Declares a dependency this task must wait on.
    pub fn depends_on(mut self, name: impl Into<String>) -> Self {
        self.dependencies.push(name.into());
        self
    }

    /// Sets the dispatch tie-breaking priority (higher runs earlier).
    pub fn priority(mut self, priority: i64) -> Self {
        self.priority = priority;
        self
    }

    /// Overrides the batch's default timeout for this task.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// The outcome of dispatching one task, published exactly once per submitted unit.
#[derive(Debug, Clone)]
pub struct TaskResult<T> {
    pub name: String,
    pub successful: bool,
    pub data: Option<T>,
    pub error_kind: Option<ErrorKind>,
    pub error_message: Option<String>,
    pub retryable: bool,
    pub attempt_number: u32,
    pub started_at: Instant,
    pub execution_time: Duration,
    pub metadata: std::collections::BTreeMap<String, String>,
}

impl<T> TaskResult<T> {
    pub(crate) fn success(
        name: impl Into<String>,
        data: T,
        attempt_number: u32,
        started_at: Instant,
        execution_time: Duration,
    ) -> Self {
        Self {
            name: name.into(),
            successful: true,
            data: Some(data),
            error_kind: None,
            error_message: None,
            retryable: false,
            attempt_number,
            started_at,
            execution_time,
            metadata: Default::default(),
        }
    }

    pub(crate) fn failure(
        name: impl Into<String>,
        kind: ErrorKind,
        message: impl Into<String>,
        retryable: bool,
        attempt_number: u32,
        started_at: Instant,
        execution_time: Duration,
    ) -> Self {
        Self {
            name: name.into(),
            successful: false,
            data: None,
            error_kind: Some(kind),
            error_message: Some(message.into()),
            retryable,
            attempt_number,
            started_at,
            execution_time,
            metadata: Default::default(),
        }
    }

    /// Builds a dependency-skip result: `kind=Business`, never dispatched.
    pub(crate) fn dependency_skipped(name: impl Into<String>, failed_predecessor: &str) -> Self {
        let now = Instant::now();
        Self::failure(
            name,
            ErrorKind::Business,
            format!("dependency failed: {failed_predecessor}"),
            false,
            1,
            now,
            Duration::ZERO,
        )
    }
}
