use taskforge_scheduler::ResolverError;
use thiserror::Error;

/// Errors raised at construction or submission boundaries. Per-task failures
/// are never raised this way; they are published as [`crate::task::TaskResult`]s.
#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("batch must contain at least one task")]
    EmptyBatch,
    #[error("max_concurrency must be greater than zero")]
    NonPositiveConcurrency,
    #[error("default_task_timeout must be greater than zero")]
    NonPositiveTimeout,
    #[error(transparent)]
    Resolver(#[from] ResolverError),
}
