use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use taskforge::{
    CircuitBreakerConfig, ErrorKind, ExecutorOptions, RetryConfig, TaskDefinition, TaskFactory,
    TaskFailure, TaskProcessor,
};
use tokio_util::sync::CancellationToken;

fn ok(value: u32) -> TaskFactory<u32> {
    Arc::new(move |_cancel| Box::pin(async move { Ok(value) }))
}

fn failing(message: &'static str) -> TaskFactory<u32> {
    Arc::new(move |_cancel| Box::pin(async move { Err(TaskFailure::new(message)) }))
}

#[tokio::test]
async fn happy_batch_every_task_succeeds() {
    let processor: TaskProcessor<u32> =
        TaskProcessor::new(ExecutorOptions::builder().build().unwrap());
    let tasks = vec![
        TaskDefinition::new("a", ok(1)),
        TaskDefinition::new("b", ok(2)),
        TaskDefinition::new("c", ok(3)),
    ];

    let results = processor.run_batch(tasks, CancellationToken::new()).await.unwrap();
    assert_eq!(results.len(), 3);
    assert!(results.iter().all(|r| r.successful));
    assert_eq!(processor.telemetry_summary().total, 3);
}

#[tokio::test]
async fn one_failing_task_does_not_sink_its_siblings() {
    let processor: TaskProcessor<u32> =
        TaskProcessor::new(ExecutorOptions::builder().build().unwrap());
    let tasks = vec![
        TaskDefinition::new("good", ok(1)),
        TaskDefinition::new("bad", failing("invalid request")),
        TaskDefinition::new("also-good", ok(2)),
    ];

    let results = processor.run_batch(tasks, CancellationToken::new()).await.unwrap();
    let successes = results.iter().filter(|r| r.successful).count();
    let failures = results.iter().filter(|r| !r.successful).count();
    assert_eq!(successes, 2);
    assert_eq!(failures, 1);
}

#[tokio::test]
async fn retryable_failure_eventually_exhausts_at_the_configured_attempt_cap() {
    let processor: TaskProcessor<u32> = TaskProcessor::new(
        ExecutorOptions::builder()
            .retry_config(
                RetryConfig::builder()
                    .max_attempts(2)
                    .base_delay(Duration::from_millis(1))
                    .build()
                    .unwrap(),
            )
            .build()
            .unwrap(),
    );
    let attempts = Arc::new(AtomicUsize::new(0));
    let attempts_clone = Arc::clone(&attempts);
    let task = TaskDefinition::new(
        "flaky",
        Arc::new(move |_cancel| {
            let attempts = Arc::clone(&attempts_clone);
            Box::pin(async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err(TaskFailure::new("connection reset"))
            })
        }),
    );

    let result = processor.run_one(task, CancellationToken::new()).await;
    assert!(!result.successful);
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
    assert_eq!(result.attempt_number, 3);
}

#[tokio::test]
async fn circuit_breaker_opens_after_threshold_and_rejects_without_dispatch() {
    let processor: TaskProcessor<u32> = TaskProcessor::new(
        ExecutorOptions::builder()
            .circuit_breaker_config(CircuitBreakerConfig::builder().failure_threshold(2).build().unwrap())
            .build()
            .unwrap(),
    );

    for _ in 0..2 {
        let result = processor
            .run_one(TaskDefinition::new("bad", failing("invalid request")), CancellationToken::new())
            .await;
        assert!(!result.successful);
    }

    let dispatched = Arc::new(AtomicUsize::new(0));
    let dispatched_clone = Arc::clone(&dispatched);
    let guarded = TaskDefinition::new(
        "guarded",
        Arc::new(move |_cancel| {
            dispatched_clone.fetch_add(1, Ordering::SeqCst);
            Box::pin(async { Ok(1u32) })
        }),
    );

    let result = processor.run_one(guarded, CancellationToken::new()).await;
    assert!(!result.successful);
    assert_eq!(result.error_kind, Some(ErrorKind::System));
    assert_eq!(dispatched.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn dependency_chain_skips_descendants_of_a_failed_task() {
    let processor: TaskProcessor<u32> =
        TaskProcessor::new(ExecutorOptions::builder().build().unwrap());
    let tasks = vec![
        TaskDefinition::new("fetch", failing("invalid request")),
        TaskDefinition::new("transform", ok(1)).depends_on("fetch"),
        TaskDefinition::new("store", ok(2)).depends_on("transform"),
    ];

    let results = processor
        .run_dependency_ordered(tasks, CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(results.len(), 3);

    let transform = results.iter().find(|r| r.name == "transform").unwrap();
    let store = results.iter().find(|r| r.name == "store").unwrap();
    assert!(!transform.successful);
    assert_eq!(transform.error_kind, Some(ErrorKind::Business));
    assert!(!store.successful);
    assert_eq!(store.error_kind, Some(ErrorKind::Business));
}

#[tokio::test]
async fn stream_yields_every_task_exactly_once() {
    let processor: TaskProcessor<u32> =
        TaskProcessor::new(ExecutorOptions::builder().build().unwrap());
    let tasks: Vec<TaskDefinition<u32>> = (0..10).map(|i| TaskDefinition::new(format!("t{i}"), ok(i))).collect();

    let stream = processor.run_stream(tasks, CancellationToken::new()).unwrap();
    let results: Vec<_> = stream.collect().await;
    assert_eq!(results.len(), 10);
    assert!(results.iter().all(|r| r.successful));
}
