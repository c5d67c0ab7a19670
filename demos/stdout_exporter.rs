//! A minimal stdout telemetry exporter, wired into a small batch run.
//! Run with: cargo run --example stdout_exporter

use std::sync::Arc;
use taskforge::{
    ExecutorOptions, TaskDefinition, TaskFactory, TaskFailure, TelemetryExporter, TelemetryRecord,
};
use tokio_util::sync::CancellationToken;

struct StdoutExporter;

#[async_trait::async_trait]
impl TelemetryExporter for StdoutExporter {
    fn name(&self) -> &str {
        "stdout"
    }

    async fn export(&self, records: &[TelemetryRecord], _cancel: &CancellationToken) -> bool {
        for record in records {
            println!(
                "{} successful={} elapsed_ms={}",
                record.name, record.successful, record.elapsed_ms
            );
        }
        true
    }
}

#[tokio::main]
async fn main() {
    let processor = taskforge::TaskProcessor::<u32>::new(
        ExecutorOptions::builder()
            .exporter(Arc::new(StdoutExporter))
            .build()
            .unwrap(),
    );

    let tasks = vec![
        TaskDefinition::new(
            "fetch-config",
            Arc::new(|_cancel| Box::pin(async { Ok(1u32) })) as TaskFactory<u32>,
        ),
        TaskDefinition::new(
            "fetch-secrets",
            Arc::new(|_cancel| Box::pin(async { Err(TaskFailure::new("vault unreachable")) }))
                as TaskFactory<u32>,
        ),
    ];

    let results = processor.run_batch(tasks, CancellationToken::new()).await.unwrap();
    println!("dispatched {} tasks", results.len());

    processor.export_telemetry().await;
}
