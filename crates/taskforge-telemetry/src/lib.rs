//! Telemetry aggregation for taskforge: an append-only per-task record log,
//! lazily-computed summaries and health checks, and the exporter contract for
//! pushing records to external sinks.

pub mod exporter;
pub mod health;
pub mod record;
pub mod store;
pub mod summary;

pub use exporter::{CompositeExporter, MemoryExporter, TelemetryExporter};
pub use health::{HealthCheckOptions, HealthCheckOptionsBuilder, HealthStatus};
pub use record::TelemetryRecord;
pub use store::TelemetryStore;
pub use summary::TelemetrySummary;
