use crate::record::TelemetryRecord;
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Contract for pushing telemetry records to an external sink. Transport
/// details (file, HTTP, an observability pipeline) are not part of the core;
/// only this interface and the composite fan-out are.
#[async_trait]
pub trait TelemetryExporter: Send + Sync {
    /// A human-readable name for logs and diagnostics.
    fn name(&self) -> &str;

    /// Whether this exporter should currently be invoked. A disabled
    /// exporter is skipped by [`CompositeExporter`] without being dispatched.
    fn enabled(&self) -> bool {
        true
    }

    /// Exports a batch of records, returning whether the export succeeded.
    /// Exporter failures are logged and swallowed by the caller; they never
    /// propagate into task results.
    async fn export(&self, records: &[TelemetryRecord], cancel: &CancellationToken) -> bool;
}

/// Fans a single export call out to every enabled child exporter
/// concurrently. A slow or failing child does not block or cancel the
/// others; its failure is logged and folded into the composite's own
/// return value without aborting the fan-out.
pub struct CompositeExporter {
    children: Vec<Box<dyn TelemetryExporter>>,
}

impl CompositeExporter {
    /// Creates an empty composite.
    pub fn new() -> Self {
        Self { children: Vec::new() }
    }

    /// Adds a child exporter.
    pub fn add(mut self, exporter: impl TelemetryExporter + 'static) -> Self {
        self.children.push(Box::new(exporter));
        self
    }
}

impl Default for CompositeExporter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TelemetryExporter for CompositeExporter {
    fn name(&self) -> &str {
        "composite"
    }

    async fn export(&self, records: &[TelemetryRecord], cancel: &CancellationToken) -> bool {
        let calls = self
            .children
            .iter()
            .filter(|child| child.enabled())
            .map(|child| async move {
                let ok = child.export(records, cancel).await;
                if !ok {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(exporter = child.name(), "telemetry export failed");
                }
                ok
            });
        futures::future::join_all(calls).await.into_iter().all(|ok| ok)
    }
}

#[async_trait]
impl<E: TelemetryExporter + ?Sized> TelemetryExporter for Arc<E> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn enabled(&self) -> bool {
        (**self).enabled()
    }

    async fn export(&self, records: &[TelemetryRecord], cancel: &CancellationToken) -> bool {
        (**self).export(records, cancel).await
    }
}

/// An in-memory exporter used by tests to assert what would have been sent.
#[derive(Default)]
pub struct MemoryExporter {
    exported: std::sync::Mutex<Vec<TelemetryRecord>>,
}

impl MemoryExporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a clone of every record exported so far.
    pub fn exported(&self) -> Vec<TelemetryRecord> {
        self.exported
            .lock()
            .expect("memory exporter lock poisoned")
            .clone()
    }
}

#[async_trait]
impl TelemetryExporter for MemoryExporter {
    fn name(&self) -> &str {
        "memory"
    }

    async fn export(&self, records: &[TelemetryRecord], _cancel: &CancellationToken) -> bool {
        self.exported
            .lock()
            .expect("memory exporter lock poisoned")
            .extend_from_slice(records);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::SystemTime;

    #[tokio::test]
    async fn composite_fans_out_to_every_child() {
        let a = std::sync::Arc::new(MemoryExporter::new());
        let b = std::sync::Arc::new(MemoryExporter::new());

        let composite = CompositeExporter::new().add(Arc::clone(&a)).add(Arc::clone(&b));

        let record = TelemetryRecord::success("task-1", 10, SystemTime::now());
        let ok = composite.export(&[record], &CancellationToken::new()).await;

        assert!(ok);
        assert_eq!(a.exported().len(), 1);
        assert_eq!(b.exported().len(), 1);
    }

    #[tokio::test]
    async fn composite_reports_failure_but_still_runs_every_child() {
        struct FailingExporter(std::sync::Arc<MemoryExporter>);

        #[async_trait]
        impl TelemetryExporter for FailingExporter {
            fn name(&self) -> &str {
                "failing"
            }

            async fn export(&self, records: &[TelemetryRecord], cancel: &CancellationToken) -> bool {
                self.0.export(records, cancel).await;
                false
            }
        }

        let sink = std::sync::Arc::new(MemoryExporter::new());
        let composite = CompositeExporter::new()
            .add(FailingExporter(Arc::clone(&sink)))
            .add(Arc::clone(&sink));

        let record = TelemetryRecord::success("task-1", 10, SystemTime::now());
        let ok = composite.export(&[record], &CancellationToken::new()).await;

        assert!(!ok);
        assert_eq!(sink.exported().len(), 2);
    }

    #[tokio::test]
    async fn disabled_child_is_never_dispatched() {
        struct DisabledExporter(std::sync::Arc<MemoryExporter>);

        #[async_trait]
        impl TelemetryExporter for DisabledExporter {
            fn name(&self) -> &str {
                "disabled"
            }

            fn enabled(&self) -> bool {
                false
            }

            async fn export(&self, records: &[TelemetryRecord], cancel: &CancellationToken) -> bool {
                self.0.export(records, cancel).await
            }
        }

        let sink = std::sync::Arc::new(MemoryExporter::new());
        let composite = CompositeExporter::new().add(DisabledExporter(Arc::clone(&sink)));

        let record = TelemetryRecord::success("task-1", 10, SystemTime::now());
        composite.export(&[record], &CancellationToken::new()).await;

        assert!(sink.exported().is_empty());
    }
}
