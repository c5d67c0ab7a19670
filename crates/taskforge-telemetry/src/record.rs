use std::time::SystemTime;
use taskforge_core::ErrorKind;

/// One finalized outcome: a single task's result, appended once the task
/// publishes its `TaskResult`.
#[derive(Debug, Clone)]
pub struct TelemetryRecord {
    pub name: String,
    pub elapsed_ms: u64,
    pub error_kind: Option<ErrorKind>,
    pub error_message: Option<String>,
    pub successful: bool,
    pub timestamp: SystemTime,
}

impl TelemetryRecord {
    /// Builds a record for a successful task.
    pub fn success(name: impl Into<String>, elapsed_ms: u64, timestamp: SystemTime) -> Self {
        Self {
            name: name.into(),
            elapsed_ms,
            error_kind: None,
            error_message: None,
            successful: true,
            timestamp,
        }
    }

    /// Builds a record for a failed task.
    pub fn failure(
        name: impl Into<String>,
        elapsed_ms: u64,
        kind: ErrorKind,
        message: impl Into<String>,
        timestamp: SystemTime,
    ) -> Self {
        Self {
            name: name.into(),
            elapsed_ms,
            error_kind: Some(kind),
            error_message: Some(message.into()),
            successful: false,
            timestamp,
        }
    }
}
