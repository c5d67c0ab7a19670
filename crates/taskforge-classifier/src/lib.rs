//! Failure classification for the executor's retry and circuit-breaker decisions.
//!
//! This crate provides the [`FailureClassifier`] trait and implementations for
//! mapping a raised [`TaskFailure`] to an [`ErrorKind`].

use std::sync::Arc;
use taskforge_core::{ErrorKind, TaskFailure};

/// Classifies a [`TaskFailure`] into an [`ErrorKind`].
///
/// Implementors determine which kind a given failure should be counted as,
/// which in turn drives default retryability and circuit-breaker accounting.
pub trait FailureClassifier: Send + Sync {
    /// Returns the kind this failure should be classified as.
    fn classify(&self, failure: &TaskFailure) -> ErrorKind;

    /// Returns whether a failure of the given kind should be retried by default.
    ///
    /// Overridable independently of `classify` so a policy can retry a kind
    /// the default taxonomy marks non-retryable (or vice versa).
    fn is_retryable(&self, kind: ErrorKind) -> bool {
        kind.default_retryable()
    }
}

/// The default [`FailureClassifier`].
///
/// Honors an explicit [`ErrorKind`] tag on the [`TaskFailure`] (the "opt-in"
/// mechanism factories use for `Business` errors). When no tag is present,
/// falls back to inspecting the attached source error, then the message text.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultClassifier;

impl FailureClassifier for DefaultClassifier {
    fn classify(&self, failure: &TaskFailure) -> ErrorKind {
        if let Some(kind) = failure.explicit_kind() {
            return kind;
        }

        if let Some(kind) = failure.source().and_then(classify_source) {
            return kind;
        }

        classify_message(failure.message())
    }
}

fn classify_source(source: &(dyn std::error::Error + Send + Sync + 'static)) -> Option<ErrorKind> {
    let io_error = source.downcast_ref::<std::io::Error>()?;
    Some(match io_error.kind() {
        std::io::ErrorKind::TimedOut => ErrorKind::Timeout,
        std::io::ErrorKind::ConnectionRefused
        | std::io::ErrorKind::ConnectionReset
        | std::io::ErrorKind::ConnectionAborted
        | std::io::ErrorKind::NotConnected
        | std::io::ErrorKind::BrokenPipe
        | std::io::ErrorKind::AddrNotAvailable
        | std::io::ErrorKind::AddrInUse => ErrorKind::Network,
        std::io::ErrorKind::PermissionDenied => ErrorKind::Auth,
        std::io::ErrorKind::InvalidInput | std::io::ErrorKind::InvalidData => {
            ErrorKind::Validation
        }
        std::io::ErrorKind::OutOfMemory => ErrorKind::System,
        _ => return None,
    })
}

fn classify_message(message: &str) -> ErrorKind {
    let lower = message.to_ascii_lowercase();

    const TIMEOUT: &[&str] = &["timeout", "timed out", "deadline exceeded"];
    const NETWORK: &[&str] = &["connection", "network", "dns", "unreachable", "reset by peer"];
    const AUTH: &[&str] = &["unauthorized", "forbidden", "permission denied", "authentication"];
    const VALIDATION: &[&str] = &["invalid", "malformed", "validation", "required field"];
    const SYSTEM: &[&str] = &["out of memory", "stack overflow", "panic", "fatal"];

    if TIMEOUT.iter().any(|s| lower.contains(s)) {
        ErrorKind::Timeout
    } else if NETWORK.iter().any(|s| lower.contains(s)) {
        ErrorKind::Network
    } else if AUTH.iter().any(|s| lower.contains(s)) {
        ErrorKind::Auth
    } else if VALIDATION.iter().any(|s| lower.contains(s)) {
        ErrorKind::Validation
    } else if SYSTEM.iter().any(|s| lower.contains(s)) {
        ErrorKind::System
    } else {
        ErrorKind::Unknown
    }
}

/// A failure classifier backed by a closure.
///
/// Allows custom classification logic while still deferring to the default
/// retryability-by-kind table unless the caller overrides it too.
#[derive(Clone)]
pub struct FnClassifier<F> {
    f: Arc<F>,
}

impl<F> FnClassifier<F>
where
    F: Fn(&TaskFailure) -> ErrorKind + Send + Sync,
{
    /// Creates a new `FnClassifier` from the given closure.
    pub fn new(f: F) -> Self {
        Self { f: Arc::new(f) }
    }
}

impl<F> FailureClassifier for FnClassifier<F>
where
    F: Fn(&TaskFailure) -> ErrorKind + Send + Sync,
{
    fn classify(&self, failure: &TaskFailure) -> ErrorKind {
        (self.f)(failure)
    }
}

impl<F> std::fmt::Debug for FnClassifier<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnClassifier")
            .field("f", &"<closure>")
            .finish()
    }
}
