//! The shared error taxonomy used across the classifier, retry, circuit breaker
//! and executor crates.

use std::fmt;

/// Category a task failure is classified into.
///
/// Every non-successful [`crate::events`]-adjacent outcome in the system carries
/// exactly one of these. Retryability is a pure function of the kind unless a
/// policy overrides it (see `taskforge-retry`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The operation was cancelled because a deadline elapsed (or a caller
    /// cancellation linked to a deadline fired).
    Timeout,
    /// Connection refused/reset, DNS failure, or other transport-layer error.
    Network,
    /// Authorization/authentication/permission failure.
    Auth,
    /// Malformed input, a forbidden null, or a format error.
    Validation,
    /// Out-of-memory, stack exhaustion, or another runtime-fatal condition.
    System,
    /// A domain/business rule violation, opted into explicitly by the task factory.
    Business,
    /// Anything that doesn't fit the above.
    Unknown,
}

impl ErrorKind {
    /// The default retryability for this kind, before any policy override.
    pub fn default_retryable(self) -> bool {
        matches!(
            self,
            ErrorKind::Network | ErrorKind::Timeout | ErrorKind::System | ErrorKind::Unknown
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Timeout => "Timeout",
            ErrorKind::Network => "Network",
            ErrorKind::Auth => "Auth",
            ErrorKind::Validation => "Validation",
            ErrorKind::System => "System",
            ErrorKind::Business => "Business",
            ErrorKind::Unknown => "Unknown",
        };
        f.write_str(s)
    }
}

/// The error a work unit factory raises.
///
/// Factories may optionally tag their own `kind` (the "opt-in" mechanism the
/// classifier uses for `Business` errors, and for any factory that knows its
/// own classification better than heuristic sniffing would). When no tag is
/// present, `taskforge-classifier` derives one from `source`.
#[derive(Debug)]
pub struct TaskFailure {
    message: String,
    kind: Option<ErrorKind>,
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl TaskFailure {
    /// Creates a failure with no explicit kind; the classifier will derive one.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: None,
            source: None,
        }
    }

    /// Creates a failure with an explicit kind, bypassing heuristic classification.
    pub fn with_kind(message: impl Into<String>, kind: ErrorKind) -> Self {
        Self {
            message: message.into(),
            kind: Some(kind),
            source: None,
        }
    }

    /// Attaches an underlying error for classifiers/loggers to inspect.
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// A convenience constructor for business-rule violations.
    pub fn business(message: impl Into<String>) -> Self {
        Self::with_kind(message, ErrorKind::Business)
    }

    /// The human-readable message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The explicit kind tag, if the factory set one.
    pub fn explicit_kind(&self) -> Option<ErrorKind> {
        self.kind
    }

    /// The underlying error, if one was attached.
    pub fn source(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        self.source.as_deref()
    }
}

impl fmt::Display for TaskFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for TaskFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_retryable_matches_taxonomy() {
        assert!(ErrorKind::Network.default_retryable());
        assert!(ErrorKind::Timeout.default_retryable());
        assert!(ErrorKind::System.default_retryable());
        assert!(ErrorKind::Unknown.default_retryable());
        assert!(!ErrorKind::Auth.default_retryable());
        assert!(!ErrorKind::Validation.default_retryable());
        assert!(!ErrorKind::Business.default_retryable());
    }

    #[test]
    fn business_helper_tags_kind() {
        let failure = TaskFailure::business("rule violated");
        assert_eq!(failure.explicit_kind(), Some(ErrorKind::Business));
        assert_eq!(failure.message(), "rule violated");
    }

    #[test]
    fn untagged_failure_has_no_explicit_kind() {
        let failure = TaskFailure::new("boom");
        assert_eq!(failure.explicit_kind(), None);
    }
}
