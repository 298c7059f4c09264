//! Error types for reconciliation.
//!
//! Errors are categorized so callers can decide whether an outcome is fatal
//! for the run or only for one resource. The engine itself never retries.

use crate::transport::RemoteError;
use crate::types::Operation;
use std::fmt;

/// Result type alias for reconciliation operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Categories of reconciliation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Declared configuration is invalid. Nothing was sent.
    Validation,
    /// A symbolic reference could not be mapped to exactly one object.
    Reference,
    /// The object does not exist remotely.
    NotFound,
    /// The remote service rejected the call or could not be reached.
    Remote,
    /// Payload mapping or registry lookup failed.
    Internal,
}

impl ErrorCategory {
    /// Whether repeating the same call later may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Remote)
    }

    /// Get a user-friendly description of this error category.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Validation => "Invalid configuration",
            Self::Reference => "Unresolvable reference",
            Self::NotFound => "Object not found",
            Self::Remote => "Remote service error",
            Self::Internal => "Internal error",
        }
    }

    /// Get actionable advice for resolving this error category.
    #[must_use]
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Validation => "Fix the attribute in the manifest and run again",
            Self::Reference => "Make sure every referenced name exists exactly once",
            Self::NotFound => "Refresh state or import the object again",
            Self::Remote => "Check connectivity and credentials, then retry",
            Self::Internal => "Check the error details for more information",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors that can occur while reconciling a resource.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An attribute failed schema validation.
    #[error("{kind}.{attribute}: {constraint}")]
    Validation {
        /// Resource kind.
        kind: String,
        /// Offending attribute (or the attributes of a cross-field rule).
        attribute: String,
        /// Human-readable constraint that was violated.
        constraint: String,
    },

    /// No remote object matched a referenced name.
    #[error("no object found with name '{name}'")]
    UnresolvedReference { name: String },

    /// More than one remote object matched a referenced name.
    #[error("more than one object found with name '{name}'")]
    AmbiguousReference { name: String },

    /// A reference lookup could not be completed.
    #[error("reference lookup failed: {0}")]
    Transport(#[source] RemoteError),

    /// Reading an object failed for a reason other than absence.
    #[error("failed to read {kind} {id}: {source}")]
    RemoteRead {
        kind: String,
        id: i64,
        #[source]
        source: RemoteError,
    },

    /// A create, update or delete call failed.
    #[error("failed to {operation} {kind}{}: {source}", id.map(|i| format!(" {i}")).unwrap_or_default())]
    RemoteWrite {
        kind: String,
        operation: Operation,
        id: Option<i64>,
        #[source]
        source: RemoteError,
    },

    /// No resource kind is registered under this name.
    #[error("unknown resource kind '{0}'")]
    UnknownKind(String),

    /// The worker pool could not be started.
    #[error("failed to create thread pool: {0}")]
    ThreadPool(String),

    /// A payload could not be converted between the typed and JSON forms.
    #[error("{kind} payload: {message}")]
    Payload { kind: String, message: String },
}

impl Error {
    /// Create a validation error.
    pub fn validation(
        kind: impl Into<String>,
        attribute: impl Into<String>,
        constraint: impl Into<String>,
    ) -> Self {
        Self::Validation {
            kind: kind.into(),
            attribute: attribute.into(),
            constraint: constraint.into(),
        }
    }

    /// Get the error category.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Validation { .. } => ErrorCategory::Validation,
            Error::UnresolvedReference { .. } | Error::AmbiguousReference { .. } => {
                ErrorCategory::Reference
            }
            Error::Transport(_) => ErrorCategory::Remote,
            Error::RemoteRead { source, .. } | Error::RemoteWrite { source, .. } => {
                if matches!(source, RemoteError::NotFound) {
                    ErrorCategory::NotFound
                } else {
                    ErrorCategory::Remote
                }
            }
            Error::UnknownKind(_) | Error::ThreadPool(_) | Error::Payload { .. } => {
                ErrorCategory::Internal
            }
        }
    }

    /// Whether this error is typically transient.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.category().is_retryable()
    }
}
