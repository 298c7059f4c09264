//! Error types for NetBox API calls.
//!
//! Errors are categorized so callers can tell an absent object from a
//! rejected request or an unreachable server.

use declarative::RemoteError;
use std::fmt;

/// Result type alias for NetBox operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Categories of NetBox errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Server unreachable, timed out, or answered 5xx (transient).
    Network,
    /// The object does not exist.
    NotFound,
    /// The request was refused (4xx other than 404).
    Rejected,
    /// The response body could not be decoded.
    Format,
    /// Client configuration is invalid.
    Config,
}

impl ErrorCategory {
    /// Whether this error category is typically transient and worth retrying.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network)
    }

    /// Get a user-friendly description of this error category.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Network => "Network connectivity issue",
            Self::NotFound => "Object not found",
            Self::Rejected => "Request rejected by NetBox",
            Self::Format => "Invalid response format",
            Self::Config => "Invalid client configuration",
        }
    }

    /// Get actionable advice for resolving this error category.
    #[must_use]
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Network => "Check the server URL and your connection, then try again",
            Self::NotFound => "The object may have been deleted outside nbsync",
            Self::Rejected => "Check the API token permissions and the attribute values",
            Self::Format => "Check that the server is a supported NetBox version",
            Self::Config => "Set NETBOX_SERVER_URL and NETBOX_API_TOKEN or the config file",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors that can occur while talking to NetBox.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The server answered 404.
    #[error("object not found")]
    NotFound,

    /// HTTP request failed.
    #[error("HTTP request failed: {message}")]
    Http {
        /// Error message (server detail when available).
        message: String,
        /// HTTP status code if a response was received.
        status: Option<u16>,
    },

    /// Response body could not be decoded.
    #[error("invalid API response: {0}")]
    Decode(String),

    /// Client configuration is invalid.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Create an HTTP error.
    pub fn http(message: impl Into<String>, status: Option<u16>) -> Self {
        Self::Http {
            message: message.into(),
            status,
        }
    }

    /// Get the error category.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::NotFound => ErrorCategory::NotFound,
            Error::Http {
                status: Some(status),
                ..
            } if *status < 500 => ErrorCategory::Rejected,
            Error::Http { .. } => ErrorCategory::Network,
            Error::Decode(_) => ErrorCategory::Format,
            Error::InvalidConfig(_) => ErrorCategory::Config,
        }
    }

    /// Whether this error is typically transient and worth retrying.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.category().is_retryable()
    }
}

impl From<ureq::Error> for Error {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::StatusCode(404) => Self::NotFound,
            ureq::Error::StatusCode(code) => Self::Http {
                message: format!("HTTP {code}"),
                status: Some(code),
            },
            other => Self::Http {
                message: other.to_string(),
                status: None,
            },
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

impl From<Error> for RemoteError {
    fn from(err: Error) -> Self {
        match err {
            Error::NotFound => Self::NotFound,
            Error::Http {
                message,
                status: Some(status),
            } => Self::Rejected { status, message },
            Error::Http {
                message,
                status: None,
            } => Self::Unavailable(message),
            Error::Decode(message) => Self::Malformed(message),
            Error::InvalidConfig(message) => Self::Unavailable(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_category_retryable() {
        assert!(ErrorCategory::Network.is_retryable());
        assert!(!ErrorCategory::NotFound.is_retryable());
        assert!(!ErrorCategory::Rejected.is_retryable());
        assert!(!ErrorCategory::Format.is_retryable());
        assert!(!ErrorCategory::Config.is_retryable());
    }

    #[test]
    fn test_error_category_display() {
        let display = format!("{}", ErrorCategory::Network);
        assert!(display.contains("Network"));
    }

    #[test]
    fn test_http_category_by_status() {
        assert_eq!(
            Error::http("bad request", Some(400)).category(),
            ErrorCategory::Rejected
        );
        assert_eq!(
            Error::http("bad gateway", Some(502)).category(),
            ErrorCategory::Network
        );
        assert_eq!(
            Error::http("connection refused", None).category(),
            ErrorCategory::Network
        );
        assert!(Error::http("timeout", None).is_retryable());
    }

    #[test]
    fn test_from_ureq_status() {
        assert!(matches!(
            Error::from(ureq::Error::StatusCode(404)),
            Error::NotFound
        ));
        assert!(matches!(
            Error::from(ureq::Error::StatusCode(403)),
            Error::Http {
                status: Some(403),
                ..
            }
        ));
    }

    #[test]
    fn test_into_remote_error() {
        assert_eq!(RemoteError::from(Error::NotFound), RemoteError::NotFound);
        assert_eq!(
            RemoteError::from(Error::http("slug taken", Some(400))),
            RemoteError::Rejected {
                status: 400,
                message: "slug taken".into()
            }
        );
        assert!(matches!(
            RemoteError::from(Error::http("refused", None)),
            RemoteError::Unavailable(_)
        ));
        assert!(matches!(
            RemoteError::from(Error::Decode("eof".into())),
            RemoteError::Malformed(_)
        ));
    }
}
