//! Transport abstraction over the remote inventory service.
//!
//! This allows the reconciler to run against a real HTTP client or an
//! in-memory double. Implementations must be safe to share across the
//! executor's worker threads.

use crate::types::UpdateMode;
use serde::Deserialize;
use serde_json::Value as JsonValue;

/// Result type alias for transport calls.
pub type RemoteResult<T> = std::result::Result<T, RemoteError>;

/// Failure reported by a transport.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    /// The object does not exist.
    #[error("object not found")]
    NotFound,

    /// The service answered with a non-success status.
    #[error("rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },

    /// The service could not be reached.
    #[error("service unavailable: {0}")]
    Unavailable(String),

    /// The response could not be understood.
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl From<serde_json::Error> for RemoteError {
    fn from(err: serde_json::Error) -> Self {
        Self::Malformed(err.to_string())
    }
}

/// One page of a filtered listing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListPage {
    /// Total number of matches; some servers omit it.
    #[serde(default)]
    pub count: Option<usize>,
    #[serde(default)]
    pub results: Vec<JsonValue>,
}

impl ListPage {
    /// Number of matches, falling back to the page length when no count was sent.
    pub fn matches(&self) -> usize {
        self.count.unwrap_or(0).max(self.results.len())
    }
}

/// Remote service operations, keyed by endpoint path (e.g. `dcim/sites`).
pub trait Transport: Send + Sync {
    /// Create an object and return the authoritative representation.
    fn create(&self, endpoint: &str, payload: &JsonValue) -> RemoteResult<JsonValue>;

    /// Fetch an object by id.
    fn get(&self, endpoint: &str, id: i64) -> RemoteResult<JsonValue>;

    /// Update an object and return the authoritative representation.
    fn update(
        &self,
        endpoint: &str,
        id: i64,
        payload: &JsonValue,
        mode: UpdateMode,
    ) -> RemoteResult<JsonValue>;

    /// Delete an object by id.
    fn delete(&self, endpoint: &str, id: i64) -> RemoteResult<()>;

    /// List objects matching equality filters, at most `limit` results.
    fn list(
        &self,
        endpoint: &str,
        filters: &[(&str, &str)],
        limit: usize,
    ) -> RemoteResult<ListPage>;
}
