//! NetBox REST API client.
//!
//! Provides a blocking [`Client`] for the handful of collections nbsync
//! manages, the wire [`models`] for those collections, and `MockNetbox`, an
//! in-memory stand-in for tests behind the `mock` feature. Both implement
//! [`declarative::Transport`], so the reconciliation engine never needs to
//! know which one it talks to.

pub mod client;
pub mod endpoint;
pub mod error;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod models;

pub use client::{Client, ClientConfig};
pub use error::{Error, ErrorCategory, Result};
#[cfg(any(test, feature = "mock"))]
pub use mock::MockNetbox;
