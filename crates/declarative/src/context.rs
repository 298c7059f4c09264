//! Reconcile context and callback traits
//!
//! These traits allow the declarative crate to be used without
//! depending on a specific terminal UI.

use crate::resolver::ReferenceResolver;
use crate::transport::Transport;
use crate::types::ApplyResult;

/// Everything a reconciler needs from its host
///
/// Passed explicitly rather than read from globals so tests can supply an
/// in-memory transport.
#[derive(Clone, Copy)]
pub struct ReconcileContext<'a> {
    /// Remote service
    pub transport: &'a dyn Transport,
    /// Endpoint that symbolic references (tag names) are resolved against
    pub reference_endpoint: &'a str,
}

impl<'a> ReconcileContext<'a> {
    pub fn new(transport: &'a dyn Transport, reference_endpoint: &'a str) -> Self {
        Self {
            transport,
            reference_endpoint,
        }
    }

    /// Resolver bound to this context's reference endpoint
    pub fn resolver(&self) -> ReferenceResolver<'a> {
        ReferenceResolver::new(self.transport, self.reference_endpoint)
    }
}

/// Progress callback for execution operations
///
/// Called from worker threads, so implementations must be thread-safe.
pub trait ProgressCallback: Send + Sync {
    /// Called before any change is applied
    fn on_batch_start(&self, count: usize);

    /// Called when starting to apply a single change
    fn on_resource_start(&self, address: &str, description: &str);

    /// Called when a change completes
    fn on_resource_complete(&self, address: &str, result: &ApplyResult);

    /// Called after every change completed
    fn on_batch_complete(&self);
}

/// Confirmation callback for user interaction
pub trait ConfirmCallback: Send {
    /// Ask the user to confirm an action; `true` to proceed
    fn confirm(&mut self, prompt: &str) -> bool;
}

/// No-op progress callback
pub struct NoProgress;

impl ProgressCallback for NoProgress {
    fn on_batch_start(&self, _count: usize) {}
    fn on_resource_start(&self, _address: &str, _description: &str) {}
    fn on_resource_complete(&self, _address: &str, _result: &ApplyResult) {}
    fn on_batch_complete(&self) {}
}

/// Auto-confirm callback (always returns true)
pub struct AutoConfirm;

impl ConfirmCallback for AutoConfirm {
    fn confirm(&mut self, _prompt: &str) -> bool {
        true
    }
}

/// Auto-decline callback (always returns false)
pub struct AutoDecline;

impl ConfirmCallback for AutoDecline {
    fn confirm(&mut self, _prompt: &str) -> bool {
        false
    }
}
