//! Resource reconciler - Create/Read/Update/Delete/Import for any kind
//!
//! Every operation is synchronous and reports success only after the
//! authoritative remote response has been mapped back to attributes.
//! Nothing is persisted here; the caller owns tracked state.

use crate::context::ReconcileContext;
use crate::error::{Error, Result};
use crate::resource::AnyKind;
use crate::transport::RemoteError;
use crate::types::{DeclaredResource, Lifecycle, Operation, TrackedState};
use serde_json::Value as JsonValue;

/// Runs lifecycle operations against the context's transport
#[derive(Clone, Copy)]
pub struct Reconciler<'a> {
    ctx: ReconcileContext<'a>,
}

impl<'a> Reconciler<'a> {
    pub fn new(ctx: ReconcileContext<'a>) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &ReconcileContext<'a> {
        &self.ctx
    }

    /// Validate, map and create; no remote call is made if validation or
    /// reference resolution fails
    pub fn create(&self, kind: &dyn AnyKind, declared: &DeclaredResource) -> Result<TrackedState> {
        let payload = self.prepare(kind, declared)?;
        self.create_prepared(kind, &payload)
    }

    /// Validate, resolve references and encode without touching the remote
    ///
    /// Lets a caller finish every step that can fail locally before its
    /// first write, as replacement does before deleting the old object.
    pub fn prepare(&self, kind: &dyn AnyKind, declared: &DeclaredResource) -> Result<JsonValue> {
        let desired = kind.schema().validate(declared)?;
        kind.encode(&desired, &self.ctx.resolver())
    }

    /// Create from a payload returned by [`prepare`](Self::prepare)
    pub fn create_prepared(&self, kind: &dyn AnyKind, payload: &JsonValue) -> Result<TrackedState> {
        log::debug!("Creating {} via {}", kind.name(), kind.endpoint());
        let response = self
            .ctx
            .transport
            .create(kind.endpoint(), payload)
            .map_err(|source| write_error(kind, Operation::Create, None, source))?;

        let created_id = response.get("id").and_then(JsonValue::as_i64);
        let state = kind.decode(response).map_err(|e| match created_id {
            Some(id) => {
                log::warn!(
                    "Created {} {id} but could not map the response; import it to track it",
                    kind.name()
                );
                Error::Payload {
                    kind: kind.name().to_string(),
                    message: format!("created object {id} could not be mapped ({e}); import id {id} to track it"),
                }
            }
            None => e,
        })?;
        log::info!("Created {} {}", kind.name(), state.id);
        Ok(state)
    }

    /// Refresh tracked state from the remote
    ///
    /// An object that no longer exists yields [`Lifecycle::Unmanaged`] rather
    /// than an error. Other failures leave the caller's state untouched.
    pub fn read(&self, kind: &dyn AnyKind, state: &TrackedState) -> Result<Lifecycle> {
        self.fetch(kind, state.id, Operation::Read)
    }

    /// Adopt an existing object by id
    pub fn import(&self, kind: &dyn AnyKind, id: i64) -> Result<Lifecycle> {
        self.fetch(kind, id, Operation::Import)
    }

    /// Validate, map and update in place using the kind's update mode
    ///
    /// Unlike read and delete, a missing object is an error here: the
    /// declared intent cannot be satisfied.
    pub fn update(
        &self,
        kind: &dyn AnyKind,
        state: &TrackedState,
        declared: &DeclaredResource,
    ) -> Result<TrackedState> {
        let payload = self.prepare(kind, declared)?;
        let mode = kind.update_mode();

        log::debug!(
            "Updating {} {} ({} update)",
            kind.name(),
            state.id,
            mode
        );
        let response = self
            .ctx
            .transport
            .update(kind.endpoint(), state.id, &payload, mode)
            .map_err(|source| write_error(kind, Operation::Update, Some(state.id), source))?;

        let mut refreshed = kind.decode(response)?;
        refreshed.id = state.id;
        log::info!("Updated {} {}", kind.name(), state.id);
        Ok(refreshed)
    }

    /// Delete; an object that is already gone counts as deleted
    pub fn delete(&self, kind: &dyn AnyKind, state: &TrackedState) -> Result<()> {
        log::debug!("Deleting {} {}", kind.name(), state.id);
        match self.ctx.transport.delete(kind.endpoint(), state.id) {
            Ok(()) => {
                log::info!("Deleted {} {}", kind.name(), state.id);
                Ok(())
            }
            Err(RemoteError::NotFound) => {
                log::info!(
                    "{} {} was already deleted, treating as success",
                    kind.name(),
                    state.id
                );
                Ok(())
            }
            Err(source) => Err(write_error(kind, Operation::Delete, Some(state.id), source)),
        }
    }

    fn fetch(&self, kind: &dyn AnyKind, id: i64, operation: Operation) -> Result<Lifecycle> {
        log::debug!("Reading {} {} ({})", kind.name(), id, operation);
        match self.ctx.transport.get(kind.endpoint(), id) {
            Ok(response) => {
                let mut state = kind.decode(response)?;
                state.id = id;
                Ok(Lifecycle::Managed(state))
            }
            Err(RemoteError::NotFound) => {
                log::warn!("{} {} not found, no longer managed", kind.name(), id);
                Ok(Lifecycle::Unmanaged)
            }
            Err(source) => Err(Error::RemoteRead {
                kind: kind.name().to_string(),
                id,
                source,
            }),
        }
    }
}

fn write_error(
    kind: &dyn AnyKind,
    operation: Operation,
    id: Option<i64>,
    source: RemoteError,
) -> Error {
    Error::RemoteWrite {
        kind: kind.name().to_string(),
        operation,
        id,
        source,
    }
}
