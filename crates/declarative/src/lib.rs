//! # Declarative
//!
//! A framework for declarative resource reconciliation against a remote API.
//!
//! An operator declares the objects that should exist. This crate validates
//! the declarations, maps them to wire payloads, creates, reads, updates,
//! imports and deletes the remote objects, and reads them back so drift and
//! out-of-band deletion are detected on the next run.
//!
//! ## Core Concepts
//!
//! - **ResourceKind**: Per-kind schema and attribute mapping (the only code a new kind needs)
//! - **Schema**: Attribute presence, defaults, constraints and replacement rules
//! - **ReferenceResolver**: Maps symbolic names to exactly one remote identifier
//! - **Reconciler**: Create/Read/Update/Delete/Import, written once for every kind
//! - **ExecutionPlan**: Pairs declared resources with tracked state
//! - **Executor**: Applies a plan with parallelism across independent resources
//!
//! ## Example
//!
//! ```ignore
//! use declarative::{
//!     AutoConfirm, ExecuteOptions, ExecutionPlan, KindRegistry, NoProgress,
//!     ReconcileContext, Reconciler, execute,
//! };
//!
//! let registry = KindRegistry::new().with::<Site>();
//! let reconciler = Reconciler::new(ReconcileContext::new(&client, "extras/tags"));
//!
//! let plan = ExecutionPlan::build(&registry, &declared, &tracked)?;
//! let report = execute(
//!     &plan,
//!     &registry,
//!     &reconciler,
//!     &ExecuteOptions::default(),
//!     &NoProgress,
//!     &mut AutoConfirm,
//! )?;
//! report.apply_to(&mut tracked);
//! ```
//!
//! ## Provider Traits
//!
//! The crate uses traits for dependency injection:
//!
//! - [`Transport`]: The remote service (HTTP client or in-memory double)
//! - [`ProgressCallback`]: Receives progress updates
//! - [`ConfirmCallback`]: Handles user confirmations
//!
//! This allows the crate to be used without hard dependencies on a specific
//! HTTP client or terminal UI.

pub mod context;
pub mod diff;
pub mod error;
pub mod executor;
pub mod planner;
pub mod reconciler;
pub mod resolver;
pub mod resource;
pub mod schema;
pub mod transport;
pub mod types;

#[cfg(test)]
mod testing;

// Re-export main types at crate root
pub use context::{
    AutoConfirm, AutoDecline, ConfirmCallback, NoProgress, ProgressCallback, ReconcileContext,
};
pub use diff::{Action, DiffSummary, ResourceDiff, diff};
pub use error::{Error, ErrorCategory, Result};
pub use executor::{ChangeOutcome, ExecuteReport, RefreshOutcome, execute, refresh};
pub use planner::{ExecutionPlan, PlannedChange, matches_target};
pub use reconciler::Reconciler;
pub use resolver::{ReferenceResolver, ResolvedReference};
pub use resource::{AnyKind, BoxedKind, Erased, KindRegistry, ResourceKind};
pub use schema::{AttrType, AttributeSchema, Constraint, Presence, Rule, Schema, SchemaRegistry};
pub use transport::{ListPage, RemoteError, RemoteResult, Transport};
pub use types::{
    Address, ApplyResult, DeclaredResource, ExecuteOptions, ExecuteSummary, Lifecycle, Operation,
    TrackedState, UpdateMode, Value,
};
