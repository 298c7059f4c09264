//! Execution engine - applies planned changes with parallelism
//!
//! Independent resources run on a rayon pool; the calls for any single
//! resource are made sequentially by one worker.

use crate::context::{ConfirmCallback, ProgressCallback};
use crate::diff::Action;
use crate::error::{Error, Result};
use crate::planner::{ExecutionPlan, PlannedChange};
use crate::reconciler::Reconciler;
use crate::resource::{AnyKind, KindRegistry};
use crate::types::{
    Address, ApplyResult, DeclaredResource, ExecuteOptions, ExecuteSummary, Lifecycle, TrackedState,
};
use rayon::prelude::*;
use std::collections::BTreeMap;

/// Outcome of one planned change
#[derive(Debug, Clone)]
pub struct ChangeOutcome {
    pub address: Address,
    pub result: ApplyResult,
    /// Tracked state after the change; `None` when the object is gone
    pub state: Option<TrackedState>,
}

/// Everything an execution produced
#[derive(Debug, Clone, Default)]
pub struct ExecuteReport {
    pub summary: ExecuteSummary,
    pub outcomes: Vec<ChangeOutcome>,
}

impl ExecuteReport {
    /// Write outcomes back into a tracked-state map
    pub fn apply_to(&self, tracked: &mut BTreeMap<Address, TrackedState>) {
        for outcome in &self.outcomes {
            match &outcome.state {
                Some(state) => {
                    tracked.insert(outcome.address.clone(), state.clone());
                }
                None => {
                    tracked.remove(&outcome.address);
                }
            }
        }
    }
}

/// Execute a plan with the given options and callbacks
///
/// Failures are per resource: one failed change never stops the others, and
/// a failed change keeps its previous tracked state.
pub fn execute<P, C>(
    plan: &ExecutionPlan,
    registry: &KindRegistry,
    reconciler: &Reconciler<'_>,
    opts: &ExecuteOptions,
    progress: &P,
    confirm: &mut C,
) -> Result<ExecuteReport>
where
    P: ProgressCallback,
    C: ConfirmCallback,
{
    let pending: Vec<&PlannedChange> = plan
        .changes
        .iter()
        .filter(|c| c.action.is_change())
        .collect();

    if pending.is_empty() {
        return Ok(ExecuteReport::default());
    }

    if opts.dry_run {
        return Ok(ExecuteReport::default());
    }

    if !confirm.confirm("Apply changes?") {
        return Ok(ExecuteReport {
            summary: ExecuteSummary {
                skipped: pending.len(),
                ..Default::default()
            },
            outcomes: Vec::new(),
        });
    }

    // Resolve kinds up front so an unknown kind fails before any call is made
    let work: Vec<(&PlannedChange, &dyn AnyKind)> = pending
        .into_iter()
        .map(|c| Ok((c, registry.get(&c.address.kind)?)))
        .collect::<Result<_>>()?;

    progress.on_batch_start(work.len());

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(opts.jobs.max(1))
        .build()
        .map_err(|e| Error::ThreadPool(e.to_string()))?;

    let outcomes: Vec<ChangeOutcome> = pool.install(|| {
        work.par_iter()
            .map(|(change, kind)| {
                let address = change.address.to_string();
                progress.on_resource_start(&address, &change.action.to_string());
                let outcome = apply_change(change, *kind, reconciler);
                progress.on_resource_complete(&address, &outcome.result);
                outcome
            })
            .collect()
    });

    progress.on_batch_complete();

    let mut summary = ExecuteSummary::default();
    for outcome in &outcomes {
        summary.add_result(&outcome.result);
    }

    Ok(ExecuteReport { summary, outcomes })
}

/// Apply a single change
fn apply_change(
    change: &PlannedChange,
    kind: &dyn AnyKind,
    reconciler: &Reconciler<'_>,
) -> ChangeOutcome {
    let previous = change.tracked.clone();
    let outcome = |result: ApplyResult, state: Option<TrackedState>| ChangeOutcome {
        address: change.address.clone(),
        result,
        state,
    };
    let failed = |e: Error, state: Option<TrackedState>| {
        log::warn!("{}: {}", change.address, e);
        outcome(
            ApplyResult::Failed {
                error: e.to_string(),
            },
            state,
        )
    };

    match (&change.action, &change.declared, &change.tracked) {
        (Action::Create, Some(declared), _) => match reconciler.create(kind, declared) {
            Ok(state) => outcome(ApplyResult::Created, Some(state)),
            Err(e) => failed(e, previous),
        },
        (Action::Update { .. }, Some(declared), Some(tracked)) => {
            match reconciler.update(kind, tracked, declared) {
                Ok(state) => outcome(ApplyResult::Modified, Some(state)),
                Err(e) => failed(e, previous),
            }
        }
        (Action::Replace { .. }, Some(declared), Some(tracked)) => {
            // Validation and reference lookups finish before the old object is touched
            let payload = match reconciler.prepare(kind, declared) {
                Ok(payload) => payload,
                Err(e) => return failed(e, previous),
            };
            if let Err(e) = reconciler.delete(kind, tracked) {
                return failed(e, previous);
            }
            match reconciler.create_prepared(kind, &payload) {
                Ok(state) => outcome(ApplyResult::Replaced, Some(state)),
                // The old object is gone either way
                Err(e) => failed(e, None),
            }
        }
        (Action::Delete, _, Some(tracked)) => match reconciler.delete(kind, tracked) {
            Ok(()) => outcome(ApplyResult::Removed, None),
            Err(e) => failed(e, previous),
        },
        (Action::NoChange, _, _) => outcome(ApplyResult::NoChange, previous),
        (action, _, _) => outcome(
            ApplyResult::Skipped {
                reason: format!("{action} is missing its inputs"),
            },
            previous,
        ),
    }
}

/// Result of refreshing one tracked resource
#[derive(Debug)]
pub struct RefreshOutcome {
    pub address: Address,
    pub result: Result<Lifecycle>,
    /// Attributes that differ from the previously tracked values
    pub drift: Vec<String>,
}

impl RefreshOutcome {
    /// Whether the object disappeared remotely
    pub fn is_gone(&self) -> bool {
        matches!(self.result, Ok(Lifecycle::Unmanaged))
    }
}

/// Read every tracked resource back from the remote
pub fn refresh(
    tracked: &BTreeMap<Address, TrackedState>,
    registry: &KindRegistry,
    reconciler: &Reconciler<'_>,
    jobs: usize,
) -> Result<Vec<RefreshOutcome>> {
    let work: Vec<(&Address, &TrackedState, &dyn AnyKind)> = tracked
        .iter()
        .map(|(address, state)| Ok((address, state, registry.get(&address.kind)?)))
        .collect::<Result<_>>()?;

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs.max(1))
        .build()
        .map_err(|e| Error::ThreadPool(e.to_string()))?;

    Ok(pool.install(|| {
        work.par_iter()
            .map(|(address, state, kind)| {
                let result = reconciler.read(*kind, state);
                let drift = match &result {
                    Ok(Lifecycle::Managed(fresh)) => drifted(&state.attributes, &fresh.attributes),
                    _ => Vec::new(),
                };
                if !drift.is_empty() {
                    log::info!("{address} drifted: {}", drift.join(", "));
                }
                RefreshOutcome {
                    address: (*address).clone(),
                    result,
                    drift,
                }
            })
            .collect()
    }))
}

fn drifted(before: &DeclaredResource, after: &DeclaredResource) -> Vec<String> {
    let mut names: Vec<String> = before
        .iter()
        .chain(after.iter())
        .map(|(name, _)| name.clone())
        .filter(|name| before.get(name) != after.get(name))
        .collect();
    names.sort();
    names.dedup();
    names
}
