//! `nbsync refresh`: read tracked objects back from NetBox

use anyhow::Result;
use declarative::{Address, KindRegistry, Lifecycle, RefreshOutcome, TrackedState, Transport};
use std::collections::BTreeMap;

use crate::Context;
use crate::cli::RefreshArgs;
use crate::engine;
use crate::resource;
use crate::state::StateFile;
use crate::ui;

pub fn run(ctx: &Context, args: RefreshArgs) -> Result<()> {
    let settings = super::settings(ctx)?;
    let state_path = super::state_path(ctx, &settings)?;
    let client = super::connect(&settings)?;
    let mut state = super::open_state(&state_path, &client)?;

    if state.resources.is_empty() {
        ui::info("Nothing is tracked yet");
        return Ok(());
    }

    let outcomes = reconcile(
        &client,
        &resource::registry(),
        &mut state,
        args.target.as_deref(),
        args.jobs,
    )?;
    state.touch(&state_path)?;

    engine::display_refresh(&outcomes);

    let gone = outcomes.iter().filter(|o| o.is_gone()).count();
    let drifted = outcomes.iter().filter(|o| !o.drift.is_empty()).count();
    let failed = outcomes.iter().filter(|o| o.result.is_err()).count();
    if gone > 0 {
        ui::warn(&format!("{gone} resources no longer exist and were dropped from state"));
    }
    if drifted > 0 {
        ui::info(&format!("{drifted} resources drifted; run `nbsync plan` to see the fix"));
    }
    if failed > 0 {
        anyhow::bail!("{failed} resources could not be read");
    }
    Ok(())
}

/// Re-read tracked resources matching `target` and update `state`
///
/// Objects that are gone are dropped from state. A failed read leaves the
/// previous state in place.
pub fn reconcile(
    transport: &dyn Transport,
    registry: &KindRegistry,
    state: &mut StateFile,
    target: Option<&str>,
    jobs: usize,
) -> Result<Vec<RefreshOutcome>> {
    let tracked: BTreeMap<Address, TrackedState> = state
        .resources
        .iter()
        .filter(|(address, _)| declarative::matches_target(address, target))
        .map(|(address, tracked)| (address.clone(), tracked.clone()))
        .collect();

    let reconciler = super::reconciler(transport);
    let outcomes = declarative::refresh(&tracked, registry, &reconciler, jobs)?;

    for outcome in &outcomes {
        match &outcome.result {
            Ok(Lifecycle::Managed(fresh)) => {
                state.resources.insert(outcome.address.clone(), fresh.clone());
            }
            Ok(Lifecycle::Unmanaged) => {
                log::info!("{} is gone from NetBox", outcome.address);
                state.resources.remove(&outcome.address);
            }
            Err(e) => log::warn!("{}: {}", outcome.address, e),
        }
    }
    Ok(outcomes)
}
