//! `nbsync import`: start tracking an existing NetBox object

use anyhow::{Result, anyhow, bail};
use declarative::{Address, KindRegistry, Lifecycle, TrackedState, Transport};

use crate::Context;
use crate::resource;
use crate::state::StateFile;
use crate::ui;

pub fn run(ctx: &Context, address: &str, id: i64) -> Result<()> {
    let settings = super::settings(ctx)?;
    let state_path = super::state_path(ctx, &settings)?;
    let client = super::connect(&settings)?;
    let mut state = super::open_state(&state_path, &client)?;

    let address: Address = address.parse().map_err(|e: String| anyhow!(e))?;
    let tracked = reconcile(&client, &resource::registry(), &mut state, &address, id)?;
    state.touch(&state_path)?;

    ui::success(&format!("Imported {address} (id {})", tracked.id));
    for (name, value) in tracked.attributes.iter() {
        ui::kv(name, &value.to_string());
    }
    if !ctx.quiet {
        ui::dim("Add a matching declaration to the manifest, or the next apply will delete it");
    }
    Ok(())
}

/// Read object `id` and track it under `address`
pub fn reconcile(
    transport: &dyn Transport,
    registry: &KindRegistry,
    state: &mut StateFile,
    address: &Address,
    id: i64,
) -> Result<TrackedState> {
    if id <= 0 {
        bail!("Object id must be positive, got {id}");
    }
    if let Some(existing) = state.resources.get(address) {
        bail!("{address} is already tracked (id {})", existing.id);
    }

    let kind = registry.get(&address.kind)?;
    let reconciler = super::reconciler(transport);
    match reconciler.import(kind, id)? {
        Lifecycle::Managed(tracked) => {
            state.resources.insert(address.clone(), tracked.clone());
            Ok(tracked)
        }
        Lifecycle::Unmanaged => bail!("No {} with id {id} exists in NetBox", address.kind),
    }
}
