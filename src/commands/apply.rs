//! `nbsync apply`: make NetBox match the manifests

use anyhow::{Result, bail};
use declarative::{ConfirmCallback, ExecuteReport, KindRegistry, ProgressCallback, Transport};

use crate::Context;
use crate::cli::ApplyArgs;
use crate::engine::{self, BarProgress, PromptConfirm};
use crate::manifest::Manifest;
use crate::resource;
use crate::state::StateFile;
use crate::ui;

pub fn run(ctx: &Context, args: ApplyArgs) -> Result<()> {
    if !ctx.quiet {
        ui::header("Applying Manifests");
    }
    if args.dry_run {
        ui::warn("Dry run - no changes will be made");
    }

    let settings = super::settings(ctx)?;
    let manifest = super::load_manifest(ctx, &settings)?;
    let state_path = super::state_path(ctx, &settings)?;
    let registry = resource::registry();

    let client = super::connect(&settings)?;
    let mut state = super::open_state(&state_path, &client)?;

    let plan = super::plan::build(&registry, &manifest, &state, args.target.as_deref())?;
    engine::display_plan(&plan);

    if args.dry_run || !plan.has_changes() {
        return Ok(());
    }

    let progress = BarProgress::new("Applying", ctx.quiet);
    let mut confirm = PromptConfirm { yes: args.yes };
    let report = reconcile(
        &client,
        &registry,
        &manifest,
        &mut state,
        args.target.as_deref(),
        args.jobs,
        &progress,
        &mut confirm,
    )?;

    if !report.outcomes.is_empty() {
        state.touch(&state_path)?;
    }

    engine::print_failures(&report);
    engine::print_summary(&report.summary);

    if report.summary.failed > 0 {
        bail!("{} resources failed to apply", report.summary.failed);
    }
    Ok(())
}

/// Plan against `state`, execute, and record the results in `state`
#[allow(clippy::too_many_arguments)]
pub fn reconcile<P, C>(
    transport: &dyn Transport,
    registry: &KindRegistry,
    manifest: &Manifest,
    state: &mut StateFile,
    target: Option<&str>,
    jobs: usize,
    progress: &P,
    confirm: &mut C,
) -> Result<ExecuteReport>
where
    P: ProgressCallback,
    C: ConfirmCallback,
{
    let plan = super::plan::build(registry, manifest, state, target)?;
    super::execute_plan(transport, registry, &plan, state, jobs, progress, confirm)
}
