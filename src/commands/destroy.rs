//! `nbsync destroy`: delete tracked objects from NetBox

use anyhow::{Result, bail};
use declarative::{
    ConfirmCallback, ExecuteReport, ExecutionPlan, KindRegistry, ProgressCallback, Transport,
};

use crate::Context;
use crate::cli::DestroyArgs;
use crate::engine::{self, BarProgress, PromptConfirm};
use crate::resource;
use crate::state::StateFile;
use crate::ui;

pub fn run(ctx: &Context, args: DestroyArgs) -> Result<()> {
    if !ctx.quiet {
        ui::header("Destroying Tracked Resources");
    }
    let settings = super::settings(ctx)?;
    let state_path = super::state_path(ctx, &settings)?;
    let client = super::connect(&settings)?;
    let mut state = super::open_state(&state_path, &client)?;
    let registry = resource::registry();

    let plan = ExecutionPlan::destroy(&state.resources).filter_by_target(args.target.as_deref());
    engine::display_plan(&plan);

    if args.dry_run || !plan.has_changes() {
        return Ok(());
    }

    ui::warn("Objects will be deleted from NetBox");
    let progress = BarProgress::new("Destroying", ctx.quiet);
    let mut confirm = PromptConfirm { yes: args.yes };
    let report = reconcile(
        &client,
        &registry,
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
        bail!("{} resources failed to delete", report.summary.failed);
    }
    Ok(())
}

/// Delete tracked resources matching `target` and drop them from `state`
pub fn reconcile<P, C>(
    transport: &dyn Transport,
    registry: &KindRegistry,
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
    let plan = ExecutionPlan::destroy(&state.resources).filter_by_target(target);
    super::execute_plan(transport, registry, &plan, state, jobs, progress, confirm)
}
