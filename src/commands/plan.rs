//! `nbsync plan`: compare the manifests with tracked state
//!
//! Planning is offline. It works from the last known state, so run
//! `nbsync refresh` first to pick up changes made in NetBox.

use anyhow::{Context as _, Result};
use declarative::{ExecutionPlan, KindRegistry};

use crate::Context;
use crate::cli::PlanArgs;
use crate::engine;
use crate::manifest::Manifest;
use crate::resource;
use crate::state::StateFile;
use crate::ui;

pub fn run(ctx: &Context, args: PlanArgs) -> Result<()> {
    let settings = super::settings(ctx)?;
    let manifest = super::load_manifest(ctx, &settings)?;
    let state = StateFile::load(&super::state_path(ctx, &settings)?)?;
    let registry = resource::registry();

    let plan = build(&registry, &manifest, &state, args.target.as_deref())?;

    if args.json {
        let json =
            serde_json::to_string_pretty(&plan.diffs()).context("Failed to serialize plan")?;
        println!("{json}");
        return Ok(());
    }

    if !ctx.quiet {
        ui::header("Plan");
        ui::kv("Resources", &plan.total_resources().to_string());
    }
    engine::display_plan(&plan);
    Ok(())
}

/// Plan changes for the manifest against tracked state
pub fn build(
    registry: &KindRegistry,
    manifest: &Manifest,
    state: &StateFile,
    target: Option<&str>,
) -> Result<ExecutionPlan> {
    let plan = ExecutionPlan::build(registry, &manifest.resources, &state.resources)?;
    Ok(plan.filter_by_target(target))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::{MANIFEST, manifest};
    use declarative::{Action, Address, DeclaredResource, TrackedState};

    #[test]
    fn test_fresh_state_creates_everything() {
        let plan = build(
            &resource::registry(),
            &manifest(MANIFEST),
            &StateFile::default(),
            None,
        )
        .unwrap();
        let summary = plan.summary();
        assert_eq!(summary.additions, 3);
        assert_eq!(summary.removals, 0);
    }

    #[test]
    fn test_target_limits_plan() {
        let plan = build(
            &resource::registry(),
            &manifest(MANIFEST),
            &StateFile::default(),
            Some("sites"),
        )
        .unwrap();
        assert_eq!(plan.total_resources(), 2);

        let plan = build(
            &resource::registry(),
            &manifest(MANIFEST),
            &StateFile::default(),
            Some("site.paris"),
        )
        .unwrap();
        assert_eq!(plan.total_resources(), 1);
    }

    #[test]
    fn test_tracked_but_undeclared_is_deleted() {
        let mut state = StateFile::default();
        state.resources.insert(
            Address::new("site", "old"),
            TrackedState::new(
                9,
                DeclaredResource::new()
                    .with("name", "Old")
                    .with("slug", "old")
                    .with("status", "active"),
            ),
        );
        let plan = build(&resource::registry(), &manifest(""), &state, None).unwrap();
        let diffs = plan.diffs();
        assert_eq!(diffs.len(), 1);
        assert_eq!(diffs[0].action, Action::Delete);
    }

    #[test]
    fn test_invalid_manifest_fails_planning() {
        let bad = manifest("[site.x]\nname = \"X\"\nslug = \"not a slug\"\n");
        let err = build(&resource::registry(), &bad, &StateFile::default(), None).unwrap_err();
        assert!(err.to_string().contains("slug"));
    }
}
