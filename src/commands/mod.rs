//! nbsync commands
//!
//! Commands that talk to NetBox keep their core logic generic over
//! [`Transport`] so it can run against a live [`Client`] or a mock.

pub mod apply;
pub mod destroy;
pub mod import;
pub mod plan;
pub mod refresh;
pub mod schema;
pub mod validate;

use anyhow::{Context as _, Result, bail};
use declarative::{
    ConfirmCallback, ExecuteOptions, ExecuteReport, ExecutionPlan, KindRegistry, ProgressCallback,
    ReconcileContext, Reconciler, Transport,
};
use netbox::{Client, endpoint};
use std::path::PathBuf;

use crate::Context;
use crate::config::Settings;
use crate::manifest::Manifest;
use crate::paths;
use crate::state::StateFile;

// ============================================================================
// Shared setup
// ============================================================================

/// Settings from config.toml, the environment and global flags
pub fn settings(ctx: &Context) -> Result<Settings> {
    Settings::resolve(&ctx.overrides)
}

/// Manifest path: `--manifest`, then `manifest` in config.toml
pub fn manifest_path(ctx: &Context, settings: &Settings) -> Result<PathBuf> {
    if let Some(path) = &ctx.manifest {
        return Ok(path.clone());
    }
    match settings.manifest.as_deref() {
        Some(path) => Ok(paths::expand(path)),
        None => bail!("No manifest given (use --manifest, NBSYNC_MANIFEST or `manifest` in config.toml)"),
    }
}

/// State path: `--state`, then `state_file` in config.toml, then the default
pub fn state_path(ctx: &Context, settings: &Settings) -> Result<PathBuf> {
    if let Some(path) = &ctx.state {
        return Ok(path.clone());
    }
    match settings.state_file.as_deref() {
        Some(path) => Ok(paths::expand(path)),
        None => StateFile::default_path(),
    }
}

pub fn load_manifest(ctx: &Context, settings: &Settings) -> Result<Manifest> {
    Manifest::load(&manifest_path(ctx, settings)?)
}

/// Connect to NetBox, checking its version unless told not to
pub fn connect(settings: &Settings) -> Result<Client> {
    let client = Client::new(&settings.client_config()?).context("Could not set up NetBox client")?;
    if settings.skip_version_check() {
        log::debug!("Skipping NetBox version check");
    } else {
        let version = client
            .check_version()
            .with_context(|| format!("Could not reach NetBox at {}", client.base_url()))?;
        log::info!("Connected to NetBox {version} at {}", client.base_url());
    }
    Ok(client)
}

/// Open the state file and bind it to the connected server
pub fn open_state(path: &std::path::Path, client: &Client) -> Result<StateFile> {
    let mut state = StateFile::load(path)?;
    state.check_server(client.base_url())?;
    Ok(state)
}

// ============================================================================
// Shared execution
// ============================================================================

/// Reconciler resolving tag names against NetBox
pub fn reconciler(transport: &dyn Transport) -> Reconciler<'_> {
    Reconciler::new(ReconcileContext::new(transport, endpoint::TAGS))
}

/// Execute a plan and record the outcomes in `state`
///
/// The caller decides whether to persist `state`.
pub fn execute_plan<P, C>(
    transport: &dyn Transport,
    registry: &KindRegistry,
    plan: &ExecutionPlan,
    state: &mut StateFile,
    jobs: usize,
    progress: &P,
    confirm: &mut C,
) -> Result<ExecuteReport>
where
    P: ProgressCallback,
    C: ConfirmCallback,
{
    let reconciler = reconciler(transport);
    let opts = ExecuteOptions {
        jobs,
        ..Default::default()
    };
    let report = declarative::execute(plan, registry, &reconciler, &opts, progress, confirm)?;
    report.apply_to(&mut state.resources);
    Ok(report)
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Overrides;

    fn ctx() -> Context {
        Context {
            verbose: 0,
            quiet: true,
            manifest: None,
            state: None,
            overrides: Overrides::default(),
        }
    }

    #[test]
    fn test_manifest_path_prefers_flag() {
        let mut ctx = ctx();
        ctx.manifest = Some(PathBuf::from("flag.toml"));
        let settings = Settings {
            manifest: Some("config.toml".into()),
            ..Default::default()
        };
        assert_eq!(
            manifest_path(&ctx, &settings).unwrap(),
            PathBuf::from("flag.toml")
        );
    }

    #[test]
    fn test_manifest_path_from_settings() {
        let settings = Settings {
            manifest: Some("/srv/netbox".into()),
            ..Default::default()
        };
        assert_eq!(
            manifest_path(&ctx(), &settings).unwrap(),
            PathBuf::from("/srv/netbox")
        );
    }

    #[test]
    fn test_manifest_path_missing_is_an_error() {
        let err = manifest_path(&ctx(), &Settings::default()).unwrap_err();
        assert!(err.to_string().contains("No manifest given"));
    }

    #[test]
    fn test_state_path_from_settings() {
        let settings = Settings {
            state_file: Some("/var/lib/nbsync/state.toml".into()),
            ..Default::default()
        };
        assert_eq!(
            state_path(&ctx(), &settings).unwrap(),
            PathBuf::from("/var/lib/nbsync/state.toml")
        );
    }

    #[test]
    fn test_connect_requires_server() {
        let err = connect(&Settings::default()).unwrap_err();
        assert!(err.to_string().contains("server URL is not set"));
    }
}
