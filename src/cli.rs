use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "nbsync")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Declarative NetBox inventory: keep sites, VMs and services in sync with TOML manifests", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Manifest file or directory of *.toml files
    #[arg(short, long, global = true, env = "NBSYNC_MANIFEST")]
    pub manifest: Option<PathBuf>,

    /// State file (default: ~/.local/state/nbsync/state.toml)
    #[arg(long, global = true, env = "NBSYNC_STATE")]
    pub state: Option<PathBuf>,

    #[command(flatten)]
    pub connection: ConnectionArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// NetBox connection overrides
#[derive(Args, Clone, Default)]
pub struct ConnectionArgs {
    /// NetBox server URL
    #[arg(long, global = true)]
    pub server: Option<String>,

    /// NetBox API token
    #[arg(long, global = true)]
    pub token: Option<String>,

    /// Accept invalid TLS certificates
    #[arg(long, global = true)]
    pub insecure: bool,

    /// Don't check the NetBox version before running
    #[arg(long, global = true)]
    pub skip_version_check: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Check manifests against the resource schemas (no network access)
    Validate,

    /// Show what apply would change
    Plan(PlanArgs),

    /// Create, update and delete remote objects to match the manifests
    Apply(ApplyArgs),

    /// Read tracked objects back from NetBox and report drift
    Refresh(RefreshArgs),

    /// Start tracking an existing NetBox object
    Import {
        /// Address to track it under, e.g. site.berlin
        address: String,

        /// NetBox object id
        id: i64,
    },

    /// Delete every tracked object from NetBox
    Destroy(DestroyArgs),

    /// Show resource kinds and their attributes
    Schema {
        /// Only this kind (site, virtual_machine, service)
        kind: Option<String>,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

// ============================================================================
// Command arguments
// ============================================================================

#[derive(Args)]
pub struct PlanArgs {
    /// Only resources matching a kind (site) or address (site.berlin)
    #[arg(short, long)]
    pub target: Option<String>,

    /// Print the plan as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct ApplyArgs {
    /// Only resources matching a kind (site) or address (site.berlin)
    #[arg(short, long)]
    pub target: Option<String>,

    /// Show the plan without changing anything
    #[arg(short, long)]
    pub dry_run: bool,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Number of resources reconciled in parallel
    #[arg(short, long, default_value = "4")]
    pub jobs: usize,
}

#[derive(Args)]
pub struct RefreshArgs {
    /// Only resources matching a kind (site) or address (site.berlin)
    #[arg(short, long)]
    pub target: Option<String>,

    /// Number of parallel reads
    #[arg(short, long, default_value = "4")]
    pub jobs: usize,
}

#[derive(Args)]
pub struct DestroyArgs {
    /// Only resources matching a kind (site) or address (site.berlin)
    #[arg(short, long)]
    pub target: Option<String>,

    /// Show what would be deleted without deleting it
    #[arg(short, long)]
    pub dry_run: bool,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Number of resources deleted in parallel
    #[arg(short, long, default_value = "4")]
    pub jobs: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_apply() {
        let cli = Cli::try_parse_from([
            "nbsync", "-vv", "--server", "https://nb", "apply", "-t", "site", "--yes", "-j", "8",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.connection.server.as_deref(), Some("https://nb"));
        let Command::Apply(args) = cli.command else {
            panic!("expected apply");
        };
        assert_eq!(args.target.as_deref(), Some("site"));
        assert!(args.yes);
        assert_eq!(args.jobs, 8);
    }

    #[test]
    fn test_parse_import() {
        let cli = Cli::try_parse_from(["nbsync", "import", "site.berlin", "12"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Import { ref address, id: 12 } if address == "site.berlin"
        ));
    }
}
