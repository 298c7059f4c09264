mod cli;
mod commands;
mod config;
mod engine;
mod manifest;
mod paths;
mod progress;
mod resource;
mod state;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
    pub manifest: Option<PathBuf>,
    pub state: Option<PathBuf>,
    pub overrides: config::Overrides,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            ui::error(&format!("{err:#}"));
            if let Some(err) = err.downcast_ref::<declarative::Error>() {
                ui::dim(err.category().advice());
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
        manifest: cli.manifest,
        state: cli.state,
        overrides: config::Overrides {
            server_url: cli.connection.server,
            api_token: cli.connection.token,
            insecure: cli.connection.insecure,
            skip_version_check: cli.connection.skip_version_check,
        },
    };
    log::trace!("verbosity {}", ctx.verbose);

    match cli.command {
        Command::Validate => commands::validate::run(&ctx),
        Command::Plan(args) => commands::plan::run(&ctx, args),
        Command::Apply(args) => commands::apply::run(&ctx, args),
        Command::Refresh(args) => commands::refresh::run(&ctx, args),
        Command::Import { address, id } => commands::import::run(&ctx, &address, id),
        Command::Destroy(args) => commands::destroy::run(&ctx, args),
        Command::Schema { kind, json } => commands::schema::run(kind.as_deref(), json),
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "nbsync", &mut io::stdout());
            Ok(())
        }
    }
}
