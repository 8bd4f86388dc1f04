mod cli;
mod commands;
mod config;
mod engine;
mod interrupt;
mod paths;
mod progress;
mod resource;
mod state;
#[cfg(test)]
mod testutil;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use declarative::CancelToken;
use cli::{Cli, Command, StateCommand};
use std::io;
use std::path::PathBuf;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
    pub config_path: PathBuf,
    /// Endpoint from `--endpoint` or `DRIFTWOOD_ENDPOINT`
    pub endpoint: Option<String>,
    /// Token from `--token` or `DRIFTWOOD_TOKEN`
    pub token: Option<String>,
    /// Cancelled on Ctrl-C while objects are being changed
    pub cancel: CancelToken,
}

fn main() -> Result<()> {
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

    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
        config_path: paths::expand(&cli.config.to_string_lossy()),
        endpoint: cli.endpoint,
        token: cli.token,
        cancel: CancelToken::new(),
    };

    if matches!(cli.command, Command::Apply(_) | Command::Destroy(_)) {
        interrupt::cancel_on_interrupt(ctx.cancel.clone())?;
    }

    match cli.command {
        Command::Plan(args) => commands::plan::run(&ctx, args.target.as_deref()),
        Command::Apply(args) => commands::apply::apply(&ctx, &args),
        Command::Refresh(args) => commands::refresh::run(&ctx, args.target.as_deref()),
        Command::Import { address, id } => commands::import::run(&ctx, &address, &id),
        Command::Destroy(args) => commands::apply::destroy(&ctx, &args),
        Command::State(cmd) => match cmd {
            StateCommand::List => commands::state::list(&ctx),
            StateCommand::Show { address } => commands::state::show(&ctx, &address),
            StateCommand::Rm { address } => commands::state::rm(&ctx, &address),
        },
        Command::Schema { resource_type } => commands::schema::run(resource_type.as_deref()),
        Command::Validate => commands::validate::run(&ctx),
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "driftwood", &mut io::stdout());
            Ok(())
        }
    }
}
