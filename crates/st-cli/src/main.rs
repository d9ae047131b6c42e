//! Stratum CLI - apply versioned SQL migrations to a database

use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;

use cli::Cli;
use commands::{check, history, run};

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.global.verbose);

    match &cli.command {
        cli::Commands::Run(args) => run::execute(args, &cli.global),
        cli::Commands::Check(args) => check::execute(args, &cli.global),
        cli::Commands::History(args) => history::execute(args, &cli.global),
    }
}

/// Initialise `env_logger`; `RUST_LOG` wins over `--verbose`.
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .format_target(false)
        .init();
}
