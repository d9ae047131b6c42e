//! CLI argument definitions using clap derive API

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Stratum - apply versioned SQL migrations exactly once
#[derive(Parser, Debug)]
#[command(name = "stratum")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all commands
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to project directory
    #[arg(short = 'p', long, global = true, default_value = ".")]
    pub project_dir: String,

    /// Override config file path
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Override database path (also read from STRATUM_DATABASE)
    #[arg(short, long, global = true)]
    pub database: Option<String>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Apply pending migrations
    Run(RunArgs),

    /// Show the migrations the next run would apply, without applying them
    Check(CheckArgs),

    /// List the migration history recorded in the database
    History(HistoryArgs),
}

/// Arguments for the run command
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Versions to record as applied without running (comma-separated)
    #[arg(long)]
    pub patch_insert_on: Option<String>,

    /// Versions whose stored checksum is reset to the current script (comma-separated)
    #[arg(long)]
    pub patch_reset_checksum_on: Option<String>,

    /// Re-run changed migrations instead of failing on checksum mismatch
    #[arg(long)]
    pub skip_checksum: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub output: OutputFormat,
}

/// Arguments for the check command
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub output: OutputFormat,
}

/// Arguments for the history command
#[derive(Args, Debug)]
pub struct HistoryArgs {
    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub output: OutputFormat,
}

/// Output formats shared by all commands
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// JSON output
    Json,
}

#[cfg(test)]
#[path = "cli_test.rs"]
mod tests;
