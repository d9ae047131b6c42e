//! Check command implementation

use anyhow::{Context, Result};

use crate::cli::{CheckArgs, GlobalArgs, OutputFormat};
use crate::commands::common::{build_runner, load_config, print_json, print_table};

/// Execute the check command
pub(crate) fn execute(args: &CheckArgs, global: &GlobalArgs) -> Result<()> {
    let (config, root) = load_config(global)?;
    let runner = build_runner(config, &root);
    let pending = runner
        .check_state()
        .context("Failed to check migration state")?;

    if args.output == OutputFormat::Json {
        return print_json(&pending);
    }

    if pending.is_empty() {
        println!("Database is up to date");
        return Ok(());
    }

    let rows: Vec<Vec<String>> = pending
        .iter()
        .map(|r| {
            vec![
                r.key().to_string(),
                r.kind.code().to_string(),
                r.comment.clone(),
                if r.non_transactional { "yes" } else { "" }.to_string(),
                r.location.clone(),
            ]
        })
        .collect();
    print_table(
        &["VERSION", "TYPE", "COMMENT", "NON-TX", "LOCATION"],
        &rows,
    );
    println!();
    println!(
        "{} pending migration{}",
        pending.len(),
        if pending.len() == 1 { "" } else { "s" }
    );
    Ok(())
}
