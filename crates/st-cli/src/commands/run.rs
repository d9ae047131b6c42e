//! Run command implementation

use anyhow::{Context, Result};
use st_migrate::{MigrationReport, Outcome};

use crate::cli::{GlobalArgs, OutputFormat, RunArgs};
use crate::commands::common::{build_runner, load_config, print_json, print_table};

/// Execute the run command
pub(crate) fn execute(args: &RunArgs, global: &GlobalArgs) -> Result<()> {
    let (mut config, root) = load_config(global)?;

    if let Some(versions) = &args.patch_insert_on {
        config.set_patch_insert_on(versions);
    }
    if let Some(versions) = &args.patch_reset_checksum_on {
        config.set_patch_reset_checksum_on(versions);
    }
    if args.skip_checksum {
        config.skip_checksum = true;
    }

    let runner = build_runner(config, &root);
    let report = runner.run().context("Migration run failed")?;

    match args.output {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Table => print_report(&report, global.verbose),
    }
    Ok(())
}

fn print_report(report: &MigrationReport, verbose: bool) {
    if report.outcomes.is_empty() {
        println!("No migrations found");
        return;
    }

    let rows: Vec<Vec<String>> = report
        .outcomes
        .iter()
        .filter(|o| verbose || !matches!(o.outcome, Outcome::Skipped | Outcome::Baseline))
        .map(|o| {
            vec![
                o.version.clone(),
                o.kind.code().to_string(),
                o.outcome.to_string(),
                format!("{}ms", o.run_millis),
                o.location.clone(),
            ]
        })
        .collect();

    if !rows.is_empty() {
        print_table(&["VERSION", "TYPE", "OUTCOME", "TIME", "LOCATION"], &rows);
        println!();
    }

    let executed = report.executed().count();
    println!(
        "{} migration{} executed, {} patched, {} up to date",
        executed,
        if executed == 1 { "" } else { "s" },
        report.count(Outcome::PatchInserted) + report.count(Outcome::PatchReset),
        report.count(Outcome::Skipped) + report.count(Outcome::Baseline),
    );
}
