//! History command implementation

use anyhow::{Context, Result};

use crate::cli::{GlobalArgs, HistoryArgs, OutputFormat};
use crate::commands::common::{build_runner, load_config, print_json, print_table};

/// Execute the history command
pub(crate) fn execute(args: &HistoryArgs, global: &GlobalArgs) -> Result<()> {
    let (config, root) = load_config(global)?;
    let table = config.qualified_table();
    let runner = build_runner(config, &root);
    let rows = runner
        .history()
        .with_context(|| format!("Failed to read migration history from {table}"))?;

    if args.output == OutputFormat::Json {
        return print_json(&rows);
    }

    if rows.is_empty() {
        println!("No migrations recorded in {table}");
        return Ok(());
    }

    let table_rows: Vec<Vec<String>> = rows
        .iter()
        .map(|r| {
            vec![
                r.id.to_string(),
                r.kind.code().to_string(),
                r.version.clone(),
                r.comment.clone(),
                r.checksum.to_string(),
                r.ran_on.format("%Y-%m-%d %H:%M:%S").to_string(),
                r.ran_by.clone(),
                format!("{}ms", r.run_millis),
            ]
        })
        .collect();
    print_table(
        &[
            "ID", "TYPE", "VERSION", "COMMENT", "CHECKSUM", "RAN ON", "RAN BY", "TIME",
        ],
        &table_rows,
    );
    Ok(())
}
