use super::*;
use clap::CommandFactory;

#[test]
fn verify_cli_args() {
    // Validates the entire command tree: short flag conflicts,
    // duplicate args, and other clap definition errors.
    Cli::command().debug_assert();
}

#[test]
fn test_parse_run_with_patches() {
    let cli = Cli::try_parse_from([
        "stratum",
        "-p",
        "project",
        "run",
        "--patch-insert-on",
        "1.0,1.1",
        "--skip-checksum",
    ])
    .unwrap();

    assert_eq!(cli.global.project_dir, "project");
    match cli.command {
        Commands::Run(args) => {
            assert_eq!(args.patch_insert_on.as_deref(), Some("1.0,1.1"));
            assert!(args.skip_checksum);
            assert_eq!(args.output, OutputFormat::Table);
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn test_global_flags_after_subcommand() {
    let cli = Cli::try_parse_from(["stratum", "check", "--output", "json", "-v", "-d", "app.duckdb"])
        .unwrap();
    assert!(cli.global.verbose);
    assert_eq!(cli.global.database.as_deref(), Some("app.duckdb"));
    assert!(matches!(
        cli.command,
        Commands::Check(CheckArgs {
            output: OutputFormat::Json
        })
    ));
}
