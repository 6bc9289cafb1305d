use clap::Parser;
use std::path::PathBuf;

use qa_automator::cli::{Cli, Commands};

#[test]
fn test_parse_run_with_overrides() {
    let cli = Cli::try_parse_from([
        "qa-automator",
        "run",
        "--test-cases",
        "cases.json",
        "--tested",
        "tested.json",
        "--max-attempts",
        "3",
        "--dry-run",
        "--json",
    ])
    .unwrap();

    assert!(cli.json);
    assert_eq!(cli.project, PathBuf::from("."));
    match cli.command {
        Commands::Run(args) => {
            assert_eq!(args.input.test_cases, PathBuf::from("cases.json"));
            assert_eq!(args.input.tested, Some(PathBuf::from("tested.json")));
            assert_eq!(args.max_attempts, Some(3));
            assert!(args.dry_run);
            assert!(!args.fresh);
        }
        other => panic!("Wrong command: {other:?}"),
    }
}

#[test]
fn test_run_requires_test_cases() {
    assert!(Cli::try_parse_from(["qa-automator", "run"]).is_err());
}

#[test]
fn test_parse_memory_entry_and_project() {
    let cli = Cli::try_parse_from([
        "qa-automator",
        "-C",
        "/work/app",
        "memory",
        "--entry",
        "checkout::auth/login",
    ])
    .unwrap();

    assert_eq!(cli.project, PathBuf::from("/work/app"));
    match cli.command {
        Commands::Memory(args) => {
            assert_eq!(args.entry.as_deref(), Some("checkout::auth/login"));
            assert_eq!(args.limit, 50);
        }
        other => panic!("Wrong command: {other:?}"),
    }
}

#[test]
fn test_parse_status_and_init() {
    let cli = Cli::try_parse_from(["qa-automator", "status", "--problematic"]).unwrap();
    assert!(matches!(cli.command, Commands::Status(ref args) if args.problematic));

    let cli = Cli::try_parse_from(["qa-automator", "init", "--force"]).unwrap();
    assert!(matches!(cli.command, Commands::Init(ref args) if args.force));
}
