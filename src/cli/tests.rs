//! Unit tests for CLI commands

use crate::cli::{Cli, Commands, EventArg};
use clap::Parser;
use std::path::Path;

#[test]
fn test_resolve_command_parses() {
    let cli = Cli::try_parse_from([
        "modroute",
        "--root",
        "webapp",
        "resolve",
        "--method",
        "post",
        "--path",
        "/items",
        "--content-type",
        "application/json",
    ])
    .unwrap();

    assert_eq!(cli.root.as_deref(), Some(Path::new("webapp")));
    match cli.command {
        Commands::Resolve {
            method,
            path,
            accept,
            content_type,
            error,
        } => {
            assert_eq!(method, "post");
            assert_eq!(path, "/items");
            assert!(accept.is_none());
            assert_eq!(content_type.as_deref(), Some("application/json"));
            assert!(error.is_none());
        }
        other => panic!("Expected Resolve command, got {:?}", other),
    }
}

#[test]
fn test_global_flags_after_subcommand() {
    let cli = Cli::try_parse_from(["modroute", "describe", "--config", "modroute.toml"]).unwrap();
    assert_eq!(cli.config.as_deref(), Some(Path::new("modroute.toml")));
    assert!(matches!(cli.command, Commands::Describe { compact: false }));
}

#[test]
fn test_ws_event_values() {
    let cli = Cli::try_parse_from(["modroute", "ws", "--path", "/chat", "--event", "connect"]).unwrap();
    assert!(matches!(
        cli.command,
        Commands::Ws {
            event: EventArg::Connect,
            ..
        }
    ));
    assert!(Cli::try_parse_from(["modroute", "ws", "--path", "/chat", "--event", "open"]).is_err());
}

#[test]
fn test_resolve_requires_path() {
    assert!(Cli::try_parse_from(["modroute", "resolve"]).is_err());
}

#[test]
fn test_all_commands_parse() {
    let commands = vec![
        vec!["modroute", "describe", "--compact"],
        vec!["modroute", "resolve", "--path", "/"],
        vec!["modroute", "checks", "--path", "/admin"],
        vec!["modroute", "ws", "--path", "/chat"],
        vec!["modroute", "watch"],
    ];
    for args in commands {
        assert!(Cli::try_parse_from(&args).is_ok(), "failed to parse {:?}", args);
    }
}

#[test]
fn test_root_overrides_config() {
    let cli = Cli::try_parse_from(["modroute", "--root", "/srv/modules", "watch"]).unwrap();
    let config = cli.dispatch_config().unwrap();
    assert_eq!(config.root(), Path::new("/srv/modules"));
    assert_eq!(config.parse_interval_ms, -1);
}

#[test]
fn test_repeated_rescan_failure_is_printed_once() {
    use crate::cli::commands::report_rescan;
    use crate::describe::ApiDescription;
    use crate::error::DispatchError;
    use std::path::PathBuf;

    let missing = || -> Result<ApiDescription, DispatchError> {
        Err(DispatchError::ConfigurationMissing {
            path: PathBuf::from("/srv/missing"),
        })
    };
    let mut last_failure = None;
    let mut out = Vec::new();
    report_rescan(missing(), &mut last_failure, &mut out).unwrap();
    report_rescan(missing(), &mut last_failure, &mut out).unwrap();
    let printed = String::from_utf8(out.clone()).unwrap();
    assert_eq!(printed.matches("Rescan failed").count(), 1);

    let other: Result<ApiDescription, DispatchError> = Err(DispatchError::ConfigurationMissing {
        path: PathBuf::from("/srv/other"),
    });
    report_rescan(other, &mut last_failure, &mut out).unwrap();
    report_rescan(missing(), &mut last_failure, &mut out).unwrap();
    let printed = String::from_utf8(out).unwrap();
    assert_eq!(printed.matches("Rescan failed").count(), 3);
}
