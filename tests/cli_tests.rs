use clap::Parser;
use modroute::cli::{run_cli, Cli};
use std::process::Command;

mod common;
use common::module_tree::ModuleTree;

const API: &str = r#"
declare %rest:path("/items/{$id}") %rest:GET %rest:produces("application/json")
  function local:item($id) { () };
declare %rest:error("err:*") function local:error($code) { () };
declare %perm:check("/items") function local:guard() { () };
declare %ws:message("/feed") function local:feed($msg) { () };
"#;

fn run(tree: &ModuleTree, args: &[&str]) -> anyhow::Result<String> {
    let root = tree.root().to_str().unwrap().to_string();
    let mut argv = vec!["modroute", "--root", root.as_str()];
    argv.extend_from_slice(args);
    let cli = Cli::try_parse_from(argv)?;
    let mut out = Vec::new();
    run_cli(cli, &mut out)?;
    Ok(String::from_utf8(out)?)
}

#[test]
fn test_resolve_prints_signature_and_bindings() {
    let tree = ModuleTree::with_files(&[("api.xqm", API)]);
    let out = run(&tree, &["resolve", "--path", "/items/42"]).unwrap();
    let mut lines = out.lines();
    assert!(lines.next().unwrap().starts_with("local:item($id) ["));
    assert_eq!(lines.next(), Some("  $id = 42"));
}

#[test]
fn test_resolve_error_code() {
    let tree = ModuleTree::with_files(&[("api.xqm", API)]);
    let out = run(&tree, &["resolve", "--path", "/x", "--error", "err:BOOM"]).unwrap();
    assert!(out.starts_with("local:error($code)"));
}

#[test]
fn test_resolve_no_match() {
    let tree = ModuleTree::with_files(&[("api.xqm", API)]);
    let out = run(&tree, &["resolve", "--path", "/items/1", "--accept", "text/html"]).unwrap();
    assert_eq!(out.trim(), "No function matches GET /items/1");
}

#[test]
fn test_checks_and_ws() {
    let tree = ModuleTree::with_files(&[("api.xqm", API)]);
    let out = run(&tree, &["checks", "--path", "/items/1"]).unwrap();
    assert!(out.starts_with("local:guard()"));
    let out = run(&tree, &["checks", "--path", "/other"]).unwrap();
    assert_eq!(out.trim(), "No permission checks for /other");

    let out = run(&tree, &["ws", "--path", "/feed"]).unwrap();
    assert!(out.starts_with("local:feed($msg)"));
}

#[test]
fn test_ambiguity_is_an_error() {
    let tree = ModuleTree::with_files(&[
        ("a.xqm", r#"declare %rest:path("/x") function local:a() { () };"#),
        ("b.xqm", r#"declare %rest:path("/x") function local:b() { () };"#),
    ]);
    let err = run(&tree, &["resolve", "--path", "/x"]).unwrap_err();
    assert!(err
        .to_string()
        .starts_with("Several functions assigned to path \"/x\":"));
}

#[test]
fn test_describe_binary_outputs_json() {
    let tree = ModuleTree::with_files(&[("api.xqm", API)]);
    let exe = env!("CARGO_BIN_EXE_modroute");
    let output = Command::new(exe)
        .env("MODROUTE_LOG_LEVEL", "error")
        .arg("--root")
        .arg(tree.root())
        .arg("describe")
        .arg("--compact")
        .output()
        .expect("run cli");
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["modules"], 1);
    assert_eq!(json["resources"][0]["path"], "/items/{$id}");
    assert_eq!(json["websockets"][0]["function"], "local:feed");
}

#[test]
fn test_binary_fails_on_missing_root() {
    let tree = ModuleTree::new();
    let exe = env!("CARGO_BIN_EXE_modroute");
    let output = Command::new(exe)
        .env("MODROUTE_LOG_LEVEL", "error")
        .arg("--root")
        .arg(tree.path("missing"))
        .arg("describe")
        .output()
        .expect("run cli");
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Module directory not found"));
}
