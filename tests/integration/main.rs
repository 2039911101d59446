//! Integration tests for Topicmap
//!
//! These tests verify that ingest, the engine and the CLI work together.

use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;
use topicmap_core::{Edit, EntryPath, ExclusionSpec, RefId, Session, validate};
use topicmap_ingest::{EngineConfig, load_source};

const MANUAL_YAML: &str = r#"
title: Manual
metadata:
  product: widget
assets:
  diagram.png: diagram.png
blocks:
  - kind: paragraph
    text: Read this first.
  - kind: heading
    level: 1
    title: Setup
    anchor: setup
  - kind: paragraph
    text: Before you begin.
  - kind: heading
    level: 2
    title: Install
    anchor: install
  - kind: image
    asset: diagram.png
    alt: Wiring
  - kind: heading
    level: 3
    title: Verify
  - kind: paragraph
    text: Run the self test.
  - kind: heading
    level: 1
    title: Troubleshooting
  - kind: xref
    anchor: install
    text: reinstall
"#;

fn manual_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("manual.yaml"), MANUAL_YAML).unwrap();
    std::fs::write(dir.path().join("diagram.png"), b"png-bytes").unwrap();
    dir
}

fn topicmap(root: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_topicmap"))
        .arg("--root")
        .arg(root)
        .args(args)
        .output()
        .expect("Failed to execute topicmap")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

/// Test that the CLI can be invoked
#[test]
fn test_cli_invocation() {
    let output = Command::new(env!("CARGO_BIN_EXE_topicmap"))
        .arg("--help")
        .output()
        .expect("Failed to execute command");

    let stdout = stdout(&output);
    assert!(stdout.contains("topicmap"));
    assert!(stdout.contains("Turn heading-structured documents into editable topic maps"));
}

#[test]
fn test_pipeline_from_yaml() {
    let dir = manual_dir();
    let source = load_source(&dir.path().join("manual.yaml")).unwrap();
    let session = Session::import(&source, EngineConfig::default().import_options()).unwrap();
    let graph = session.current();

    let titles: Vec<_> = graph.entries.iter().map(|e| e.title.as_str()).collect();
    assert_eq!(titles, vec!["Manual", "Setup", "Troubleshooting"]);
    assert_eq!(graph.assets["diagram.png"], b"png-bytes".to_vec());
    assert_eq!(graph.metadata["product"], "widget");
    assert!(validate::check(graph).is_empty());

    let trouble = &graph.documents[&RefId::from("troubleshooting")];
    assert_eq!(trouble.cross_refs().collect::<Vec<_>>(), vec![&RefId::from("install")]);
}

#[test]
fn test_filter_edit_undo_cycle() {
    let dir = manual_dir();
    let source = load_source(&dir.path().join("manual.yaml")).unwrap();
    let mut session = Session::import(&source, EngineConfig::default().import_options()).unwrap();
    let pristine = session.pristine().clone();

    session.commit_filter(ExclusionSpec::new().with_max_depth(1)).unwrap();
    assert_eq!(session.current().container_count(), 0);
    assert!(validate::check(session.current()).is_empty());

    // Install collapsed into Setup, so the reference follows it there.
    let trouble = &session.current().documents[&RefId::from("troubleshooting")];
    let target = trouble.cross_refs().next().unwrap().clone();
    assert!(session.current().documents.contains_key(&target));

    session
        .apply(&Edit::Rename {
            path: EntryPath(vec![2]),
            title: "Help".to_string(),
        })
        .unwrap();
    session.undo();
    session.undo();
    assert_eq!(session.current(), &pristine);
}

#[test]
fn test_cli_session_across_invocations() {
    let dir = manual_dir();
    let root = dir.path();

    let import = topicmap(root, &["import", root.join("manual.yaml").to_str().unwrap()]);
    assert!(import.status.success(), "{}", String::from_utf8_lossy(&import.stderr));
    assert!(root.join(".topicmap").join("session.bin").exists());

    let preview = topicmap(root, &["filter", "--max-depth", "1"]);
    assert!(preview.status.success());
    assert!(stdout(&preview).contains("preview only"));

    let show = topicmap(root, &["show"]);
    assert!(stdout(&show).contains("Verify"));

    let rename = topicmap(root, &["rename", "3", "Help"]);
    assert!(rename.status.success());
    assert!(stdout(&topicmap(root, &["show"])).contains("Help"));

    let undo = topicmap(root, &["undo"]);
    assert!(stdout(&undo).contains("undid rename 3"));
    assert!(stdout(&topicmap(root, &["show"])).contains("Troubleshooting"));

    let stats = topicmap(root, &["stats", "--json"]);
    let value: serde_json::Value = serde_json::from_slice(&stats.stdout).unwrap();
    assert_eq!(value["counts"]["Heading3"], 1);

    let out = root.join("out");
    assert!(topicmap(root, &["export", out.to_str().unwrap()]).status.success());
    assert!(out.join("structure.json").exists());
    assert_eq!(std::fs::read(out.join("assets").join("diagram.png")).unwrap(), b"png-bytes");

    assert!(topicmap(root, &["clear"]).status.success());
    assert!(!topicmap(root, &["show"]).status.success());
}

#[test]
fn test_cli_filters_replace_each_other() {
    let dir = manual_dir();
    let root = dir.path();
    assert!(topicmap(root, &["import", root.join("manual.yaml").to_str().unwrap()]).status.success());

    assert!(topicmap(root, &["filter", "--max-depth", "1", "--commit"]).status.success());
    assert!(!stdout(&topicmap(root, &["show"])).contains("Install"));

    assert!(topicmap(root, &["filter", "--max-depth", "2", "--commit"]).status.success());
    let show = stdout(&topicmap(root, &["show"]));
    assert!(show.contains("filter to depth 2"));
    assert!(show.contains("Install"));
    assert!(!show.contains("Verify"));
}

#[test]
fn test_config_drives_default_filter() {
    let dir = manual_dir();
    std::fs::write(dir.path().join("topicmap.toml"), "[filter]\nexclude = [\"Heading3\"]\n").unwrap();
    let config = EngineConfig::load(dir.path()).unwrap();

    let source = load_source(&dir.path().join("manual.yaml")).unwrap();
    let session = Session::import(&source, config.import_options()).unwrap();
    let report = session.preview(&config.exclusion_spec()).unwrap();

    assert!(report.graph.path_of(&RefId::from("verify")).is_none());
    assert_eq!(report.redirects[&RefId::from("verify")], Some(RefId::from("install")));
}
