//! The binary end to end with a manual metric

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use tempfile::TempDir;

const SETTINGS: &str = r#"
collector:
  request_timeout: 5s
storage:
  backend: memory
metrics:
  open_bugs:
    type: violations
    name: Open bugs
    target: "10"
    near_target: "20"
    sources:
      - id: triage
        type: manual_number
        parameters:
          number: "12"
"#;

fn command(dir: &TempDir, args: &[&str]) -> Command {
    let mut cmd = Command::cargo_bin("quality-collector").unwrap();
    cmd.arg("-c")
        .arg(dir.path().join("quality-collector.yaml"))
        .args(args)
        .env("QUALITY_COLLECTOR_STORE_DIR", dir.path().join("store"))
        .env_remove("QUALITY_COLLECTOR_MAX_CONCURRENCY")
        .env_remove("RUST_LOG");
    cmd
}

fn setup() -> TempDir {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("quality-collector.yaml"), SETTINGS).unwrap();
    dir
}

#[test]
fn test_collect_then_history() {
    let dir = setup();

    command(&dir, &["collect"])
        .assert()
        .success()
        .stdout(predicate::str::contains("open_bugs: near_target_met (value 12)"));

    command(&dir, &["collect", "--metric", "open_bugs"])
        .assert()
        .success()
        .stdout(predicate::str::contains("unchanged"));

    // The env override moved the store onto disk
    assert!(Path::new(&dir.path().join("store").join("measurements")).is_dir());

    let history = command(&dir, &["history", "--metric", "open_bugs"])
        .output()
        .unwrap();
    assert!(history.status.success(), "{history:?}");
    let stdout = String::from_utf8_lossy(&history.stdout).into_owned();
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 1, "{lines:?}");
    assert!(lines[0].starts_with('*'));
    assert!(lines[0].contains("near_target_met"));

    let json = command(&dir, &["history", "--metric", "open_bugs", "--json"])
        .output()
        .unwrap();
    let documents: serde_json::Value = serde_json::from_slice(&json.stdout).unwrap();
    assert_eq!(documents.as_array().unwrap().len(), 1);
    assert_eq!(documents[0]["metric_id"], "open_bugs");
}

#[test]
fn test_failures_map_to_exit_codes() {
    let dir = setup();
    command(&dir, &["collect"]).assert().success();

    command(
        &dir,
        &[
            "annotate", "--metric", "open_bugs", "--source", "nope", "--entity", "x", "--status",
            "confirmed",
        ],
    )
    .assert()
    .code(6)
    .stderr(predicate::str::contains("nope"));

    command(&dir, &["history", "--metric", "missing"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("missing"));
}

#[test]
fn test_missing_settings_file_is_a_config_error() {
    let dir = TempDir::new().unwrap();
    command(&dir, &["collect"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Configuration file not found"));
}
