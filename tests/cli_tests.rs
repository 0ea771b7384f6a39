//! CLI interface tests

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{Value, json};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write(dir: &TempDir, name: &str, content: &str) -> String {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path.to_str().unwrap().to_owned()
}

fn stdout_json(output: &[u8]) -> Value {
    serde_json::from_slice(output).unwrap()
}

const CONFIG: &str = r#"
id: demo
files:
  .gitignore:
    content: [target/]
    mergeStrategy: append
  owner.txt:
    content: "${REPOSYNC_TEST_OWNER:-nobody}"
settings:
  labels:
    bug: {color: d73a4a}
    enhancement: {color: a2eeef, newName: feature}
repos:
  - git: git@github.com:acme/one.git
    files:
      .gitignore:
        content: [.env]
"#;

#[test]
fn test_version_flag() {
    let mut cmd = Command::cargo_bin("reposync").unwrap();
    cmd.arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("reposync"));
}

#[test]
fn test_help_flag() {
    let mut cmd = Command::cargo_bin("reposync").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Declarative configuration sync"));
}

#[test]
fn test_resolve_prints_json() {
    let temp_dir = TempDir::new().unwrap();
    let config = write(&temp_dir, "reposync.yaml", CONFIG);

    let output = Command::cargo_bin("reposync")
        .unwrap()
        .args(["resolve", "--config", &config, "--format", "json"])
        .env_remove("REPOSYNC_TEST_OWNER")
        .output()
        .unwrap();
    assert!(output.status.success());

    let resolved = stdout_json(&output.stdout);
    assert_eq!(resolved["id"], json!("demo"));
    let files = &resolved["repos"][0]["files"];
    assert_eq!(files[0]["fileName"], json!(".gitignore"));
    assert_eq!(files[0]["content"], json!(["target/", ".env"]));
    assert_eq!(files[1]["content"], json!("nobody"));
}

#[test]
fn test_resolve_prints_yaml_by_default() {
    let temp_dir = TempDir::new().unwrap();
    let config = write(&temp_dir, "reposync.yaml", CONFIG);

    let mut cmd = Command::cargo_bin("reposync").unwrap();
    cmd.args(["resolve", "--config", &config])
        .env("REPOSYNC_TEST_OWNER", "platform")
        .assert()
        .success()
        .stdout(predicate::str::contains("id: demo"))
        .stdout(predicate::str::contains("platform"));
}

#[test]
fn test_missing_config_error() {
    let mut cmd = Command::cargo_bin("reposync").unwrap();
    cmd.args(["resolve", "--config", "nonexistent.yaml"])
        .assert()
        .failure()
        .code(1) // Configuration error
        .stderr(predicate::str::contains("Configuration file not found"));
}

#[test]
fn test_missing_variable_exit_code() {
    let temp_dir = TempDir::new().unwrap();
    let config = write(
        &temp_dir,
        "reposync.yaml",
        r#"
id: demo
files:
  token.txt:
    content: "${REPOSYNC_TEST_UNSET_TOKEN}"
repos:
  - git: git@github.com:acme/one.git
"#,
    );

    let mut cmd = Command::cargo_bin("reposync").unwrap();
    cmd.args(["resolve", "--config", &config])
        .env_remove("REPOSYNC_TEST_UNSET_TOKEN")
        .assert()
        .failure()
        .code(3)
        .stderr(predicate::str::contains("REPOSYNC_TEST_UNSET_TOKEN"));

    let mut lenient = Command::cargo_bin("reposync").unwrap();
    lenient
        .args(["resolve", "--config", &config, "--lenient"])
        .env_remove("REPOSYNC_TEST_UNSET_TOKEN")
        .assert()
        .success()
        .stdout(predicate::str::contains("${REPOSYNC_TEST_UNSET_TOKEN}"));
}

#[test]
fn test_diff_between_documents() {
    let temp_dir = TempDir::new().unwrap();
    let current = write(
        &temp_dir,
        "current.json",
        r#"{"id": 1, "rules": [{"type": "pull_request", "count": 1}, {"type": "required_signatures"}]}"#,
    );
    let desired = write(
        &temp_dir,
        "desired.yaml",
        "rules:\n  - type: pull_request\n    count: 2\n  - type: required_signatures\n",
    );

    let output = Command::cargo_bin("reposync")
        .unwrap()
        .args(["diff", "--current", &current, "--desired", &desired, "--ignore-key", "id"])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert_eq!(
        stdout_json(&output.stdout),
        json!([{
            "path": ["rules", "[0](pull_request)", "count"],
            "action": "change",
            "oldValue": 1,
            "newValue": 2
        }])
    );
}

#[test]
fn test_diff_missing_document() {
    let temp_dir = TempDir::new().unwrap();
    let desired = write(&temp_dir, "desired.json", "{}");
    let missing = Path::new("/definitely/not/here.json");

    let mut cmd = Command::cargo_bin("reposync").unwrap();
    cmd.args(["diff", "--current", missing.to_str().unwrap(), "--desired", &desired])
        .assert()
        .failure()
        .code(7);
}

#[test]
fn test_plan_against_state_file() {
    let temp_dir = TempDir::new().unwrap();
    let config = write(&temp_dir, "reposync.yaml", CONFIG);
    let state = write(
        &temp_dir,
        "state.yaml",
        r"
git@github.com:acme/one.git:
  labels:
    entities:
      - name: bug
        color: d73a4a
      - name: enhancement
        color: a2eeef
",
    );

    let output = Command::cargo_bin("reposync")
        .unwrap()
        .args(["plan", "--config", &config, "--state", &state])
        .output()
        .unwrap();
    assert!(output.status.success());

    let report = stdout_json(&output.stdout);
    let labels = &report["plans"][0]["labels"];
    assert_eq!(labels[0]["name"], json!("enhancement"));
    assert_eq!(labels[0]["action"], json!("update"));
    assert_eq!(labels[0]["renameTo"], json!("feature"));
    assert_eq!(labels[1]["action"], json!("unchanged"));
}

#[test]
fn test_plan_reports_rename_collision() {
    let temp_dir = TempDir::new().unwrap();
    let config = write(&temp_dir, "reposync.yaml", CONFIG);
    let state = write(
        &temp_dir,
        "state.yaml",
        r"
git@github.com:acme/one.git:
  labels:
    entities:
      - name: enhancement
        color: a2eeef
      - name: feature
        color: '000000'
",
    );

    let output = Command::cargo_bin("reposync")
        .unwrap()
        .args(["plan", "--config", &config, "--state", &state])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(6));

    let report = stdout_json(&output.stdout);
    assert_eq!(report["failures"][0]["repo"], json!("git@github.com:acme/one.git"));
    assert!(
        report["failures"][0]["message"]
            .as_str()
            .unwrap()
            .contains("feature")
    );
}
