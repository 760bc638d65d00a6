//! Integration tests for the CLI surface: help, version, list, validate, traffic.

#![allow(clippy::expect_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

pub fn ecsforge(dir: &TempDir) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("ecsforge"));
    cmd.current_dir(dir.path())
        .env("NO_COLOR", "1")
        .env_remove("ECSFORGE_CONFIG")
        .env_remove("ECSFORGE_LOG")
        .env_remove("CI");
    cmd
}

pub fn workdir() -> TempDir {
    TempDir::new().expect("tempdir")
}

fn stdout_json(output: &std::process::Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).expect("stdout is JSON")
}

// --- Help and version tests ---

#[test]
fn test_cli_no_args_shows_help() {
    let dir = workdir();
    ecsforge(&dir)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("CloudFormation"));
}

#[test]
fn test_help_lists_commands() {
    let dir = workdir();
    ecsforge(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("synth"))
        .stdout(predicate::str::contains("validate"))
        .stdout(predicate::str::contains("traffic"));
}

#[test]
fn test_version_command_shows_version() {
    let dir = workdir();
    ecsforge(&dir)
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains(format!(
            "ecsforge {}",
            env!("CARGO_PKG_VERSION")
        )));
}

#[test]
fn test_version_command_json_outputs_valid_json() {
    let dir = workdir();
    let output = ecsforge(&dir)
        .args(["version", "--json"])
        .output()
        .expect("run");
    assert!(output.status.success());
    assert_eq!(stdout_json(&output)["version"], env!("CARGO_PKG_VERSION"));
}

// --- list ---

#[test]
fn test_list_shows_stacks_in_deployment_order() {
    let dir = workdir();
    let output = ecsforge(&dir).arg("list").output().expect("run");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let infra = stdout.find("InfraStack").expect("InfraStack listed");
    let svc = stdout.find("EcsSvcStack").expect("EcsSvcStack listed");
    assert!(infra < svc, "foundation must come first:\n{stdout}");
}

#[test]
fn test_list_json_reports_dependencies() {
    let dir = workdir();
    let output = ecsforge(&dir)
        .args(["list", "--json"])
        .output()
        .expect("run");
    assert!(output.status.success());
    let json = stdout_json(&output);
    let stacks = json["stacks"].as_array().expect("stacks array");
    assert_eq!(stacks.len(), 2);
    assert_eq!(stacks[0]["name"], "InfraStack");
    assert_eq!(stacks[1]["dependencies"][0], "InfraStack");
}

// --- validate ---

#[test]
fn test_validate_default_config_succeeds() {
    let dir = workdir();
    ecsforge(&dir)
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("all invariants hold"));
}

#[test]
fn test_validate_json_reports_valid() {
    let dir = workdir();
    let output = ecsforge(&dir)
        .args(["validate", "--json"])
        .output()
        .expect("run");
    assert!(output.status.success());
    let json = stdout_json(&output);
    assert_eq!(json["valid"], true);
    assert_eq!(json["violations"].as_array().map(Vec::len), Some(0));
}

#[test]
fn test_validate_invalid_config_fails() {
    let dir = workdir();
    std::fs::write(
        dir.path().join("ecsforge.yaml"),
        "services:\n  - name: Bad_Name\n",
    )
    .expect("write config");
    ecsforge(&dir)
        .arg("validate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid service name 'Bad_Name'"));
}

#[test]
fn test_unknown_config_field_is_rejected() {
    let dir = workdir();
    std::fs::write(dir.path().join("ecsforge.yaml"), "foundaton: {}\n").expect("write config");
    ecsforge(&dir)
        .arg("validate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot parse"));
}

#[test]
fn test_error_in_json_mode_is_json_object() {
    let dir = workdir();
    let output = ecsforge(&dir)
        .args(["list", "--json", "--config", "missing.yaml"])
        .output()
        .expect("run");
    assert!(!output.status.success());
    let json = stdout_json(&output);
    assert_eq!(json["error"], true);
    assert!(
        json["message"]
            .as_str()
            .is_some_and(|m| m.contains("does not exist")),
        "{json}"
    );
}

// --- traffic ---

#[test]
fn test_traffic_plan_from_blue_ends_green() {
    let dir = workdir();
    let output = ecsforge(&dir)
        .args(["traffic", "plan", "--from", "blue", "--json"])
        .output()
        .expect("run");
    assert!(output.status.success());
    let json = stdout_json(&output);
    let steps = json["steps"].as_array().expect("steps");
    assert_eq!(steps.len(), 3);
    assert_eq!(steps[0]["production"], "blue");
    assert_eq!(steps[1]["state"]["state"], "promoting");
    assert_eq!(steps[1]["production"], "blue");
    assert_eq!(steps[2]["production"], "green");
    assert_eq!(steps[2]["test"], "blue");
}

#[test]
fn test_traffic_plan_human_output() {
    let dir = workdir();
    ecsforge(&dir)
        .args(["traffic", "plan", "--from", "green"])
        .assert()
        .success()
        .stdout(predicate::str::contains("promoting green -> blue"));
}

#[test]
fn test_traffic_plan_rejects_unknown_color() {
    let dir = workdir();
    ecsforge(&dir)
        .args(["traffic", "plan", "--from", "red"])
        .assert()
        .code(2);
}
