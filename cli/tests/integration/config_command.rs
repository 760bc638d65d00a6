//! Integration tests for `ecsforge config`.

#![allow(clippy::expect_used)]

use predicates::prelude::*;

use crate::cli_tests::{ecsforge, workdir};

#[test]
fn test_config_show_prints_defaults_without_file() {
    let dir = workdir();
    ecsforge(&dir)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("InfraStack"))
        .stdout(predicate::str::contains("EcsSvcStack"));
}

#[test]
fn test_config_init_writes_loadable_file() {
    let dir = workdir();
    ecsforge(&dir)
        .args(["config", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote ecsforge.yaml"));

    let written = std::fs::read_to_string(dir.path().join("ecsforge.yaml")).expect("config file");
    assert!(written.contains("demo-service"), "{written}");

    ecsforge(&dir).arg("validate").assert().success();
}

#[test]
fn test_config_init_refuses_to_overwrite() {
    let dir = workdir();
    std::fs::write(dir.path().join("ecsforge.yaml"), "layout: combined\n").expect("write");
    ecsforge(&dir)
        .args(["config", "init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));

    ecsforge(&dir)
        .args(["config", "init", "--force"])
        .assert()
        .success();
    let written = std::fs::read_to_string(dir.path().join("ecsforge.yaml")).expect("config file");
    assert!(written.contains("layout: split"), "{written}");
}

#[test]
fn test_config_env_var_selects_file() {
    let dir = workdir();
    std::fs::write(dir.path().join("alt.yaml"), "layout: combined\n").expect("write");
    let output = ecsforge(&dir)
        .env("ECSFORGE_CONFIG", "alt.yaml")
        .args(["list", "--json"])
        .output()
        .expect("run");
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(json["stacks"].as_array().map(Vec::len), Some(1));
}

#[test]
fn test_config_flag_beats_env_var() {
    let dir = workdir();
    std::fs::write(dir.path().join("alt.yaml"), "layout: combined\n").expect("write");
    ecsforge(&dir)
        .env("ECSFORGE_CONFIG", "alt.yaml")
        .args(["list", "--json", "--config", "nope.yaml"])
        .assert()
        .failure();
}
