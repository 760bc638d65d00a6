//! Integration tests for `ecsforge synth`.

#![allow(clippy::expect_used)]

use predicates::prelude::*;
use serde_json::Value;

use crate::cli_tests::{ecsforge, workdir};

const BLUE_GREEN: &str = "\
foundation:
  blue_green:
    live: blue
services:
  - name: demo-service
    stack: EcsSvcStack
    image:
      source: registry
      tag: latest
    ingress:
      type: blue_green
";

fn read_json(path: &std::path::Path) -> Value {
    let text = std::fs::read_to_string(path).expect("read");
    assert!(text.ends_with('\n'), "{} lacks trailing newline", path.display());
    serde_json::from_str(&text).expect("valid JSON")
}

fn resources_of<'a>(template: &'a Value, ty: &'a str) -> impl Iterator<Item = (&'a String, &'a Value)> {
    template["Resources"]
        .as_object()
        .into_iter()
        .flatten()
        .filter(move |(_, r)| r["Type"] == ty)
}

#[test]
fn test_synth_writes_templates_and_manifest() {
    let dir = workdir();
    ecsforge(&dir)
        .arg("synth")
        .assert()
        .success()
        .stdout(predicate::str::contains("synthesized 2 stack(s)"));

    let out = dir.path().join("ecsforge.out");
    let manifest = read_json(&out.join("manifest.json"));
    assert_eq!(
        manifest["deployOrder"],
        serde_json::json!(["InfraStack", "EcsSvcStack"])
    );

    let infra = read_json(&out.join("InfraStack.template.json"));
    let service = read_json(&out.join("EcsSvcStack.template.json"));
    assert_eq!(resources_of(&infra, "AWS::ECS::Cluster").count(), 1);
    assert_eq!(resources_of(&infra, "AWS::KinesisFirehose::DeliveryStream").count(), 1);
    assert_eq!(resources_of(&service, "AWS::ECS::Service").count(), 1);
    assert_eq!(resources_of(&service, "AWS::ECS::Cluster").count(), 0);
}

#[test]
fn test_service_imports_foundation_exports() {
    let dir = workdir();
    ecsforge(&dir).arg("synth").assert().success();

    let out = dir.path().join("ecsforge.out");
    let infra = read_json(&out.join("InfraStack.template.json"));
    let service = read_json(&out.join("EcsSvcStack.template.json"));

    let exports: Vec<&str> = infra["Outputs"]
        .as_object()
        .expect("outputs")
        .values()
        .filter_map(|o| o["Export"]["Name"].as_str())
        .collect();
    let text = service.to_string();
    assert!(!exports.is_empty());
    assert!(
        exports.iter().any(|name| text.contains(name)),
        "no export of InfraStack is imported"
    );
}

#[test]
fn test_synth_custom_out_dir() {
    let dir = workdir();
    ecsforge(&dir)
        .args(["synth", "--out", "cdk.out", "--json"])
        .assert()
        .success();
    assert!(dir.path().join("cdk.out/manifest.json").exists());
}

#[test]
fn test_synth_over_existing_output_needs_confirmation() {
    let dir = workdir();
    ecsforge(&dir).arg("synth").assert().success();

    // No TTY to prompt on: refuses without --yes.
    ecsforge(&dir).arg("synth").assert().failure();

    ecsforge(&dir).args(["synth", "--yes"]).assert().success();
}

#[test]
fn test_synth_ci_env_skips_confirmation() {
    let dir = workdir();
    ecsforge(&dir).arg("synth").assert().success();
    ecsforge(&dir).env("CI", "1").arg("synth").assert().success();
}

#[test]
fn test_synth_blue_green_binds_production_to_live() {
    let dir = workdir();
    std::fs::write(dir.path().join("ecsforge.yaml"), BLUE_GREEN).expect("write");
    ecsforge(&dir)
        .args(["synth", "--live", "green"])
        .assert()
        .success();

    let infra = read_json(&dir.path().join("ecsforge.out/InfraStack.template.json"));
    let groups: Vec<(&String, &Value)> =
        resources_of(&infra, "AWS::ElasticLoadBalancingV2::TargetGroup").collect();
    assert_eq!(groups.len(), 2);
    let green = groups
        .iter()
        .find(|(id, _)| id.contains("Green"))
        .map(|(id, _)| id.as_str())
        .expect("green target group");

    let production = resources_of(&infra, "AWS::ElasticLoadBalancingV2::Listener")
        .find(|(id, _)| id.starts_with("bluegreenProductionListener"))
        .map(|(_, r)| r)
        .expect("production listener");
    assert_eq!(
        production["Properties"]["DefaultActions"][0]["TargetGroupArn"]["Ref"],
        green
    );
}

#[test]
fn test_synth_json_lists_written_files() {
    let dir = workdir();
    let output = ecsforge(&dir)
        .args(["synth", "--json"])
        .output()
        .expect("run");
    assert!(output.status.success());
    let json: Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(json["templates"].as_array().map(Vec::len), Some(2));
    assert_eq!(json["violations"].as_array().map(Vec::len), Some(0));
}
