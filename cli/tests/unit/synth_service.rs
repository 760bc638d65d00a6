//! Tests for the synthesis use-case through in-memory ports.

#![allow(clippy::expect_used)]

use ecsforge_cli::application::services::synth::{self, SynthOptions};
use ecsforge_cli::domain::config::{ForgeConfig, Layout};
use ecsforge_cli::domain::handles::Color;
use ecsforge_cli::domain::load_balancer::BlueGreenConfig;
use ecsforge_cli::domain::service::IngressConfig;

use crate::mocks::{RecordingReporter, RecordingWriter, StaticConfig};

fn blue_green(live: Color) -> ForgeConfig {
    let mut config = ForgeConfig::default();
    config.foundation.blue_green = Some(BlueGreenConfig {
        live,
        ..BlueGreenConfig::default()
    });
    config.services[0].ingress = IngressConfig::BlueGreen;
    config
}

#[test]
fn test_default_config_writes_foundation_before_service() {
    let store = StaticConfig::new(ForgeConfig::default());
    let writer = RecordingWriter::default();
    let reporter = RecordingReporter::default();

    let outcome = synth::synthesize(&store, &writer, &reporter, &SynthOptions::default())
        .expect("synthesize");

    assert!(outcome.plan.violations.is_empty(), "{:?}", outcome.plan.violations);
    assert_eq!(
        *writer.writes.borrow(),
        vec![vec!["InfraStack".to_string(), "EcsSvcStack".to_string()]]
    );
    assert_eq!(outcome.written.templates.len(), 2);
    assert!(
        outcome.written.templates[0].ends_with("InfraStack.template.json"),
        "{:?}",
        outcome.written.templates
    );
    assert_eq!(reporter.successes.borrow().len(), 1);
}

#[test]
fn test_combined_layout_writes_single_stack() {
    let mut config = ForgeConfig::default();
    config.layout = Layout::Combined;
    let store = StaticConfig::new(config);
    let writer = RecordingWriter::default();

    let outcome = synth::synthesize(
        &store,
        &writer,
        &RecordingReporter::default(),
        &SynthOptions::default(),
    )
    .expect("synthesize");

    assert_eq!(outcome.plan.assembly.stacks().len(), 1);
    assert!(outcome.plan.violations.is_empty(), "{:?}", outcome.plan.violations);
}

#[test]
fn test_live_override_applies_to_blue_green_topology() {
    let store = StaticConfig::new(blue_green(Color::Blue));
    let opts = SynthOptions {
        live: Some(Color::Green),
        ..SynthOptions::default()
    };

    let outcome = synth::synthesize(
        &store,
        &RecordingWriter::default(),
        &RecordingReporter::default(),
        &opts,
    )
    .expect("synthesize");

    let live = outcome
        .plan
        .config
        .foundation
        .blue_green
        .as_ref()
        .map(|bg| bg.live);
    assert_eq!(live, Some(Color::Green));
    assert!(outcome.plan.violations.is_empty(), "{:?}", outcome.plan.violations);
}

#[test]
fn test_live_without_blue_green_warns() {
    let store = StaticConfig::new(ForgeConfig::default());
    let reporter = RecordingReporter::default();

    synth::plan(&store, &reporter, Some(Color::Green)).expect("plan");

    let warnings = reporter.warnings.borrow();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].contains("--live"), "{warnings:?}");
}

#[test]
fn test_blue_green_without_topology_fails_before_writing() {
    let mut config = ForgeConfig::default();
    config.services[0].ingress = IngressConfig::BlueGreen;
    let store = StaticConfig::new(config);
    let writer = RecordingWriter::default();

    let err = synth::synthesize(
        &store,
        &writer,
        &RecordingReporter::default(),
        &SynthOptions::default(),
    )
    .expect_err("no blue/green topology");

    assert!(err.to_string().contains("no blue/green topology"), "{err}");
    assert!(writer.writes.borrow().is_empty());
}

#[test]
fn test_invalid_fargate_size_fails_before_writing() {
    let mut config = ForgeConfig::default();
    config.services[0].cpu = 256;
    config.services[0].memory = 4096;
    let store = StaticConfig::new(config);
    let writer = RecordingWriter::default();

    let err = synth::synthesize(
        &store,
        &writer,
        &RecordingReporter::default(),
        &SynthOptions::default(),
    )
    .expect_err("invalid size");

    assert!(err.to_string().contains("256 CPU units"), "{err}");
    assert!(writer.writes.borrow().is_empty());
}

#[test]
fn test_config_load_error_propagates() {
    let writer = RecordingWriter::default();
    let result = synth::synthesize(
        &StaticConfig::broken(),
        &writer,
        &RecordingReporter::default(),
        &SynthOptions::default(),
    );
    assert!(result.is_err());
    assert!(writer.writes.borrow().is_empty());
}

#[test]
fn test_expectations_follow_configuration() {
    let expected = synth::expectations(&blue_green(Color::Green));
    assert_eq!(expected.live, Color::Green);
    assert_eq!(
        synth::expectations(&ForgeConfig::default()).live,
        Color::Blue
    );
}
