//! Property-based tests for composition determinism and validation.
//!
//! Uses `proptest` to verify invariants across many random inputs.

#![allow(clippy::expect_used)]

use proptest::prelude::*;

use ecsforge_cli::domain::config::{ForgeConfig, Layout};
use ecsforge_cli::domain::handles::Color;
use ecsforge_cli::domain::service::{ServiceConfig, is_valid_fargate_size, validate_service_name};
use ecsforge_cli::domain::traffic::TrafficState;
use ecsforge_cli::domain::{compose, verify};
use ecsforge_common::logical_id::is_valid_logical_id;

fn service_name() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9]{0,12}".prop_filter("clashes with the foundation stack", |n| n != "infra")
}

fn config_with(names: &[String], layout: Layout) -> ForgeConfig {
    let template = ForgeConfig::default().services.remove(0);
    ForgeConfig {
        layout,
        services: names
            .iter()
            .map(|name| ServiceConfig {
                name: name.clone(),
                stack: None,
                ..template.clone()
            })
            .collect(),
        ..ForgeConfig::default()
    }
}

// ============================================================================
// compose() properties
// ============================================================================

proptest! {
    /// Composing the same configuration twice yields identical templates.
    #[test]
    fn prop_compose_is_deterministic(name in service_name(), combined in any::<bool>()) {
        let layout = if combined { Layout::Combined } else { Layout::Split };
        let config = config_with(&[name], layout);
        let first = compose(&config).expect("compose");
        let second = compose(&config).expect("compose");
        prop_assert_eq!(first.stacks(), second.stacks());
    }

    /// Every logical ID in every template is acceptable to CloudFormation.
    #[test]
    fn prop_logical_ids_are_valid(name in service_name()) {
        let assembly = compose(&config_with(&[name], Layout::Split)).expect("compose");
        for stack in assembly.stacks() {
            for id in stack.template.resources.keys() {
                prop_assert!(is_valid_logical_id(id), "{}: {}", stack.name, id);
            }
        }
    }

    /// Two services on one foundation keep every invariant.
    #[test]
    fn prop_two_services_keep_invariants(
        a in service_name(),
        b in service_name(),
    ) {
        prop_assume!(a != b);
        let assembly = compose(&config_with(&[a, b], Layout::Split)).expect("compose");
        prop_assert_eq!(assembly.stacks().len(), 3);
        prop_assert_eq!(&assembly.stacks()[0].name, "InfraStack");
        let violations = verify(&assembly);
        prop_assert!(violations.is_empty(), "{:?}", violations);
    }
}

// ============================================================================
// validation properties
// ============================================================================

proptest! {
    /// Lowercase alphanumeric names are valid service names.
    #[test]
    fn prop_lowercase_names_are_valid(name in service_name()) {
        prop_assert!(validate_service_name(&name).is_ok());
    }

    /// Any uppercase letter makes a service name invalid.
    #[test]
    fn prop_uppercase_names_are_rejected(name in "[a-z]{0,5}[A-Z][a-z]{0,5}") {
        prop_assert!(validate_service_name(&name).is_err());
    }

    /// 256 CPU units only pair with 512, 1024 or 2048 MiB.
    #[test]
    fn prop_quarter_vcpu_memory_is_restricted(memory in 0u32..10_000) {
        let expected = matches!(memory, 512 | 1024 | 2048);
        prop_assert_eq!(is_valid_fargate_size(256, memory), expected);
    }
}

#[test]
fn test_leading_or_trailing_hyphen_is_rejected() {
    assert!(validate_service_name("-web").is_err());
    assert!(validate_service_name("web-").is_err());
    assert!(validate_service_name("web-api").is_ok());
}

// ============================================================================
// traffic state machine properties
// ============================================================================

#[derive(Debug, Clone, Copy)]
enum Event {
    Begin,
    Complete,
    Abort,
}

fn event() -> impl Strategy<Value = Event> {
    prop_oneof![Just(Event::Begin), Just(Event::Complete), Just(Event::Abort)]
}

proptest! {
    /// Production and test listeners never point at the same color, and a
    /// rejected event leaves the state unchanged.
    #[test]
    fn prop_bindings_always_split(
        live in prop_oneof![Just(Color::Blue), Just(Color::Green)],
        events in proptest::collection::vec(event(), 0..20),
    ) {
        let mut state = TrafficState::active(live);
        for e in events {
            let next = match e {
                Event::Begin => state.begin_promotion(),
                Event::Complete => state.complete(),
                Event::Abort => state.abort(),
            };
            if let Ok(next) = next {
                state = next;
            }
            let (production, test) = state.bindings();
            prop_assert_ne!(production, test);
        }
    }
}
