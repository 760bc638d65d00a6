//! Typed domain error enums.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `std::fs`, or `std::process`.
//! All error types implement `thiserror::Error` and convert to `anyhow::Error`
//! via the `?` operator.

use thiserror::Error;

// ── Config errors ─────────────────────────────────────────────────────────────

/// A configuration value outside what the target resource accepts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}\n\nValid values: {valid}")]
    InvalidValue {
        key: String,
        value: String,
        valid: String,
    },

    #[error("Invalid CIDR block '{value}': {reason}")]
    InvalidCidr { value: String, reason: String },
}

impl ConfigError {
    pub(crate) fn invalid(key: &str, value: impl ToString, valid: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            valid: valid.into(),
        }
    }
}

// ── Composition errors ────────────────────────────────────────────────────────

/// Errors raised while composing stacks. All of them surface before any
/// template is written.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompositionError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Service '{service}' is missing its {input}")]
    MissingInput {
        service: String,
        input: &'static str,
    },

    #[error(
        "Service '{service}' mixes handles from foundation '{expected}' and foundation '{found}'"
    )]
    MixedFoundations {
        service: String,
        expected: String,
        found: String,
    },

    #[error("Service '{service}' uses handles from foundation '{foundation}', which this app did not create")]
    ForeignHandle { service: String, foundation: String },

    #[error("Service '{service}' was added before the foundation; add the foundation first")]
    ServiceBeforeFoundation { service: String },

    #[error("A foundation already exists in stack '{existing}'; an app holds exactly one")]
    DuplicateFoundation { existing: String },

    #[error("Service '{0}' is declared more than once")]
    DuplicateService(String),

    #[error("Stack '{0}' is declared more than once")]
    DuplicateStack(String),

    #[error("Invalid stack name '{0}': must match ^[A-Za-z][A-Za-z0-9-]{{0,127}}$")]
    InvalidStackName(String),

    #[error("Invalid service name '{0}': must match ^[a-z0-9]([a-z0-9-]{{0,61}}[a-z0-9])?$")]
    InvalidServiceName(String),

    #[error("Construct '{path}' already exists in stack '{stack}'")]
    DuplicateConstruct { stack: String, path: String },

    #[error("Output '{output}' already exists in stack '{stack}'")]
    DuplicateOutput { stack: String, output: String },

    #[error("Stack '{consumer}' references unknown stack '{stack}'")]
    UnknownStack { consumer: String, stack: String },

    #[error("Stack '{consumer}' references '{logical_id}', which stack '{stack}' does not define")]
    DanglingReference {
        consumer: String,
        stack: String,
        logical_id: String,
    },

    #[error(
        "Stack '{consumer}' ({consumer_env}) cannot import from '{producer}' ({producer_env}); exports do not cross accounts or regions"
    )]
    CrossEnvironmentReference {
        consumer: String,
        producer: String,
        consumer_env: String,
        producer_env: String,
    },

    #[error("Stack dependency cycle between: {}", .0.join(", "))]
    DependencyCycle(Vec<String>),

    #[error("Fargate does not offer {cpu} CPU units with {memory} MiB of memory")]
    InvalidFargateSize { cpu: u32, memory: u32 },

    #[error(
        "Service '{service}' listens on port {container_port} but its target groups forward to port {target_port}"
    )]
    PortMismatch {
        service: String,
        container_port: u16,
        target_port: u16,
    },

    #[error(
        "Service '{service}' checks health at '{path}' but the blue/green target groups check '{pair_path}'; set foundation.blue_green.health_check.path"
    )]
    HealthCheckMismatch {
        service: String,
        path: String,
        pair_path: String,
    },

    #[error("Invalid image reference '{0}'")]
    InvalidImage(String),

    #[error("Service '{service}' asks for blue/green ingress but the foundation has no blue/green topology")]
    BlueGreenUnavailable { service: String },

    #[error("The blue/green target groups already front service '{owner}'; '{service}' cannot attach too")]
    TargetGroupsInUse { service: String, owner: String },
}

// ── Traffic errors ────────────────────────────────────────────────────────────

/// Illegal transitions of the blue/green promotion state machine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrafficError {
    #[error("Cannot {event} while {state}")]
    InvalidTransition { state: String, event: &'static str },
}
