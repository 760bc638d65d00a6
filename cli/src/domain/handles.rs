//! Read-only handles the foundation hands to services.
//!
//! Every handle carries the [`FoundationId`] of the foundation that created
//! it. Fields are private and constructors are crate-internal, so a handle can
//! only come out of [`crate::domain::foundation::build`] and be shared by
//! cloning.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use ecsforge_common::{Environment, Reference};
use serde::{Deserialize, Serialize};

use crate::domain::log_pipeline::Buffering;

static NEXT_APP: AtomicU64 = AtomicU64::new(1);

/// Identity of one foundation instance.
///
/// `app` distinguishes foundations with the same stack name created by
/// different [`crate::domain::composition::App`]s in one process.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FoundationId {
    stack: String,
    app: u64,
}

impl FoundationId {
    pub(crate) fn new(stack: &str, app: u64) -> Self {
        Self {
            stack: stack.to_string(),
            app,
        }
    }

    pub(crate) fn next_app() -> u64 {
        NEXT_APP.fetch_add(1, Ordering::Relaxed)
    }

    #[must_use]
    pub fn stack(&self) -> &str {
        &self.stack
    }

    pub(crate) fn app(&self) -> u64 {
        self.app
    }
}

impl fmt::Display for FoundationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.stack)
    }
}

// ── Network ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkHandle {
    foundation: FoundationId,
    vpc_id: Reference,
    public_subnets: Vec<Reference>,
    private_subnets: Vec<Reference>,
    has_nat: bool,
}

impl NetworkHandle {
    pub(crate) fn new(
        foundation: FoundationId,
        vpc_id: Reference,
        public_subnets: Vec<Reference>,
        private_subnets: Vec<Reference>,
        has_nat: bool,
    ) -> Self {
        Self {
            foundation,
            vpc_id,
            public_subnets,
            private_subnets,
            has_nat,
        }
    }

    #[must_use]
    pub fn foundation(&self) -> &FoundationId {
        &self.foundation
    }

    #[must_use]
    pub fn vpc_id(&self) -> &Reference {
        &self.vpc_id
    }

    #[must_use]
    pub fn public_subnets(&self) -> &[Reference] {
        &self.public_subnets
    }

    #[must_use]
    pub fn private_subnets(&self) -> &[Reference] {
        &self.private_subnets
    }

    /// Subnets tasks are placed in: private ones when they have a NAT route
    /// to the internet, public ones otherwise.
    #[must_use]
    pub fn workload_subnets(&self) -> &[Reference] {
        if self.has_nat {
            &self.private_subnets
        } else {
            &self.public_subnets
        }
    }

    /// Whether tasks need a public IP to reach the image registry.
    #[must_use]
    pub fn assign_public_ip(&self) -> bool {
        !self.has_nat
    }
}

// ── Cluster / registry ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterHandle {
    name: Reference,
    arn: Reference,
    network: NetworkHandle,
    environment: Environment,
}

impl ClusterHandle {
    pub(crate) fn new(
        name: Reference,
        arn: Reference,
        network: NetworkHandle,
        environment: Environment,
    ) -> Self {
        Self {
            name,
            arn,
            network,
            environment,
        }
    }

    #[must_use]
    pub fn foundation(&self) -> &FoundationId {
        self.network.foundation()
    }

    #[must_use]
    pub fn name(&self) -> &Reference {
        &self.name
    }

    #[must_use]
    pub fn arn(&self) -> &Reference {
        &self.arn
    }

    #[must_use]
    pub fn network(&self) -> &NetworkHandle {
        &self.network
    }

    #[must_use]
    pub fn environment(&self) -> &Environment {
        &self.environment
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryHandle {
    foundation: FoundationId,
    name: Reference,
    uri: Reference,
    arn: Reference,
}

impl RegistryHandle {
    pub(crate) fn new(
        foundation: FoundationId,
        name: Reference,
        uri: Reference,
        arn: Reference,
    ) -> Self {
        Self {
            foundation,
            name,
            uri,
            arn,
        }
    }

    #[must_use]
    pub fn foundation(&self) -> &FoundationId {
        &self.foundation
    }

    #[must_use]
    pub fn name(&self) -> &Reference {
        &self.name
    }

    /// `RepositoryUri` attribute, without a tag.
    #[must_use]
    pub fn uri(&self) -> &Reference {
        &self.uri
    }

    #[must_use]
    pub fn arn(&self) -> &Reference {
        &self.arn
    }
}

// ── Log pipeline ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogPipelineHandle {
    foundation: FoundationId,
    stream_name: Reference,
    stream_arn: Reference,
    buffering: Buffering,
}

impl LogPipelineHandle {
    pub(crate) fn new(
        foundation: FoundationId,
        stream_name: Reference,
        stream_arn: Reference,
        buffering: Buffering,
    ) -> Self {
        Self {
            foundation,
            stream_name,
            stream_arn,
            buffering,
        }
    }

    #[must_use]
    pub fn foundation(&self) -> &FoundationId {
        &self.foundation
    }

    #[must_use]
    pub fn stream_name(&self) -> &Reference {
        &self.stream_name
    }

    #[must_use]
    pub fn stream_arn(&self) -> &Reference {
        &self.stream_arn
    }

    #[must_use]
    pub fn buffering(&self) -> Buffering {
        self.buffering
    }
}

// ── Blue/green ────────────────────────────────────────────────────────────────

/// One of the two target groups of the blue/green pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    Blue,
    Green,
}

impl Color {
    #[must_use]
    pub fn other(self) -> Self {
        match self {
            Self::Blue => Self::Green,
            Self::Green => Self::Blue,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Blue => "blue",
            Self::Green => "green",
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Color {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "blue" => Ok(Self::Blue),
            "green" => Ok(Self::Green),
            other => Err(format!("unknown color '{other}' (expected blue or green)")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetGroupHandle {
    color: Color,
    arn: Reference,
    port: u16,
}

impl TargetGroupHandle {
    pub(crate) fn new(color: Color, arn: Reference, port: u16) -> Self {
        Self { color, arn, port }
    }

    #[must_use]
    pub fn color(&self) -> Color {
        self.color
    }

    /// `Ref` of a target group is its ARN.
    #[must_use]
    pub fn arn(&self) -> &Reference {
        &self.arn
    }

    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerHandle {
    arn: Reference,
    port: u16,
    forwards_to: Color,
}

impl ListenerHandle {
    pub(crate) fn new(arn: Reference, port: u16, forwards_to: Color) -> Self {
        Self {
            arn,
            port,
            forwards_to,
        }
    }

    #[must_use]
    pub fn arn(&self) -> &Reference {
        &self.arn
    }

    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    #[must_use]
    pub fn forwards_to(&self) -> Color {
        self.forwards_to
    }
}

/// The blue/green topology on the shared load balancer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetGroupPair {
    foundation: FoundationId,
    blue: TargetGroupHandle,
    green: TargetGroupHandle,
    production: ListenerHandle,
    test: ListenerHandle,
    security_group: Reference,
    load_balancer_dns: Reference,
    health_check_path: String,
}

impl TargetGroupPair {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        foundation: FoundationId,
        blue: TargetGroupHandle,
        green: TargetGroupHandle,
        production: ListenerHandle,
        test: ListenerHandle,
        security_group: Reference,
        load_balancer_dns: Reference,
        health_check_path: String,
    ) -> Self {
        Self {
            foundation,
            blue,
            green,
            production,
            test,
            security_group,
            load_balancer_dns,
            health_check_path,
        }
    }

    #[must_use]
    pub fn foundation(&self) -> &FoundationId {
        &self.foundation
    }

    #[must_use]
    pub fn group(&self, color: Color) -> &TargetGroupHandle {
        match color {
            Color::Blue => &self.blue,
            Color::Green => &self.green,
        }
    }

    #[must_use]
    pub fn production(&self) -> &ListenerHandle {
        &self.production
    }

    #[must_use]
    pub fn test(&self) -> &ListenerHandle {
        &self.test
    }

    /// The group currently receiving production traffic.
    #[must_use]
    pub fn live(&self) -> &TargetGroupHandle {
        self.group(self.production.forwards_to())
    }

    /// Port the target groups forward to.
    #[must_use]
    pub fn target_port(&self) -> u16 {
        self.blue.port()
    }

    /// `GroupId` of the load balancer's security group.
    #[must_use]
    pub fn security_group(&self) -> &Reference {
        &self.security_group
    }

    #[must_use]
    pub fn load_balancer_dns(&self) -> &Reference {
        &self.load_balancer_dns
    }

    /// Health-check path shared by both target groups.
    #[must_use]
    pub fn health_check_path(&self) -> &str {
        &self.health_check_path
    }
}
