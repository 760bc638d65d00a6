//! Blue/green topology: one internet-facing Application Load Balancer with a
//! production and a test listener, each forwarding to one of two target
//! groups that share a single health-check policy.

use std::sync::LazyLock;

use ecsforge_common::{Expr, Output, Resource};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::error::{CompositionError, ConfigError};
use crate::domain::handles::{
    Color, FoundationId, ListenerHandle, NetworkHandle, TargetGroupHandle, TargetGroupPair,
};
use crate::domain::stack::Stack;

const TARGET_GROUP_NAME_MAX: usize = 32;

static MATCHER_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^\d{3}(-\d{3})?(,\d{3}(-\d{3})?)*$").expect("valid regex")
});

/// Health-check policy of a target group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HealthCheck {
    pub path: String,
    pub interval_seconds: u32,
    pub timeout_seconds: u32,
    pub healthy_threshold: u32,
    pub unhealthy_threshold: u32,
    /// Accepted HTTP codes, e.g. `200` or `200-299`.
    pub matcher: String,
}

impl Default for HealthCheck {
    fn default() -> Self {
        Self {
            path: "/".to_string(),
            interval_seconds: 30,
            timeout_seconds: 5,
            healthy_threshold: 5,
            unhealthy_threshold: 2,
            matcher: "200".to_string(),
        }
    }
}

impl HealthCheck {
    /// Same policy with a different path.
    #[must_use]
    pub fn with_path(&self, path: &str) -> Self {
        Self {
            path: path.to_string(),
            ..self.clone()
        }
    }

    /// # Errors
    ///
    /// Returns an error for any value the target group would reject.
    pub fn validate(&self, key: &str) -> Result<(), ConfigError> {
        if !self.path.starts_with('/') {
            return Err(ConfigError::invalid(&format!("{key}.path"), &self.path, "a path starting with '/'"));
        }
        if !(5..=300).contains(&self.interval_seconds) {
            return Err(ConfigError::invalid(
                &format!("{key}.interval_seconds"),
                self.interval_seconds,
                "5..=300",
            ));
        }
        if !(2..=120).contains(&self.timeout_seconds) || self.timeout_seconds >= self.interval_seconds
        {
            return Err(ConfigError::invalid(
                &format!("{key}.timeout_seconds"),
                self.timeout_seconds,
                format!("2..=120 and less than interval_seconds ({})", self.interval_seconds),
            ));
        }
        for (field, value) in [
            ("healthy_threshold", self.healthy_threshold),
            ("unhealthy_threshold", self.unhealthy_threshold),
        ] {
            if !(2..=10).contains(&value) {
                return Err(ConfigError::invalid(&format!("{key}.{field}"), value, "2..=10"));
            }
        }
        if !MATCHER_RE.is_match(&self.matcher) {
            return Err(ConfigError::invalid(
                &format!("{key}.matcher"),
                &self.matcher,
                "HTTP codes such as 200, 200-299 or 200,302",
            ));
        }
        Ok(())
    }

    /// Add the health-check properties to a target group resource.
    pub(crate) fn apply(&self, target_group: Resource) -> Resource {
        target_group
            .property("HealthCheckEnabled", true)
            .property("HealthCheckPath", self.path.as_str())
            .property("HealthCheckProtocol", "HTTP")
            .property("HealthCheckIntervalSeconds", self.interval_seconds)
            .property("HealthCheckTimeoutSeconds", self.timeout_seconds)
            .property("HealthyThresholdCount", self.healthy_threshold)
            .property("UnhealthyThresholdCount", self.unhealthy_threshold)
            .property("Matcher", Expr::object([("HttpCode", self.matcher.as_str().into())]))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BlueGreenConfig {
    pub production_port: u16,
    pub test_port: u16,
    /// Port the target groups forward to; services attached to the pair must
    /// listen on it.
    pub target_port: u16,
    pub health_check: HealthCheck,
    /// Color behind the production listener at deployment.
    pub live: Color,
}

impl Default for BlueGreenConfig {
    fn default() -> Self {
        Self {
            production_port: 80,
            test_port: 8080,
            target_port: 8080,
            health_check: HealthCheck::default(),
            live: Color::Blue,
        }
    }
}

impl BlueGreenConfig {
    /// # Errors
    ///
    /// Returns an error if a port is zero, the listener ports collide, or the
    /// health check is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, port) in [
            ("production_port", self.production_port),
            ("test_port", self.test_port),
            ("target_port", self.target_port),
        ] {
            if port == 0 {
                return Err(ConfigError::invalid(&format!("blue_green.{field}"), port, "1..=65535"));
            }
        }
        if self.production_port == self.test_port {
            return Err(ConfigError::invalid(
                "blue_green.test_port",
                self.test_port,
                format!("any port other than production_port ({})", self.production_port),
            ));
        }
        self.health_check.validate("blue_green.health_check")
    }
}

/// Target group name for `color`: the stack name cut down so the result fits
/// the 32-character limit.
pub(crate) fn target_group_name(stack: &str, color: Color) -> String {
    let suffix = format!("-{}", color.as_str());
    let mut base: String = stack
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
        .take(TARGET_GROUP_NAME_MAX - "-green".len())
        .collect();
    while base.ends_with('-') {
        base.pop();
    }
    format!("{base}{suffix}")
}

/// Application load balancers need subnets in at least two availability zones.
pub(crate) fn require_two_subnets(network: &NetworkHandle) -> Result<(), ConfigError> {
    let zones = network.public_subnets().len();
    if zones < 2 {
        return Err(ConfigError::invalid(
            "network.max_azs",
            zones,
            "at least 2 when a load balancer is declared",
        ));
    }
    Ok(())
}

/// Declare the topology in `stack`.
///
/// `after` lists resources (the public default routes) the load balancer must
/// wait for.
pub(crate) fn build(
    stack: &mut Stack,
    config: &BlueGreenConfig,
    network: &NetworkHandle,
    after: &[String],
    foundation: &FoundationId,
) -> Result<TargetGroupPair, CompositionError> {
    config.validate()?;
    require_two_subnets(network)?;
    let id = "blue-green";

    let ingress = |port: u16, what: &str| {
        Expr::object([
            ("CidrIp", "0.0.0.0/0".into()),
            ("Description", format!("Allow from anyone on port {port} ({what})").into()),
            ("FromPort", port.into()),
            ("IpProtocol", "tcp".into()),
            ("ToPort", port.into()),
        ])
    };
    let security_group = stack.add(
        &[id, "SecurityGroup"],
        Resource::new("AWS::EC2::SecurityGroup")
            .property("GroupDescription", format!("{}/{id} load balancer", stack.name()))
            .property("VpcId", network.vpc_id())
            .property(
                "SecurityGroupIngress",
                Expr::List(vec![
                    ingress(config.production_port, "production"),
                    ingress(config.test_port, "test"),
                ]),
            )
            .property(
                "SecurityGroupEgress",
                Expr::List(vec![Expr::object([
                    ("CidrIp", "0.0.0.0/0".into()),
                    ("Description", "Allow all outbound traffic by default".into()),
                    ("IpProtocol", "-1".into()),
                ])]),
            ),
    )?;
    let security_group_id = stack.attribute(&security_group, "GroupId");

    let mut alb = Resource::new("AWS::ElasticLoadBalancingV2::LoadBalancer")
        .property("Scheme", "internet-facing")
        .property("Type", "application")
        .property("Subnets", Expr::list(network.public_subnets()))
        .property("SecurityGroups", Expr::List(vec![security_group_id.clone().into()]))
        .property(
            "LoadBalancerAttributes",
            Expr::List(vec![Expr::object([
                ("Key", "deletion_protection.enabled".into()),
                ("Value", "false".into()),
            ])]),
        );
    for route in after {
        alb = alb.depends_on(route);
    }
    let alb = stack.add(&[id, "LoadBalancer"], alb)?;

    let target_group = |color: Color| {
        config.health_check.apply(
            Resource::new("AWS::ElasticLoadBalancingV2::TargetGroup")
                .property("Name", target_group_name(stack.name(), color))
                .property("Port", config.target_port)
                .property("Protocol", "HTTP")
                .property("TargetType", "ip")
                .property("VpcId", network.vpc_id()),
        )
    };
    let blue_resource = target_group(Color::Blue);
    let green_resource = target_group(Color::Green);
    let blue = stack.add(&[id, "BlueTargetGroup"], blue_resource)?;
    let green = stack.add(&[id, "GreenTargetGroup"], green_resource)?;
    let group_id = |color: Color| match color {
        Color::Blue => blue.clone(),
        Color::Green => green.clone(),
    };

    let listener = |stack: &Stack, port: u16, color: Color| {
        Resource::new("AWS::ElasticLoadBalancingV2::Listener")
            .property("LoadBalancerArn", stack.reference(&alb))
            .property("Port", port)
            .property("Protocol", "HTTP")
            .property(
                "DefaultActions",
                Expr::List(vec![Expr::object([
                    ("TargetGroupArn", stack.reference(&group_id(color)).into()),
                    ("Type", "forward".into()),
                ])]),
            )
    };
    let live = config.live;
    let production_resource = listener(stack, config.production_port, live);
    let test_resource = listener(stack, config.test_port, live.other());
    let production = stack.add(&[id, "ProductionListener"], production_resource)?;
    let test = stack.add(&[id, "TestListener"], test_resource)?;

    let dns = stack.attribute(&alb, "DNSName");
    stack.add_output(
        "LoadBalancerDNS",
        Output::new(dns.clone()).description("DNS name of the blue/green load balancer"),
    )?;

    tracing::debug!(
        stack = %stack.name(),
        production_port = config.production_port,
        test_port = config.test_port,
        live = %live,
        "blue/green topology declared"
    );

    Ok(TargetGroupPair::new(
        foundation.clone(),
        TargetGroupHandle::new(Color::Blue, stack.reference(&blue), config.target_port),
        TargetGroupHandle::new(Color::Green, stack.reference(&green), config.target_port),
        ListenerHandle::new(stack.reference(&production), config.production_port, live),
        ListenerHandle::new(stack.reference(&test), config.test_port, live.other()),
        security_group_id,
        dns,
        config.health_check.path.clone(),
    ))
}
