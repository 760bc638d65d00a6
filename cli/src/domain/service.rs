//! Service unit: one Fargate workload with a FireLens log router that ships
//! the application's log stream into the foundation's delivery stream.
//!
//! A service is built from [`ServiceProps`], which can only be produced by
//! [`ServicePropsBuilder::build`] and therefore always carries the three
//! foundation handles it needs.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use ecsforge_common::{DeletionPolicy, Environment, Expr, Output, Reference, Resource};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::error::{CompositionError, ConfigError};
use crate::domain::handles::{
    ClusterHandle, FoundationId, LogPipelineHandle, RegistryHandle, TargetGroupPair,
};
use crate::domain::iam;
use crate::domain::load_balancer::{self, HealthCheck};
use crate::domain::stack::Stack;

/// Fluent Bit image published by AWS, resolved from SSM at deploy time.
pub const DEFAULT_LOG_ROUTER_IMAGE: &str =
    "{{resolve:ssm:/aws/service/aws-for-fluent-bit/latest}}";

pub const APP_CONTAINER: &str = "web";
pub const LOG_ROUTER_CONTAINER: &str = "log-router";

const ROUTER_LOG_RETENTION_DAYS: u32 = 731;

static SERVICE_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^[a-z0-9]([a-z0-9-]{0,61}[a-z0-9])?$").expect("valid regex")
});

static IMAGE_REF_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(
        r"^(?:[a-z0-9.-]+(?::[0-9]+)?/)?[a-z0-9]+(?:[._-][a-z0-9]+)*(?:/[a-z0-9]+(?:[._-][a-z0-9]+)*)*(?::[A-Za-z0-9_][A-Za-z0-9_.-]{0,127})?(?:@sha256:[a-f0-9]{64})?$",
    )
    .expect("valid regex")
});

static IMAGE_TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^[A-Za-z0-9_][A-Za-z0-9_.-]{0,127}$").expect("valid regex")
});

/// CPU units Fargate offers and the memory sizes (MiB) allowed with each.
const FARGATE_SIZES: &[(u32, u32, u32, u32)] = &[
    // (cpu, min memory, max memory, step)
    (256, 512, 2048, 0),
    (512, 1024, 4096, 1024),
    (1024, 2048, 8192, 1024),
    (2048, 4096, 16384, 1024),
    (4096, 8192, 30720, 1024),
    (8192, 16384, 61440, 4096),
    (16384, 32768, 122_880, 8192),
];

/// Whether Fargate can run a task with `cpu` units and `memory` MiB.
#[must_use]
pub fn is_valid_fargate_size(cpu: u32, memory: u32) -> bool {
    FARGATE_SIZES.iter().any(|&(c, min, max, step)| {
        c == cpu
            && if step == 0 {
                // 256 CPU units only come with 512, 1024 or 2048 MiB.
                matches!(memory, 512 | 1024 | 2048)
            } else {
                (min..=max).contains(&memory) && (memory - min) % step == 0
            }
    })
}

/// Validates a service name.
///
/// # Errors
///
/// Returns [`CompositionError::InvalidServiceName`] if the name does not match.
pub fn validate_service_name(name: &str) -> Result<(), CompositionError> {
    if SERVICE_NAME_RE.is_match(name) {
        Ok(())
    } else {
        Err(CompositionError::InvalidServiceName(name.to_string()))
    }
}

/// `demo-service` → `DemoService`.
#[must_use]
pub fn pascal_case(name: &str) -> String {
    name.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_ascii_uppercase().to_string() + chars.as_str()
            })
        })
        .collect()
}

// ── Configuration ────────────────────────────────────────────────────────────

/// Where the application image comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "lowercase")]
pub enum ImageConfig {
    /// The foundation's repository.
    Registry {
        #[serde(default = "default_tag")]
        tag: String,
    },
    /// A public image reference such as `amazon/amazon-ecs-sample`.
    Public { reference: String },
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self::Registry { tag: default_tag() }
    }
}

fn default_tag() -> String {
    "latest".to_string()
}

/// How traffic reaches the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IngressConfig {
    /// A load balancer of its own in the service stack.
    Dedicated {
        #[serde(default = "default_listener_port")]
        listener_port: u16,
    },
    /// The foundation's blue/green pair.
    BlueGreen,
    /// No load balancer.
    None,
}

impl Default for IngressConfig {
    fn default() -> Self {
        Self::Dedicated {
            listener_port: default_listener_port(),
        }
    }
}

fn default_listener_port() -> u16 {
    80
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogRouterConfig {
    /// Stream prefix of the router's own log group.
    pub stream_prefix: String,
    /// Image override; the AWS Fluent Bit image when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub memory_reservation_mib: u32,
}

impl Default for LogRouterConfig {
    fn default() -> Self {
        Self {
            stream_prefix: "firelens".to_string(),
            image: None,
            memory_reservation_mib: 50,
        }
    }
}

/// One service entry of the configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceConfig {
    pub name: String,
    /// Stack to declare the service in; `<PascalName>Stack` when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<Environment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageConfig>,
    pub container_port: u16,
    pub cpu: u32,
    pub memory: u32,
    pub desired_count: u32,
    pub health_check_path: String,
    pub ingress: IngressConfig,
    pub log_router: LogRouterConfig,
    /// Environment variables of the application container.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub variables: BTreeMap<String, String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "demo-service".to_string(),
            stack: None,
            environment: None,
            image: None,
            container_port: 8080,
            cpu: 512,
            memory: 1024,
            desired_count: 1,
            health_check_path: "/".to_string(),
            ingress: IngressConfig::default(),
            log_router: LogRouterConfig::default(),
            variables: BTreeMap::new(),
        }
    }
}

impl ServiceConfig {
    #[must_use]
    pub fn stack_name(&self) -> String {
        self.stack
            .clone()
            .unwrap_or_else(|| format!("{}Stack", pascal_case(&self.name)))
    }
}

// ── Props ────────────────────────────────────────────────────────────────────

/// Resolved image source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    Registry { registry: RegistryHandle, tag: String },
    Public(String),
}

/// Resolved ingress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ingress {
    Dedicated { listener_port: u16 },
    BlueGreen(TargetGroupPair),
    None,
}

/// Validated inputs of a service.
#[derive(Debug, Clone)]
pub struct ServiceProps {
    name: String,
    cluster: ClusterHandle,
    image: ImageSource,
    log_pipeline: LogPipelineHandle,
    container_port: u16,
    cpu: u32,
    memory: u32,
    desired_count: u32,
    health_check_path: String,
    ingress: Ingress,
    log_router: LogRouterConfig,
    variables: BTreeMap<String, String>,
}

impl ServiceProps {
    #[must_use]
    pub fn builder(name: &str) -> ServicePropsBuilder {
        ServicePropsBuilder::new(name)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn foundation(&self) -> &FoundationId {
        self.cluster.foundation()
    }

    #[must_use]
    pub fn cluster(&self) -> &ClusterHandle {
        &self.cluster
    }

    #[must_use]
    pub fn ingress(&self) -> &Ingress {
        &self.ingress
    }

    #[must_use]
    pub fn container_port(&self) -> u16 {
        self.container_port
    }
}

#[derive(Debug, Clone)]
pub struct ServicePropsBuilder {
    name: String,
    cluster: Option<ClusterHandle>,
    image: Option<ImageSource>,
    log_pipeline: Option<LogPipelineHandle>,
    container_port: u16,
    cpu: u32,
    memory: u32,
    desired_count: u32,
    health_check_path: String,
    ingress: Ingress,
    log_router: LogRouterConfig,
    variables: BTreeMap<String, String>,
}

impl ServicePropsBuilder {
    fn new(name: &str) -> Self {
        let defaults = ServiceConfig::default();
        Self {
            name: name.to_string(),
            cluster: None,
            image: None,
            log_pipeline: None,
            container_port: defaults.container_port,
            cpu: defaults.cpu,
            memory: defaults.memory,
            desired_count: defaults.desired_count,
            health_check_path: defaults.health_check_path,
            ingress: Ingress::Dedicated {
                listener_port: default_listener_port(),
            },
            log_router: defaults.log_router,
            variables: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn cluster(mut self, cluster: ClusterHandle) -> Self {
        self.cluster = Some(cluster);
        self
    }

    #[must_use]
    pub fn image(mut self, image: ImageSource) -> Self {
        self.image = Some(image);
        self
    }

    #[must_use]
    pub fn log_pipeline(mut self, log_pipeline: LogPipelineHandle) -> Self {
        self.log_pipeline = Some(log_pipeline);
        self
    }

    #[must_use]
    pub fn container_port(mut self, port: u16) -> Self {
        self.container_port = port;
        self
    }

    #[must_use]
    pub fn size(mut self, cpu: u32, memory: u32) -> Self {
        self.cpu = cpu;
        self.memory = memory;
        self
    }

    #[must_use]
    pub fn desired_count(mut self, count: u32) -> Self {
        self.desired_count = count;
        self
    }

    #[must_use]
    pub fn health_check_path(mut self, path: &str) -> Self {
        self.health_check_path = path.to_string();
        self
    }

    #[must_use]
    pub fn ingress(mut self, ingress: Ingress) -> Self {
        self.ingress = ingress;
        self
    }

    #[must_use]
    pub fn log_router(mut self, log_router: LogRouterConfig) -> Self {
        self.log_router = log_router;
        self
    }

    #[must_use]
    pub fn variable(mut self, key: &str, value: &str) -> Self {
        self.variables.insert(key.to_string(), value.to_string());
        self
    }

    /// Check every input and produce the props.
    ///
    /// # Errors
    ///
    /// Returns [`CompositionError::MissingInput`] for each absent handle,
    /// [`CompositionError::MixedFoundations`] when handles come from
    /// different foundations, or a validation error.
    pub fn build(self) -> Result<ServiceProps, CompositionError> {
        validate_service_name(&self.name)?;
        let missing = |input: &'static str| CompositionError::MissingInput {
            service: self.name.clone(),
            input,
        };
        let cluster = self.cluster.clone().ok_or_else(|| missing("cluster handle"))?;
        let image = self.image.clone().ok_or_else(|| missing("image source"))?;
        let log_pipeline = self
            .log_pipeline
            .clone()
            .ok_or_else(|| missing("log pipeline handle"))?;

        let expected = cluster.foundation();
        let mut others = vec![log_pipeline.foundation()];
        if let ImageSource::Registry { registry, .. } = &image {
            others.push(registry.foundation());
        }
        if let Ingress::BlueGreen(pair) = &self.ingress {
            others.push(pair.foundation());
        }
        if let Some(found) = others.into_iter().find(|f| *f != expected) {
            return Err(CompositionError::MixedFoundations {
                service: self.name.clone(),
                expected: expected.to_string(),
                found: found.to_string(),
            });
        }

        if !is_valid_fargate_size(self.cpu, self.memory) {
            return Err(CompositionError::InvalidFargateSize {
                cpu: self.cpu,
                memory: self.memory,
            });
        }
        if self.container_port == 0 {
            return Err(ConfigError::invalid("container_port", 0, "1..=65535").into());
        }
        if !self.health_check_path.starts_with('/') {
            return Err(ConfigError::invalid(
                "health_check_path",
                &self.health_check_path,
                "a path starting with '/'",
            )
            .into());
        }
        match &self.ingress {
            Ingress::BlueGreen(pair) if pair.target_port() != self.container_port => {
                return Err(CompositionError::PortMismatch {
                    service: self.name.clone(),
                    container_port: self.container_port,
                    target_port: pair.target_port(),
                });
            }
            Ingress::BlueGreen(pair) if pair.health_check_path() != self.health_check_path => {
                return Err(CompositionError::HealthCheckMismatch {
                    service: self.name.clone(),
                    path: self.health_check_path.clone(),
                    pair_path: pair.health_check_path().to_string(),
                });
            }
            Ingress::Dedicated { listener_port: 0 } => {
                return Err(ConfigError::invalid("ingress.listener_port", 0, "1..=65535").into());
            }
            Ingress::Dedicated { .. } => {
                load_balancer::require_two_subnets(cluster.network())?;
            }
            _ => {}
        }
        match &image {
            ImageSource::Public(reference) if !IMAGE_REF_RE.is_match(reference) => {
                return Err(CompositionError::InvalidImage(reference.clone()));
            }
            ImageSource::Registry { tag, .. } if !IMAGE_TAG_RE.is_match(tag) => {
                return Err(CompositionError::InvalidImage(format!(":{tag}")));
            }
            _ => {}
        }

        Ok(ServiceProps {
            name: self.name,
            cluster,
            image,
            log_pipeline,
            container_port: self.container_port,
            cpu: self.cpu,
            memory: self.memory,
            desired_count: self.desired_count,
            health_check_path: self.health_check_path,
            ingress: self.ingress,
            log_router: self.log_router,
            variables: self.variables,
        })
    }
}

// ── Synthesis ────────────────────────────────────────────────────────────────

fn http_url(dns: &Reference, port: u16) -> Expr {
    let mut parts: Vec<Expr> = vec!["http://".into(), dns.into()];
    if port != 80 {
        parts.push(format!(":{port}").into());
    }
    iam::join(parts)
}

fn all_outbound() -> Expr {
    Expr::List(vec![Expr::object([
        ("CidrIp", "0.0.0.0/0".into()),
        ("Description", "Allow all outbound traffic by default".into()),
        ("IpProtocol", "-1".into()),
    ])])
}

/// Declare the service into `stack`. `output_prefix` namespaces the output
/// IDs when several services share one stack.
#[allow(clippy::too_many_lines)]
pub(crate) fn build(
    stack: &mut Stack,
    props: &ServiceProps,
    output_prefix: &str,
) -> Result<(), CompositionError> {
    let id = props.name.as_str();
    let network = props.cluster.network();

    // Router log group
    let router_group = stack.add(
        &[id, "LogRouterLogGroup"],
        Resource::new("AWS::Logs::LogGroup")
            .property("RetentionInDays", ROUTER_LOG_RETENTION_DAYS)
            .removal_policy(DeletionPolicy::Retain),
    )?;
    let router_group_arn = stack.attribute(&router_group, "Arn");

    // Task role: what the containers may call.
    let task_role = stack.add(
        &[id, "TaskDef", "TaskRole"],
        Resource::new("AWS::IAM::Role").property(
            "AssumeRolePolicyDocument",
            iam::assumed_by("ecs-tasks.amazonaws.com", None),
        ),
    )?;
    let task_policy_name = stack.logical_id_for(&[id, "TaskDef", "TaskRole", "DefaultPolicy"]);
    let task_policy = stack.add(
        &[id, "TaskDef", "TaskRole", "DefaultPolicy"],
        Resource::new("AWS::IAM::Policy")
            .property("PolicyName", task_policy_name)
            .property(
                "PolicyDocument",
                iam::document(vec![iam::allow(
                    &["firehose:PutRecord", "firehose:PutRecordBatch"],
                    vec![props.log_pipeline.stream_arn().into()],
                )]),
            )
            .property("Roles", Expr::List(vec![stack.reference(&task_role).into()])),
    )?;

    // Execution role: what ECS needs to start the task.
    let execution_role = stack.add(
        &[id, "TaskDef", "ExecutionRole"],
        Resource::new("AWS::IAM::Role").property(
            "AssumeRolePolicyDocument",
            iam::assumed_by("ecs-tasks.amazonaws.com", None),
        ),
    )?;
    let mut execution_statements = Vec::new();
    if let ImageSource::Registry { registry, .. } = &props.image {
        execution_statements.push(iam::allow(
            &[
                "ecr:BatchCheckLayerAvailability",
                "ecr:BatchGetImage",
                "ecr:GetDownloadUrlForLayer",
            ],
            vec![registry.arn().into()],
        ));
        execution_statements.push(iam::allow(&["ecr:GetAuthorizationToken"], vec!["*".into()]));
    }
    execution_statements.push(iam::allow(
        &["logs:CreateLogStream", "logs:PutLogEvents"],
        vec![router_group_arn.into()],
    ));
    let execution_policy_name =
        stack.logical_id_for(&[id, "TaskDef", "ExecutionRole", "DefaultPolicy"]);
    let execution_policy = stack.add(
        &[id, "TaskDef", "ExecutionRole", "DefaultPolicy"],
        Resource::new("AWS::IAM::Policy")
            .property("PolicyName", execution_policy_name)
            .property("PolicyDocument", iam::document(execution_statements))
            .property(
                "Roles",
                Expr::List(vec![stack.reference(&execution_role).into()]),
            ),
    )?;

    // Task definition
    let image = match &props.image {
        ImageSource::Registry { registry, tag } => {
            iam::join(vec![registry.uri().into(), format!(":{tag}").into()])
        }
        ImageSource::Public(reference) => reference.as_str().into(),
    };
    let app_container = Expr::object([
        ("Essential", true.into()),
        (
            "Environment",
            Expr::List(
                props
                    .variables
                    .iter()
                    .map(|(k, v)| Expr::object([("Name", k.into()), ("Value", v.into())]))
                    .collect(),
            ),
        ),
        ("Image", image),
        (
            "LogConfiguration",
            Expr::object([
                ("LogDriver", "awsfirelens".into()),
                (
                    "Options",
                    Expr::object([
                        ("Name", "firehose".into()),
                        ("delivery_stream", props.log_pipeline.stream_name().into()),
                        ("region", Expr::region()),
                    ]),
                ),
            ]),
        ),
        ("Name", APP_CONTAINER.into()),
        (
            "PortMappings",
            Expr::List(vec![Expr::object([
                ("ContainerPort", props.container_port.into()),
                ("Protocol", "tcp".into()),
            ])]),
        ),
    ]);
    let router_container = Expr::object([
        ("Essential", true.into()),
        (
            "FirelensConfiguration",
            Expr::object([("Type", "fluentbit".into())]),
        ),
        (
            "Image",
            props
                .log_router
                .image
                .as_deref()
                .unwrap_or(DEFAULT_LOG_ROUTER_IMAGE)
                .into(),
        ),
        (
            "LogConfiguration",
            Expr::object([
                ("LogDriver", "awslogs".into()),
                (
                    "Options",
                    Expr::object([
                        ("awslogs-group", stack.reference(&router_group).into()),
                        ("awslogs-region", Expr::region()),
                        (
                            "awslogs-stream-prefix",
                            props.log_router.stream_prefix.as_str().into(),
                        ),
                    ]),
                ),
            ]),
        ),
        (
            "MemoryReservation",
            props.log_router.memory_reservation_mib.into(),
        ),
        ("Name", LOG_ROUTER_CONTAINER.into()),
    ]);
    let task_definition = stack.add(
        &[id, "TaskDef"],
        Resource::new("AWS::ECS::TaskDefinition")
            .property("Family", format!("{}{}", stack.name(), pascal_case(id)))
            .property("Cpu", props.cpu.to_string())
            .property("Memory", props.memory.to_string())
            .property("NetworkMode", "awsvpc")
            .property("RequiresCompatibilities", Expr::list(["FARGATE"]))
            .property("ExecutionRoleArn", stack.attribute(&execution_role, "Arn"))
            .property("TaskRoleArn", stack.attribute(&task_role, "Arn"))
            .property(
                "ContainerDefinitions",
                Expr::List(vec![app_container, router_container]),
            ),
    )?;

    // Load balancer in front of the service
    let mut listener = None;
    let (ingress_from, target_group, controller) = match &props.ingress {
        Ingress::Dedicated { listener_port } => {
            let lb_sg = stack.add(
                &[id, "LB", "SecurityGroup"],
                Resource::new("AWS::EC2::SecurityGroup")
                    .property("GroupDescription", format!("{}/{id}/LB", stack.name()))
                    .property("VpcId", network.vpc_id())
                    .property(
                        "SecurityGroupIngress",
                        Expr::List(vec![Expr::object([
                            ("CidrIp", "0.0.0.0/0".into()),
                            (
                                "Description",
                                format!("Allow from anyone on port {listener_port}").into(),
                            ),
                            ("FromPort", (*listener_port).into()),
                            ("IpProtocol", "tcp".into()),
                            ("ToPort", (*listener_port).into()),
                        ])]),
                    )
                    .property("SecurityGroupEgress", all_outbound()),
            )?;
            let lb_sg_id = stack.attribute(&lb_sg, "GroupId");
            let alb = stack.add(
                &[id, "LB"],
                Resource::new("AWS::ElasticLoadBalancingV2::LoadBalancer")
                    .property("Scheme", "internet-facing")
                    .property("Type", "application")
                    .property("Subnets", Expr::list(network.public_subnets()))
                    .property("SecurityGroups", Expr::List(vec![lb_sg_id.clone().into()])),
            )?;
            let tg = stack.add(
                &[id, "LB", "PublicListener", "ECSGroup"],
                HealthCheck::default().with_path(&props.health_check_path).apply(
                    Resource::new("AWS::ElasticLoadBalancingV2::TargetGroup")
                        .property("Port", props.container_port)
                        .property("Protocol", "HTTP")
                        .property("TargetType", "ip")
                        .property("VpcId", network.vpc_id()),
                ),
            )?;
            let public_listener = stack.add(
                &[id, "LB", "PublicListener"],
                Resource::new("AWS::ElasticLoadBalancingV2::Listener")
                    .property("LoadBalancerArn", stack.reference(&alb))
                    .property("Port", *listener_port)
                    .property("Protocol", "HTTP")
                    .property(
                        "DefaultActions",
                        Expr::List(vec![Expr::object([
                            ("TargetGroupArn", stack.reference(&tg).into()),
                            ("Type", "forward".into()),
                        ])]),
                    ),
            )?;
            listener = Some(public_listener);

            let dns = stack.attribute(&alb, "DNSName");
            stack.add_output(
                &format!("{output_prefix}LoadBalancerDNS"),
                Output::new(dns.clone()).description("DNS name of the service load balancer"),
            )?;
            stack.add_output(
                &format!("{output_prefix}ServiceURL"),
                Output::new(http_url(&dns, *listener_port)).description("Service URL"),
            )?;
            (Some(lb_sg_id), Some(stack.reference(&tg)), "ECS")
        }
        Ingress::BlueGreen(pair) => {
            // A listener declared in this stack must exist before the service registers.
            let production = pair.production().arn();
            if production.stack == stack.name() {
                listener = Some(production.logical_id.clone());
            }
            stack.add_output(
                &format!("{output_prefix}LoadBalancerDNS"),
                Output::new(pair.load_balancer_dns())
                    .description("DNS name of the blue/green load balancer"),
            )?;
            stack.add_output(
                &format!("{output_prefix}ServiceURL"),
                Output::new(http_url(pair.load_balancer_dns(), pair.production().port()))
                    .description("Production listener URL"),
            )?;
            stack.add_output(
                &format!("{output_prefix}TestURL"),
                Output::new(http_url(pair.load_balancer_dns(), pair.test().port()))
                    .description("Test listener URL"),
            )?;
            (
                Some(pair.security_group().clone()),
                Some(pair.live().arn().clone()),
                "CODE_DEPLOY",
            )
        }
        Ingress::None => (None, None, "ECS"),
    };

    let mut service_sg = Resource::new("AWS::EC2::SecurityGroup")
        .property("GroupDescription", format!("{}/{id}/Service", stack.name()))
        .property("VpcId", network.vpc_id())
        .property("SecurityGroupEgress", all_outbound());
    if let Some(source) = &ingress_from {
        service_sg = service_sg.property(
            "SecurityGroupIngress",
            Expr::List(vec![Expr::object([
                ("Description", "Load balancer to target".into()),
                ("FromPort", props.container_port.into()),
                ("IpProtocol", "tcp".into()),
                ("SourceSecurityGroupId", source.into()),
                ("ToPort", props.container_port.into()),
            ])]),
        );
    }
    let service_sg = stack.add(&[id, "Service", "SecurityGroup"], service_sg)?;

    let mut service = Resource::new("AWS::ECS::Service")
        .property("Cluster", props.cluster.name())
        .property("TaskDefinition", stack.reference(&task_definition))
        .property("LaunchType", "FARGATE")
        .property("DesiredCount", props.desired_count)
        .property(
            "DeploymentController",
            Expr::object([("Type", controller.into())]),
        )
        .property(
            "NetworkConfiguration",
            Expr::object([(
                "AwsvpcConfiguration",
                Expr::object([
                    (
                        "AssignPublicIp",
                        Expr::from(if network.assign_public_ip() {
                            "ENABLED"
                        } else {
                            "DISABLED"
                        }),
                    ),
                    (
                        "SecurityGroups",
                        Expr::List(vec![stack.attribute(&service_sg, "GroupId").into()]),
                    ),
                    ("Subnets", Expr::list(network.workload_subnets())),
                ]),
            )]),
        )
        .depends_on(&task_policy)
        .depends_on(&execution_policy);
    if controller == "ECS" {
        service = service.property(
            "DeploymentConfiguration",
            Expr::object([
                ("MaximumPercent", 200u32.into()),
                ("MinimumHealthyPercent", 50u32.into()),
            ]),
        );
    }
    if let Some(target_group) = &target_group {
        service = service
            .property("HealthCheckGracePeriodSeconds", 60u32)
            .property(
                "LoadBalancers",
                Expr::List(vec![Expr::object([
                    ("ContainerName", APP_CONTAINER.into()),
                    ("ContainerPort", props.container_port.into()),
                    ("TargetGroupArn", target_group.into()),
                ])]),
            );
    }
    if let Some(listener) = &listener {
        service = service.depends_on(listener);
    }
    let service = stack.add(&[id, "Service"], service)?;

    tracing::info!(
        stack = %stack.name(),
        service = %props.name,
        controller,
        cpu = props.cpu,
        memory = props.memory,
        logical_id = %service,
        "service declared"
    );
    Ok(())
}
