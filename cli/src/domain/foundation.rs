//! Foundation unit: network, ECS cluster, ECR repository, log pipeline and the
//! optional blue/green topology. Needs no inputs; everything services consume
//! comes out of [`build`] as handles.

use ecsforge_common::{Environment, Expr, Output, Resource};
use serde::{Deserialize, Serialize};

use crate::domain::config::Removal;
use crate::domain::error::CompositionError;
use crate::domain::handles::{
    ClusterHandle, FoundationId, LogPipelineHandle, NetworkHandle, RegistryHandle, TargetGroupPair,
};
use crate::domain::load_balancer::{self, BlueGreenConfig};
use crate::domain::log_pipeline::{self, LogPipelineConfig};
use crate::domain::network::{self, NetworkConfig};
use crate::domain::stack::Stack;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClusterConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub container_insights: bool,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            name: None,
            container_insights: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegistryConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub removal: Removal,
    pub scan_on_push: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            name: None,
            removal: Removal::Retain,
            scan_on_push: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FoundationConfig {
    pub stack_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Overrides the top-level environment for this stack.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<Environment>,
    pub network: NetworkConfig,
    pub cluster: ClusterConfig,
    pub registry: RegistryConfig,
    pub log_pipeline: LogPipelineConfig,
    /// Present to declare the blue/green load balancer topology.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blue_green: Option<BlueGreenConfig>,
}

impl Default for FoundationConfig {
    fn default() -> Self {
        Self {
            stack_name: "InfraStack".to_string(),
            description: None,
            environment: None,
            network: NetworkConfig::default(),
            cluster: ClusterConfig::default(),
            registry: RegistryConfig::default(),
            log_pipeline: LogPipelineConfig::default(),
            blue_green: None,
        }
    }
}

/// Everything a foundation exposes.
#[derive(Debug, Clone)]
pub struct FoundationOutputs {
    pub cluster: ClusterHandle,
    pub registry: RegistryHandle,
    pub log_pipeline: LogPipelineHandle,
    pub network: NetworkHandle,
    pub traffic: Option<TargetGroupPair>,
}

impl FoundationOutputs {
    #[must_use]
    pub fn id(&self) -> &FoundationId {
        self.cluster.foundation()
    }
}

/// Declare the foundation into `stack`.
///
/// `app` identifies the owning [`crate::domain::composition::App`].
pub(crate) fn build(
    stack: &mut Stack,
    config: &FoundationConfig,
    app: u64,
) -> Result<FoundationOutputs, CompositionError> {
    let foundation = FoundationId::new(stack.name(), app);
    if let Some(description) = &config.description {
        stack.set_description(description.as_str());
    }

    let network = network::build(stack, "ecs-vpc", &config.network, &foundation)?;

    let mut cluster = Resource::new("AWS::ECS::Cluster").property(
        "ClusterSettings",
        Expr::List(vec![Expr::object([
            ("Name", "containerInsights".into()),
            (
                "Value",
                Expr::from(if config.cluster.container_insights {
                    "enabled"
                } else {
                    "disabled"
                }),
            ),
        ])]),
    );
    if let Some(name) = &config.cluster.name {
        cluster = cluster.property("ClusterName", name.as_str());
    }
    let cluster = stack.add(&["ecs"], cluster)?;

    let mut repository = Resource::new("AWS::ECR::Repository")
        .property(
            "ImageScanningConfiguration",
            Expr::object([("ScanOnPush", config.registry.scan_on_push.into())]),
        )
        .removal_policy(config.registry.removal.into());
    if config.registry.removal == Removal::Delete {
        repository = repository.property("EmptyOnDelete", true);
    }
    if let Some(name) = &config.registry.name {
        repository = repository.property("RepositoryName", name.as_str());
    }
    let repository = stack.add(&["Repository"], repository)?;

    let log_pipeline = log_pipeline::build(stack, &config.log_pipeline, &foundation)?;

    let traffic = config
        .blue_green
        .as_ref()
        .map(|bg| {
            load_balancer::build(stack, bg, &network.handle, &network.internet_routes, &foundation)
        })
        .transpose()?;

    stack.add_output(
        "ClusterName",
        Output::new(stack.reference(&cluster)).description("ECS cluster name"),
    )?;
    stack.add_output(
        "RepositoryUri",
        Output::new(stack.attribute(&repository, "RepositoryUri"))
            .description("ECR repository URI"),
    )?;
    stack.add_output(
        "DeliveryStreamName",
        Output::new(log_pipeline.stream_name()).description("Firehose delivery stream name"),
    )?;

    tracing::info!(
        stack = %stack.name(),
        blue_green = traffic.is_some(),
        "foundation declared"
    );

    Ok(FoundationOutputs {
        cluster: ClusterHandle::new(
            stack.reference(&cluster),
            stack.attribute(&cluster, "Arn"),
            network.handle.clone(),
            stack.environment().clone(),
        ),
        registry: RegistryHandle::new(
            foundation.clone(),
            stack.reference(&repository),
            stack.attribute(&repository, "RepositoryUri"),
            stack.attribute(&repository, "Arn"),
        ),
        log_pipeline,
        network: network.handle,
        traffic,
    })
}
