//! Entry composition: one foundation, then any number of services fed with
//! the foundation's handles.

use std::collections::BTreeSet;

use ecsforge_common::Environment;

use crate::domain::assembly::Assembly;
use crate::domain::config::{ForgeConfig, Layout};
use crate::domain::error::CompositionError;
use crate::domain::foundation::{self, FoundationConfig, FoundationOutputs};
use crate::domain::handles::FoundationId;
use crate::domain::service::{
    self, ImageConfig, ImageSource, Ingress, IngressConfig, ServiceConfig, ServiceProps,
};
use crate::domain::stack::Stack;

/// Stacks under construction plus the bookkeeping that keeps the topology
/// sound: exactly one foundation, declared first, and services that only use
/// its handles.
#[derive(Debug)]
pub struct App {
    app: u64,
    environment: Environment,
    stacks: Vec<Stack>,
    foundation: Option<FoundationId>,
    services: BTreeSet<String>,
    blue_green_owner: Option<String>,
}

impl App {
    /// Empty app whose stacks default to `environment`.
    #[must_use]
    pub fn new(environment: Environment) -> Self {
        Self {
            app: FoundationId::next_app(),
            environment,
            stacks: Vec::new(),
            foundation: None,
            services: BTreeSet::new(),
            blue_green_owner: None,
        }
    }

    /// Declare the foundation and return its handles.
    ///
    /// # Errors
    ///
    /// Returns an error if a foundation already exists, the stack name is
    /// taken or invalid, or the foundation configuration is invalid.
    pub fn add_foundation(
        &mut self,
        config: &FoundationConfig,
    ) -> Result<FoundationOutputs, CompositionError> {
        if let Some(existing) = &self.foundation {
            return Err(CompositionError::DuplicateFoundation {
                existing: existing.stack().to_string(),
            });
        }
        if self.stack_index(&config.stack_name).is_some() {
            return Err(CompositionError::DuplicateStack(config.stack_name.clone()));
        }
        let environment = config
            .environment
            .clone()
            .unwrap_or_else(|| self.environment.clone());
        let mut stack = Stack::new(&config.stack_name, environment)?;
        let outputs = foundation::build(&mut stack, config, self.app)?;
        self.stacks.push(stack);
        self.foundation = Some(outputs.id().clone());
        Ok(outputs)
    }

    /// Declare a service into `stack_name`, creating the stack unless it
    /// already exists. Sharing the foundation's stack gives the single-stack
    /// layout.
    ///
    /// # Errors
    ///
    /// Returns an error if no foundation exists yet, the props carry handles
    /// of another foundation, the service name is taken, or the blue/green
    /// pair already fronts another service.
    pub fn add_service(
        &mut self,
        stack_name: &str,
        environment: Option<Environment>,
        props: &ServiceProps,
    ) -> Result<(), CompositionError> {
        let Some(foundation) = &self.foundation else {
            return Err(CompositionError::ServiceBeforeFoundation {
                service: props.name().to_string(),
            });
        };
        if props.foundation() != foundation {
            return Err(CompositionError::ForeignHandle {
                service: props.name().to_string(),
                foundation: props.foundation().to_string(),
            });
        }
        if self.services.contains(props.name()) {
            return Err(CompositionError::DuplicateService(props.name().to_string()));
        }
        if let (Ingress::BlueGreen(_), Some(owner)) = (props.ingress(), &self.blue_green_owner) {
            return Err(CompositionError::TargetGroupsInUse {
                service: props.name().to_string(),
                owner: owner.clone(),
            });
        }

        let (index, output_prefix) = match self.stack_index(stack_name) {
            Some(index) => (index, service::pascal_case(props.name())),
            None => {
                let environment = environment.unwrap_or_else(|| self.environment.clone());
                self.stacks.push(Stack::new(stack_name, environment)?);
                (self.stacks.len() - 1, String::new())
            }
        };
        service::build(&mut self.stacks[index], props, &output_prefix)?;

        self.services.insert(props.name().to_string());
        if let Ingress::BlueGreen(_) = props.ingress() {
            self.blue_green_owner = Some(props.name().to_string());
        }
        Ok(())
    }

    /// Resolve every stack into an assembly.
    ///
    /// # Errors
    ///
    /// Returns any error raised while resolving references or ordering stacks.
    pub fn synth(self) -> Result<Assembly, CompositionError> {
        Assembly::synthesize(self.stacks)
    }

    fn stack_index(&self, name: &str) -> Option<usize> {
        self.stacks.iter().position(|s| s.name() == name)
    }
}

/// Turn one service entry into props fed with `foundation`'s handles.
///
/// # Errors
///
/// Returns an error if the entry asks for something the foundation lacks or
/// fails validation.
pub fn service_props(
    config: &ServiceConfig,
    foundation: &FoundationOutputs,
) -> Result<ServiceProps, CompositionError> {
    let mut builder = ServiceProps::builder(&config.name)
        .cluster(foundation.cluster.clone())
        .log_pipeline(foundation.log_pipeline.clone())
        .container_port(config.container_port)
        .size(config.cpu, config.memory)
        .desired_count(config.desired_count)
        .health_check_path(&config.health_check_path)
        .log_router(config.log_router.clone());

    builder = match &config.image {
        Some(ImageConfig::Registry { tag }) => builder.image(ImageSource::Registry {
            registry: foundation.registry.clone(),
            tag: tag.clone(),
        }),
        Some(ImageConfig::Public { reference }) => {
            builder.image(ImageSource::Public(reference.clone()))
        }
        None => builder,
    };

    let ingress = match &config.ingress {
        IngressConfig::Dedicated { listener_port } => Ingress::Dedicated {
            listener_port: *listener_port,
        },
        IngressConfig::BlueGreen => {
            let pair = foundation.traffic.clone().ok_or_else(|| {
                CompositionError::BlueGreenUnavailable {
                    service: config.name.clone(),
                }
            })?;
            Ingress::BlueGreen(pair)
        }
        IngressConfig::None => Ingress::None,
    };
    builder = builder.ingress(ingress);

    for (key, value) in &config.variables {
        builder = builder.variable(key, value);
    }
    builder.build()
}

/// Build the whole assembly described by `config`.
///
/// # Errors
///
/// Returns the first composition error encountered.
pub fn compose(config: &ForgeConfig) -> Result<Assembly, CompositionError> {
    let mut app = App::new(config.environment.clone());
    let foundation = app.add_foundation(&config.foundation)?;

    for service in &config.services {
        let props = service_props(service, &foundation)?;
        let stack_name = match config.layout {
            Layout::Split => service.stack_name(),
            Layout::Combined => config.foundation.stack_name.clone(),
        };
        app.add_service(&stack_name, service.environment.clone(), &props)?;
    }

    let assembly = app.synth()?;
    tracing::info!(
        stacks = assembly.stacks().len(),
        services = config.services.len(),
        layout = ?config.layout,
        "composition synthesized"
    );
    Ok(assembly)
}
