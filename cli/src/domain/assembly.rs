//! Assembly synthesis: resolves cross-stack references into exports/imports
//! and orders stacks for deployment.
//!
//! Pure data manipulation: no I/O. Every error surfaces here, before any
//! template is written.

use std::collections::{BTreeMap, BTreeSet};

use ecsforge_common::{
    ARTIFACT_TYPE_STACK, AssemblyManifest, Environment, Expr, Output, Reference, StackArtifact,
    Template, TemplateError,
};

use crate::domain::error::CompositionError;
use crate::domain::stack::Stack;

/// Name of the export a consumer imports for `reference`.
#[must_use]
pub fn export_name(reference: &Reference) -> String {
    format!("{}:ExportsOutput{}", reference.stack, reference.export_suffix())
}

/// Output ID the producer stack carries for `reference`.
#[must_use]
pub fn export_output_id(reference: &Reference) -> String {
    format!("ExportsOutput{}", reference.export_suffix())
}

/// File name of a stack's template inside the assembly directory.
#[must_use]
pub fn template_file_name(stack: &str) -> String {
    format!("{stack}.template.json")
}

/// A stack with every reference resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesizedStack {
    pub name: String,
    pub environment: Environment,
    pub template: Template,
    /// Stacks this one imports from, sorted.
    pub dependencies: Vec<String>,
}

/// Synthesized stacks in deployment order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assembly {
    stacks: Vec<SynthesizedStack>,
}

impl Assembly {
    /// Resolve `stacks` (in declaration order) into an assembly.
    ///
    /// # Errors
    ///
    /// Returns an error for duplicate stack names, references to unknown
    /// stacks or logical IDs, imports across environments, and dependency
    /// cycles.
    pub fn synthesize(stacks: Vec<Stack>) -> Result<Self, CompositionError> {
        let mut index = BTreeMap::new();
        for (i, stack) in stacks.iter().enumerate() {
            if index.insert(stack.name().to_string(), i).is_some() {
                return Err(CompositionError::DuplicateStack(stack.name().to_string()));
            }
        }

        let mut dependencies: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); stacks.len()];
        let mut exports: Vec<BTreeMap<String, Output>> = vec![BTreeMap::new(); stacks.len()];

        for (consumer_idx, consumer) in stacks.iter().enumerate() {
            if let Some((_, dep)) = consumer.dangling_depends_on().into_iter().next() {
                return Err(CompositionError::DanglingReference {
                    consumer: consumer.name().to_string(),
                    stack: consumer.name().to_string(),
                    logical_id: dep,
                });
            }
            for reference in consumer.references() {
                let Some(&producer_idx) = index.get(&reference.stack) else {
                    return Err(CompositionError::UnknownStack {
                        consumer: consumer.name().to_string(),
                        stack: reference.stack.clone(),
                    });
                };
                let producer = &stacks[producer_idx];
                if !producer.template().resources.contains_key(&reference.logical_id) {
                    return Err(CompositionError::DanglingReference {
                        consumer: consumer.name().to_string(),
                        stack: reference.stack.clone(),
                        logical_id: reference.logical_id.clone(),
                    });
                }
                if producer_idx == consumer_idx {
                    continue;
                }
                if !consumer.environment().can_import_from(producer.environment()) {
                    return Err(CompositionError::CrossEnvironmentReference {
                        consumer: consumer.name().to_string(),
                        producer: producer.name().to_string(),
                        consumer_env: consumer.environment().to_string(),
                        producer_env: producer.environment().to_string(),
                    });
                }
                dependencies[consumer_idx].insert(producer_idx);
                exports[producer_idx]
                    .entry(export_output_id(reference))
                    .or_insert_with(|| {
                        Output::new(reference.local_expr()).exported_as(export_name(reference))
                    });
            }
        }

        let order = deploy_order(&stacks, &dependencies)?;

        let mut resolved: Vec<Option<SynthesizedStack>> = Vec::with_capacity(stacks.len());
        for (i, (mut stack, stack_exports)) in stacks.into_iter().zip(exports).enumerate() {
            let own = stack.name().to_string();
            stack.resolve_references(|r| {
                if r.stack == own {
                    r.local_expr()
                } else {
                    Expr::ImportValue(export_name(r))
                }
            });
            for (id, output) in stack_exports {
                stack.insert_export(id, output);
            }
            let (name, environment, template) = stack.into_parts();
            resolved.push(Some(SynthesizedStack {
                name,
                environment,
                template,
                dependencies: Vec::new(),
            }));
            tracing::debug!(stack = %own, imports = dependencies[i].len(), "stack resolved");
        }

        let names: Vec<String> = resolved
            .iter()
            .map(|s| s.as_ref().map(|s| s.name.clone()).unwrap_or_default())
            .collect();
        let stacks = order
            .into_iter()
            .filter_map(|i| {
                let mut stack = resolved[i].take()?;
                stack.dependencies = dependencies[i].iter().map(|&d| names[d].clone()).collect();
                stack.dependencies.sort();
                Some(stack)
            })
            .collect();

        Ok(Self { stacks })
    }

    /// Wrap already-resolved stacks without checking them.
    #[cfg(test)]
    pub(crate) fn from_stacks(stacks: Vec<SynthesizedStack>) -> Self {
        Self { stacks }
    }

    /// Stacks in deployment order.
    #[must_use]
    pub fn stacks(&self) -> &[SynthesizedStack] {
        &self.stacks
    }

    #[must_use]
    pub fn stack(&self, name: &str) -> Option<&SynthesizedStack> {
        self.stacks.iter().find(|s| s.name == name)
    }

    /// Manifest describing this assembly.
    ///
    /// # Errors
    ///
    /// Returns an error if a template cannot be rendered.
    pub fn manifest(&self) -> Result<AssemblyManifest, TemplateError> {
        let mut manifest = AssemblyManifest::new();
        for stack in &self.stacks {
            manifest.deploy_order.push(stack.name.clone());
            manifest.artifacts.insert(
                stack.name.clone(),
                StackArtifact {
                    artifact_type: ARTIFACT_TYPE_STACK.to_string(),
                    environment: stack.environment.to_string(),
                    template_file: template_file_name(&stack.name),
                    dependencies: stack.dependencies.clone(),
                    template_sha256: stack.template.digest()?,
                },
            );
        }
        Ok(manifest)
    }
}

/// Kahn's algorithm; among ready stacks the earliest declared goes first.
fn deploy_order(
    stacks: &[Stack],
    dependencies: &[BTreeSet<usize>],
) -> Result<Vec<usize>, CompositionError> {
    let mut remaining: Vec<usize> = dependencies.iter().map(BTreeSet::len).collect();
    let mut dependants: Vec<Vec<usize>> = vec![Vec::new(); stacks.len()];
    for (consumer, producers) in dependencies.iter().enumerate() {
        for &producer in producers {
            dependants[producer].push(consumer);
        }
    }

    let mut ready: BTreeSet<usize> = (0..stacks.len()).filter(|&i| remaining[i] == 0).collect();
    let mut order = Vec::with_capacity(stacks.len());
    while let Some(next) = ready.pop_first() {
        order.push(next);
        for &dependant in &dependants[next] {
            remaining[dependant] -= 1;
            if remaining[dependant] == 0 {
                ready.insert(dependant);
            }
        }
    }

    if order.len() == stacks.len() {
        Ok(order)
    } else {
        let cycle = (0..stacks.len())
            .filter(|&i| remaining[i] > 0)
            .map(|i| stacks[i].name().to_string())
            .collect();
        Err(CompositionError::DependencyCycle(cycle))
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use ecsforge_common::Resource;

    use super::*;

    fn stack(name: &str) -> Stack {
        Stack::new(name, Environment::default()).unwrap()
    }

    fn env(region: &str) -> Environment {
        Environment::new(None, Some(region.to_string()))
    }

    /// Producer with a cluster, consumer with a service pointing at it.
    fn producer_consumer() -> (Stack, Stack, String) {
        let mut infra = stack("InfraStack");
        let cluster = infra.add(&["ecs"], Resource::new("AWS::ECS::Cluster")).unwrap();
        let mut svc = stack("EcsSvcStack");
        svc.add(
            &["Service"],
            Resource::new("AWS::ECS::Service")
                .property("Cluster", infra.reference(&cluster))
                .property("ClusterArn", infra.attribute(&cluster, "Arn")),
        )
        .unwrap();
        (infra, svc, cluster)
    }

    #[test]
    fn test_cross_stack_reference_becomes_import_and_export() {
        let (infra, svc, cluster) = producer_consumer();
        let assembly = Assembly::synthesize(vec![infra, svc]).unwrap();

        let svc = assembly.stack("EcsSvcStack").unwrap();
        let (_, service) = svc.template.resources_of_type("AWS::ECS::Service").next().unwrap();
        assert_eq!(
            service.get("Cluster"),
            Some(&Expr::ImportValue(format!("InfraStack:ExportsOutputRef{cluster}")))
        );
        assert_eq!(
            service.get("ClusterArn"),
            Some(&Expr::ImportValue(format!("InfraStack:ExportsOutputFnGetAtt{cluster}Arn")))
        );
        assert_eq!(svc.dependencies, vec!["InfraStack".to_string()]);

        let infra = assembly.stack("InfraStack").unwrap();
        let export = &infra.template.outputs[&format!("ExportsOutputRef{cluster}")];
        assert_eq!(export.value, Expr::Ref(cluster.clone()));
        assert_eq!(
            export.export.as_ref().map(|e| e.name.as_str()),
            Some(format!("InfraStack:ExportsOutputRef{cluster}").as_str())
        );
    }

    #[test]
    fn test_same_stack_reference_becomes_ref() {
        let mut infra = stack("InfraStack");
        let vpc = infra.add(&["vpc"], Resource::new("AWS::EC2::VPC")).unwrap();
        infra
            .add(
                &["subnet"],
                Resource::new("AWS::EC2::Subnet").property("VpcId", infra.reference(&vpc)),
            )
            .unwrap();
        let assembly = Assembly::synthesize(vec![infra]).unwrap();
        let t = &assembly.stacks()[0].template;
        let (_, subnet) = t.resources_of_type("AWS::EC2::Subnet").next().unwrap();
        assert_eq!(subnet.get("VpcId"), Some(&Expr::Ref(vpc)));
        assert!(t.outputs.is_empty());
    }

    #[test]
    fn test_producers_deploy_first_regardless_of_declaration_order() {
        let (infra, svc, _) = producer_consumer();
        let assembly = Assembly::synthesize(vec![svc, infra]).unwrap();
        let names: Vec<&str> = assembly.stacks().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["InfraStack", "EcsSvcStack"]);
    }

    #[test]
    fn test_independent_stacks_keep_declaration_order() {
        let mut b = stack("B");
        b.add(&["x"], Resource::new("AWS::SNS::Topic")).unwrap();
        let mut a = stack("A");
        a.add(&["x"], Resource::new("AWS::SNS::Topic")).unwrap();
        let assembly = Assembly::synthesize(vec![b, a]).unwrap();
        assert_eq!(assembly.stacks()[0].name, "B");
    }

    #[test]
    fn test_unknown_stack_is_rejected() {
        let mut svc = stack("EcsSvcStack");
        svc.add(
            &["Service"],
            Resource::new("AWS::ECS::Service").property("Cluster", Reference::new("Nope", "X")),
        )
        .unwrap();
        let err = Assembly::synthesize(vec![svc]).unwrap_err();
        assert!(matches!(err, CompositionError::UnknownStack { .. }));
    }

    #[test]
    fn test_dangling_logical_id_is_rejected() {
        let infra = stack("InfraStack");
        let mut svc = stack("EcsSvcStack");
        svc.add(
            &["Service"],
            Resource::new("AWS::ECS::Service").property("Cluster", infra.reference("Missing")),
        )
        .unwrap();
        let err = Assembly::synthesize(vec![infra, svc]).unwrap_err();
        assert!(matches!(err, CompositionError::DanglingReference { .. }));
    }

    #[test]
    fn test_cross_region_import_is_rejected() {
        let mut infra = Stack::new("InfraStack", env("eu-west-1")).unwrap();
        let cluster = infra.add(&["ecs"], Resource::new("AWS::ECS::Cluster")).unwrap();
        let mut svc = Stack::new("EcsSvcStack", env("us-east-1")).unwrap();
        svc.add(
            &["Service"],
            Resource::new("AWS::ECS::Service").property("Cluster", infra.reference(&cluster)),
        )
        .unwrap();
        let err = Assembly::synthesize(vec![infra, svc]).unwrap_err();
        assert!(matches!(err, CompositionError::CrossEnvironmentReference { .. }));
    }

    #[test]
    fn test_cycle_is_rejected() {
        let mut a = stack("A");
        let mut b = stack("B");
        let ta = a.add(&["t"], Resource::new("AWS::SNS::Topic")).unwrap();
        let tb = b.add(&["t"], Resource::new("AWS::SNS::Topic")).unwrap();
        a.add(&["s"], Resource::new("AWS::SNS::Subscription").property("TopicArn", b.reference(&tb)))
            .unwrap();
        b.add(&["s"], Resource::new("AWS::SNS::Subscription").property("TopicArn", a.reference(&ta)))
            .unwrap();
        let err = Assembly::synthesize(vec![a, b]).unwrap_err();
        assert_eq!(err, CompositionError::DependencyCycle(vec!["A".into(), "B".into()]));
    }

    #[test]
    fn test_duplicate_stack_names_are_rejected() {
        let err = Assembly::synthesize(vec![stack("A"), stack("A")]).unwrap_err();
        assert_eq!(err, CompositionError::DuplicateStack("A".into()));
    }

    #[test]
    fn test_manifest_lists_stacks_in_deploy_order() {
        let (infra, svc, _) = producer_consumer();
        let assembly = Assembly::synthesize(vec![infra, svc]).unwrap();
        let manifest = assembly.manifest().unwrap();
        assert_eq!(manifest.deploy_order, vec!["InfraStack", "EcsSvcStack"]);
        let svc = &manifest.artifacts["EcsSvcStack"];
        assert_eq!(svc.template_file, "EcsSvcStack.template.json");
        assert_eq!(svc.dependencies, vec!["InfraStack"]);
        assert_eq!(svc.environment, "aws://unknown-account/unknown-region");
        assert_eq!(svc.template_sha256.len(), 64);
    }
}
