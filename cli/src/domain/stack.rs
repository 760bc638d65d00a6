//! Stack scope: the unit of deployment that constructs add resources to.
//!
//! Pure data manipulation: no I/O.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use ecsforge_common::{
    Environment, Expr, Output, Reference, Resource, Template, is_valid_logical_id, logical_id,
};
use regex::Regex;

use crate::domain::error::CompositionError;

static STACK_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^[A-Za-z][A-Za-z0-9-]{0,127}$").expect("valid regex")
});

/// Validates a CloudFormation stack name.
///
/// # Errors
///
/// Returns [`CompositionError::InvalidStackName`] if the name does not match.
pub fn validate_stack_name(name: &str) -> Result<(), CompositionError> {
    if STACK_NAME_RE.is_match(name) {
        Ok(())
    } else {
        Err(CompositionError::InvalidStackName(name.to_string()))
    }
}

/// A stack under construction.
///
/// Resources are keyed by logical IDs derived from their construct path, so
/// the same declaration always lands on the same ID.
#[derive(Debug, Clone)]
pub struct Stack {
    name: String,
    environment: Environment,
    template: Template,
    paths: BTreeSet<String>,
}

impl Stack {
    /// Create an empty stack.
    ///
    /// # Errors
    ///
    /// Returns an error if `name` is not a valid stack name.
    pub fn new(name: &str, environment: Environment) -> Result<Self, CompositionError> {
        validate_stack_name(name)?;
        Ok(Self {
            name: name.to_string(),
            environment,
            template: Template::default(),
            paths: BTreeSet::new(),
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    #[must_use]
    pub fn template(&self) -> &Template {
        &self.template
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.template.description = Some(description.into());
    }

    /// Logical ID the construct at `path` gets in this stack.
    #[must_use]
    pub fn logical_id_for(&self, path: &[&str]) -> String {
        let mut full = Vec::with_capacity(path.len() + 1);
        full.push(self.name.as_str());
        full.extend_from_slice(path);
        logical_id(&full)
    }

    /// Add a resource at `path` (relative to the stack) and return its logical ID.
    ///
    /// # Errors
    ///
    /// Returns [`CompositionError::DuplicateConstruct`] if the path is taken.
    pub fn add(&mut self, path: &[&str], resource: Resource) -> Result<String, CompositionError> {
        let joined = path.join("/");
        if !self.paths.insert(joined.clone()) {
            return Err(CompositionError::DuplicateConstruct {
                stack: self.name.clone(),
                path: joined,
            });
        }
        let id = self.logical_id_for(path);
        tracing::trace!(stack = %self.name, path = %joined, logical_id = %id, "resource added");
        self.template.resources.insert(id.clone(), resource);
        Ok(id)
    }

    /// Add a named output.
    ///
    /// # Errors
    ///
    /// Returns [`CompositionError::DuplicateOutput`] if the ID is taken or
    /// not a valid logical ID.
    pub fn add_output(&mut self, id: &str, output: Output) -> Result<(), CompositionError> {
        if !is_valid_logical_id(id) || self.template.outputs.contains_key(id) {
            return Err(CompositionError::DuplicateOutput {
                stack: self.name.clone(),
                output: id.to_string(),
            });
        }
        self.template.outputs.insert(id.to_string(), output);
        Ok(())
    }

    /// `Ref` to a resource of this stack.
    #[must_use]
    pub fn reference(&self, logical_id: &str) -> Reference {
        Reference::new(&self.name, logical_id)
    }

    /// `Fn::GetAtt` of a resource of this stack.
    #[must_use]
    pub fn attribute(&self, logical_id: &str, attribute: &str) -> Reference {
        Reference::attribute(&self.name, logical_id, attribute)
    }

    pub(crate) fn references(&self) -> Vec<&Reference> {
        self.template
            .resources
            .values()
            .flat_map(Resource::references)
            .chain(self.template.outputs.values().flat_map(|o| o.value.references()))
            .collect()
    }

    /// `(resource, depends_on)` pairs whose target is not in this stack.
    pub(crate) fn dangling_depends_on(&self) -> Vec<(String, String)> {
        self.template
            .resources
            .iter()
            .flat_map(|(id, r)| r.depends_on.iter().map(move |dep| (id, dep)))
            .filter(|(_, dep)| !self.template.resources.contains_key(*dep))
            .map(|(id, dep)| (id.clone(), dep.clone()))
            .collect()
    }

    pub(crate) fn resolve_references<F>(&mut self, mut f: F)
    where
        F: FnMut(&Reference) -> Expr,
    {
        let mut infallible = |r: &Reference| Ok::<_, std::convert::Infallible>(f(r));
        for resource in self.template.resources.values_mut() {
            for value in resource.properties.values_mut() {
                let Ok(()) = value.resolve_with(&mut infallible);
            }
        }
        for output in self.template.outputs.values_mut() {
            let Ok(()) = output.value.resolve_with(&mut infallible);
        }
    }

    pub(crate) fn insert_export(&mut self, id: String, output: Output) {
        self.template.outputs.entry(id).or_insert(output);
    }

    pub(crate) fn into_parts(self) -> (String, Environment, Template) {
        (self.name, self.environment, self.template)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    fn stack(name: &str) -> Stack {
        Stack::new(name, Environment::default()).expect("valid stack")
    }

    #[test]
    fn test_validate_stack_name_accepts_cloudformation_names() {
        assert!(validate_stack_name("InfraStack").is_ok());
        assert!(validate_stack_name("ecs-svc-2").is_ok());
    }

    #[test]
    fn test_validate_stack_name_rejects_bad_names() {
        let long = "a".repeat(129);
        for bad in ["", "1Stack", "my_stack", "with space", long.as_str()] {
            assert!(validate_stack_name(bad).is_err(), "accepted: {bad}");
        }
    }

    #[test]
    fn test_add_returns_path_derived_id() {
        let mut s = stack("InfraStack");
        let id = s.add(&["LogBucket"], Resource::new("AWS::S3::Bucket")).unwrap();
        assert_eq!(id, s.logical_id_for(&["LogBucket"]));
        assert!(id.starts_with("LogBucket"));
        assert!(s.template().resources.contains_key(&id));
    }

    #[test]
    fn test_add_rejects_duplicate_path() {
        let mut s = stack("InfraStack");
        s.add(&["LogBucket"], Resource::new("AWS::S3::Bucket")).unwrap();
        let err = s
            .add(&["LogBucket"], Resource::new("AWS::S3::Bucket"))
            .unwrap_err();
        assert!(matches!(err, CompositionError::DuplicateConstruct { .. }));
    }

    #[test]
    fn test_add_output_rejects_duplicates_and_bad_ids() {
        let mut s = stack("InfraStack");
        s.add_output("ClusterName", Output::new("x")).unwrap();
        assert!(s.add_output("ClusterName", Output::new("y")).is_err());
        assert!(s.add_output("Cluster-Name", Output::new("y")).is_err());
    }

    #[test]
    fn test_dangling_depends_on_is_reported() {
        let mut s = stack("InfraStack");
        s.add(&["Route"], Resource::new("AWS::EC2::Route").depends_on("Missing"))
            .unwrap();
        let dangling = s.dangling_depends_on();
        assert_eq!(dangling.len(), 1);
        assert_eq!(dangling[0].1, "Missing");
    }

    #[test]
    fn test_resolve_references_rewrites_properties_and_outputs() {
        let mut s = stack("Svc");
        let remote = Reference::new("Infra", "Cluster");
        s.add(
            &["Service"],
            Resource::new("AWS::ECS::Service").property("Cluster", remote.clone()),
        )
        .unwrap();
        s.add_output("ClusterName", Output::new(remote)).unwrap();

        s.resolve_references(|r| Expr::ImportValue(format!("{}:{}", r.stack, r.logical_id)));

        assert!(s.references().is_empty());
        assert_eq!(
            s.template().outputs["ClusterName"].value,
            Expr::ImportValue("Infra:Cluster".into())
        );
    }
}
