//! Template, resource and output documents.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::digest::sha256_hex;
use crate::error::TemplateError;
use crate::intrinsic::{Expr, Reference};

pub const TEMPLATE_FORMAT_VERSION: &str = "2010-09-09";

/// What CloudFormation does with a resource when it leaves the stack.
///
/// Provisioning engines default to keeping most data-bearing resources, so
/// every resource that stores something sets this explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeletionPolicy {
    Delete,
    Retain,
    Snapshot,
}

/// A single entry under `Resources`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resource {
    #[serde(rename = "Type")]
    pub resource_type: String,
    #[serde(rename = "Properties", skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, Expr>,
    #[serde(rename = "DependsOn", skip_serializing_if = "BTreeSet::is_empty")]
    pub depends_on: BTreeSet<String>,
    #[serde(rename = "DeletionPolicy", skip_serializing_if = "Option::is_none")]
    pub deletion_policy: Option<DeletionPolicy>,
    #[serde(rename = "UpdateReplacePolicy", skip_serializing_if = "Option::is_none")]
    pub update_replace_policy: Option<DeletionPolicy>,
}

impl Resource {
    #[must_use]
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            properties: BTreeMap::new(),
            depends_on: BTreeSet::new(),
            deletion_policy: None,
            update_replace_policy: None,
        }
    }

    #[must_use]
    pub fn property(mut self, key: impl Into<String>, value: impl Into<Expr>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn depends_on(mut self, logical_id: impl Into<String>) -> Self {
        self.depends_on.insert(logical_id.into());
        self
    }

    /// Sets both `DeletionPolicy` and `UpdateReplacePolicy`.
    #[must_use]
    pub fn removal_policy(mut self, policy: DeletionPolicy) -> Self {
        self.deletion_policy = Some(policy);
        self.update_replace_policy = Some(policy);
        self
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Expr> {
        self.properties.get(key)
    }

    /// Walk a property path, e.g. `["S3DestinationConfiguration", "RoleARN"]`.
    #[must_use]
    pub fn pointer(&self, keys: &[&str]) -> Option<&Expr> {
        let (first, rest) = keys.split_first()?;
        self.properties.get(*first)?.pointer(rest)
    }

    /// References anywhere in the properties.
    pub fn references(&self) -> impl Iterator<Item = &Reference> {
        self.properties.values().flat_map(Expr::references)
    }
}

/// Export block of an output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Export {
    #[serde(rename = "Name")]
    pub name: String,
}

/// A single entry under `Outputs`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Output {
    #[serde(rename = "Description", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "Value")]
    pub value: Expr,
    #[serde(rename = "Export", skip_serializing_if = "Option::is_none")]
    pub export: Option<Export>,
}

impl Output {
    #[must_use]
    pub fn new(value: impl Into<Expr>) -> Self {
        Self {
            description: None,
            value: value.into(),
            export: None,
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn exported_as(mut self, name: impl Into<String>) -> Self {
        self.export = Some(Export { name: name.into() });
        self
    }
}

/// A complete CloudFormation template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Template {
    #[serde(rename = "AWSTemplateFormatVersion")]
    pub format_version: String,
    #[serde(rename = "Description", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "Resources")]
    pub resources: BTreeMap<String, Resource>,
    #[serde(rename = "Outputs", skip_serializing_if = "BTreeMap::is_empty")]
    pub outputs: BTreeMap<String, Output>,
}

impl Default for Template {
    fn default() -> Self {
        Self {
            format_version: TEMPLATE_FORMAT_VERSION.to_string(),
            description: None,
            resources: BTreeMap::new(),
            outputs: BTreeMap::new(),
        }
    }
}

impl Template {
    /// Resources of the given CloudFormation type, in logical-ID order.
    pub fn resources_of_type<'a>(
        &'a self,
        resource_type: &'a str,
    ) -> impl Iterator<Item = (&'a String, &'a Resource)> {
        self.resources
            .iter()
            .filter(move |(_, r)| r.resource_type == resource_type)
    }

    fn first_unresolved(&self) -> Option<&Reference> {
        self.resources
            .values()
            .flat_map(Resource::references)
            .chain(self.outputs.values().flat_map(|o| o.value.references()))
            .next()
    }

    /// Render the template as a JSON value.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::UnresolvedReference`] while any cross-stack
    /// reference is still symbolic.
    pub fn to_value(&self) -> Result<serde_json::Value, TemplateError> {
        self.ensure_resolved()?;
        Ok(serde_json::to_value(self)?)
    }

    /// Render the template as pretty JSON with a trailing newline.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Template::to_value`].
    pub fn to_json_pretty(&self) -> Result<String, TemplateError> {
        self.ensure_resolved()?;
        let mut body = serde_json::to_string_pretty(self)?;
        body.push('\n');
        Ok(body)
    }

    /// SHA-256 of the pretty JSON rendering.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Template::to_value`].
    pub fn digest(&self) -> Result<String, TemplateError> {
        Ok(sha256_hex(self.to_json_pretty()?.as_bytes()))
    }

    fn ensure_resolved(&self) -> Result<(), TemplateError> {
        match self.first_unresolved() {
            Some(r) => Err(TemplateError::UnresolvedReference {
                stack: r.stack.clone(),
                logical_id: r.logical_id.clone(),
            }),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn bucket() -> Resource {
        Resource::new("AWS::S3::Bucket").removal_policy(DeletionPolicy::Delete)
    }

    #[test]
    fn resource_without_properties_omits_the_block() {
        let value = serde_json::to_value(bucket()).unwrap();
        assert_eq!(
            value,
            json!({
                "Type": "AWS::S3::Bucket",
                "DeletionPolicy": "Delete",
                "UpdateReplacePolicy": "Delete"
            })
        );
    }

    #[test]
    fn depends_on_is_sorted_and_deduplicated() {
        let r = Resource::new("AWS::EC2::Route")
            .depends_on("B")
            .depends_on("A")
            .depends_on("B");
        let value = serde_json::to_value(r).unwrap();
        assert_eq!(value["DependsOn"], json!(["A", "B"]));
    }

    #[test]
    fn template_renders_version_and_exports() {
        let mut t = Template::default();
        t.resources.insert("Bucket".into(), bucket());
        t.outputs.insert(
            "ExportsOutputRefBucket".into(),
            Output::new(Expr::Ref("Bucket".into())).exported_as("Infra:ExportsOutputRefBucket"),
        );
        let value = t.to_value().unwrap();
        assert_eq!(value["AWSTemplateFormatVersion"], "2010-09-09");
        assert_eq!(
            value["Outputs"]["ExportsOutputRefBucket"]["Export"]["Name"],
            "Infra:ExportsOutputRefBucket"
        );
    }

    #[test]
    fn unresolved_template_cannot_render() {
        let mut t = Template::default();
        t.resources.insert(
            "Policy".into(),
            Resource::new("AWS::IAM::Policy").property(
                "Roles",
                Expr::list([Expr::from(Reference::new("Other", "Role"))]),
            ),
        );
        let err = t.to_json_pretty().unwrap_err();
        assert!(matches!(err, TemplateError::UnresolvedReference { .. }));
    }

    #[test]
    fn digest_is_stable_for_equal_templates() {
        let mut a = Template::default();
        a.resources.insert("Bucket".into(), bucket());
        let b = a.clone();
        assert_eq!(a.digest().unwrap(), b.digest().unwrap());
        assert!(a.to_json_pretty().unwrap().ends_with('\n'));
    }

    #[test]
    fn pointer_reads_nested_properties() {
        let r = Resource::new("AWS::KinesisFirehose::DeliveryStream").property(
            "S3DestinationConfiguration",
            Expr::object([(
                "BufferingHints",
                Expr::object([("SizeInMBs", Expr::Int(1))]),
            )]),
        );
        assert_eq!(
            r.pointer(&["S3DestinationConfiguration", "BufferingHints", "SizeInMBs"])
                .and_then(Expr::as_i64),
            Some(1)
        );
    }
}
