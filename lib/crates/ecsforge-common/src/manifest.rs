//! Assembly manifest written next to the templates.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub const MANIFEST_VERSION: &str = "1";
pub const ARTIFACT_TYPE_STACK: &str = "aws:cloudformation:stack";

/// Index of every stack in an assembly, in deployment order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssemblyManifest {
    pub version: String,
    /// Stack names, dependencies before dependants.
    pub deploy_order: Vec<String>,
    pub artifacts: BTreeMap<String, StackArtifact>,
}

/// One deployable stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackArtifact {
    #[serde(rename = "type")]
    pub artifact_type: String,
    /// `aws://account/region`
    pub environment: String,
    pub template_file: String,
    /// Stacks that must be deployed before this one.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,
    pub template_sha256: String,
}

impl AssemblyManifest {
    #[must_use]
    pub fn new() -> Self {
        Self {
            version: MANIFEST_VERSION.to_string(),
            deploy_order: Vec::new(),
            artifacts: BTreeMap::new(),
        }
    }
}

impl Default for AssemblyManifest {
    fn default() -> Self {
        Self::new()
    }
}
