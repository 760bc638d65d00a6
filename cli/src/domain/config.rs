//! Domain types for the ecsforge configuration file.
//!
//! Pure types only: no I/O, no filesystem access. Every threshold has an
//! explicit default so an absent file yields the demo topology.

use ecsforge_common::{DeletionPolicy, Environment};
use serde::{Deserialize, Serialize};

use crate::domain::foundation::FoundationConfig;
use crate::domain::service::{ImageConfig, ServiceConfig};

// ── Shared enums ─────────────────────────────────────────────────────────────

/// What happens to a data-bearing resource when it leaves its stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Removal {
    Delete,
    Retain,
}

impl From<Removal> for DeletionPolicy {
    fn from(value: Removal) -> Self {
        match value {
            Removal::Delete => DeletionPolicy::Delete,
            Removal::Retain => DeletionPolicy::Retain,
        }
    }
}

/// How services are placed relative to the foundation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    /// Foundation and each service in their own stacks.
    #[default]
    Split,
    /// Every service declared inside the foundation stack.
    Combined,
}

// ── Config schema ────────────────────────────────────────────────────────────

/// Top-level configuration stored in `ecsforge.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ForgeConfig {
    /// Default deployment target for every stack.
    pub environment: Environment,
    pub layout: Layout,
    pub foundation: FoundationConfig,
    pub services: Vec<ServiceConfig>,
}

impl Default for ForgeConfig {
    fn default() -> Self {
        Self {
            environment: Environment::default(),
            layout: Layout::Split,
            foundation: FoundationConfig::default(),
            services: vec![ServiceConfig {
                stack: Some("EcsSvcStack".to_string()),
                image: Some(ImageConfig::default()),
                ..ServiceConfig::default()
            }],
        }
    }
}
