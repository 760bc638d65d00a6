//! CloudFormation document model shared by the ecsforge crates.
//!
//! Nothing in here knows about ECS, Firehose or load balancers. The crate only
//! models what ends up in a template file: values with intrinsic functions,
//! resources, outputs, deterministic logical IDs and the assembly manifest.

pub mod digest;
pub mod environment;
pub mod error;
pub mod intrinsic;
pub mod logical_id;
pub mod manifest;
pub mod template;

pub use digest::sha256_hex;
pub use environment::Environment;
pub use error::TemplateError;
pub use intrinsic::{Expr, Reference};
pub use logical_id::{is_valid_logical_id, logical_id};
pub use manifest::{ARTIFACT_TYPE_STACK, AssemblyManifest, MANIFEST_VERSION, StackArtifact};
pub use template::{DeletionPolicy, Output, Resource, TEMPLATE_FORMAT_VERSION, Template};
