//! Domain layer: pure composition logic, types, and validation.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `crate::output`, `std::fs`, or `std::process`.
//! All functions are synchronous and take data in, returning data out.

pub mod assembly;
pub mod composition;
pub mod config;
pub mod error;
pub mod foundation;
pub mod handles;
pub(crate) mod iam;
pub mod invariants;
pub mod load_balancer;
pub mod log_pipeline;
pub mod network;
pub mod service;
pub mod stack;
pub mod traffic;

pub use assembly::{Assembly, SynthesizedStack};
pub use composition::{App, compose};
pub use config::{ForgeConfig, Layout, Removal};
pub use error::{CompositionError, ConfigError, TrafficError};
pub use handles::Color;
pub use invariants::{Expectations, Violation, verify, verify_with};
pub use traffic::TrafficState;
