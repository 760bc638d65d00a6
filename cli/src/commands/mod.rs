//! Command implementations

pub mod config;
pub mod list;
pub mod synth;
pub mod traffic;
pub mod validate;
pub mod version;
