//! JSON output helpers.
//!
//! Provides the machine-readable renderer and the error-object formatter used
//! by all `--json` code paths when a command fails.

use std::path::Path;

use anyhow::{Context, Result};
use serde_json::json;

use crate::application::services::synth::SynthOutcome;
use crate::domain::assembly::Assembly;
use crate::domain::config::ForgeConfig;
use crate::domain::invariants::Violation;
use crate::domain::traffic::PlanStep;

/// Format a JSON error object.
///
/// Output (pretty-printed):
/// ```json
/// {
///   "error": true,
///   "message": "...",
///   "code": "..."
/// }
/// ```
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn format_error(message: &str, code: &str) -> Result<String> {
    let obj = json!({
        "error": true,
        "message": message,
        "code": code,
    });
    serde_json::to_string_pretty(&obj).context("JSON serialization failed")
}

fn print(value: &serde_json::Value) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("JSON serialization failed")?
    );
    Ok(())
}

fn stacks_json(assembly: &Assembly) -> serde_json::Value {
    assembly
        .stacks()
        .iter()
        .map(|s| {
            json!({
                "name": s.name,
                "environment": s.environment.to_string(),
                "dependencies": s.dependencies,
                "resources": s.template.resources.len(),
                "outputs": s.template.outputs.len(),
            })
        })
        .collect()
}

/// Renders domain types as JSON on stdout.
pub struct JsonRenderer;

impl JsonRenderer {
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_version(&self, version: &str) -> Result<()> {
        print(&json!({ "version": version }))
    }

    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_synth(&self, outcome: &SynthOutcome) -> Result<()> {
        print(&json!({
            "directory": outcome.written.directory,
            "templates": outcome.written.templates,
            "manifest": outcome.written.manifest,
            "stacks": stacks_json(&outcome.plan.assembly),
            "violations": outcome.plan.violations,
        }))
    }

    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_stacks(&self, assembly: &Assembly) -> Result<()> {
        print(&json!({ "stacks": stacks_json(assembly) }))
    }

    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_validation(&self, assembly: &Assembly, violations: &[Violation]) -> Result<()> {
        print(&json!({
            "valid": violations.is_empty(),
            "stacks": stacks_json(assembly),
            "violations": violations,
        }))
    }

    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_config(&self, config: &ForgeConfig, path: &Path) -> Result<()> {
        print(&json!({ "path": path, "config": config }))
    }

    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_traffic_plan(&self, steps: &[PlanStep]) -> Result<()> {
        print(&json!({ "steps": steps }))
    }
}
