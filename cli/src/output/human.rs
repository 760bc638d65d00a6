//! Human-readable terminal renderer.

use std::path::Path;

use anyhow::{Context, Result};
use owo_colors::OwoColorize as _;

use crate::application::services::synth::SynthOutcome;
use crate::domain::assembly::Assembly;
use crate::domain::config::ForgeConfig;
use crate::domain::invariants::Violation;
use crate::domain::traffic::PlanStep;
use crate::output::OutputContext;

/// Renders domain types as human-readable terminal output using `OutputContext`.
pub struct HumanRenderer<'a> {
    ctx: &'a OutputContext,
}

impl<'a> HumanRenderer<'a> {
    /// Create a new `HumanRenderer` wrapping the given output context.
    #[must_use]
    pub fn new(ctx: &'a OutputContext) -> Self {
        Self { ctx }
    }

    /// Render the CLI version information.
    pub fn render_version(&self, version: &str) {
        if self.ctx.quiet {
            return;
        }
        println!("ecsforge {version}");
    }

    /// Render the files a synthesis wrote.
    pub fn render_synth(&self, outcome: &SynthOutcome) {
        if self.ctx.quiet {
            return;
        }
        println!();
        self.ctx.header("Templates:");
        for path in &outcome.written.templates {
            self.ctx.kv("  ", &path.display().to_string());
        }
        self.ctx.kv("Manifest:", &outcome.written.manifest.display().to_string());
        if !outcome.plan.violations.is_empty() {
            self.ctx.warn(&format!(
                "written with {} invariant violation(s)",
                outcome.plan.violations.len()
            ));
        }
    }

    /// Render stacks in deployment order.
    pub fn render_stacks(&self, assembly: &Assembly) {
        for (i, stack) in assembly.stacks().iter().enumerate() {
            if i > 0 {
                println!();
            }
            println!("  {}", stack.name.style(self.ctx.styles.bold));
            self.ctx.kv("Environment: ", &stack.environment.to_string());
            self.ctx.kv("Resources:   ", &stack.template.resources.len().to_string());
            self.ctx.kv("Outputs:     ", &stack.template.outputs.len().to_string());
            let deps = if stack.dependencies.is_empty() {
                "-".to_string()
            } else {
                stack.dependencies.join(", ")
            };
            self.ctx.kv("Depends on:  ", &deps);
        }
    }

    /// Render invariant check results.
    pub fn render_validation(&self, assembly: &Assembly, violations: &[Violation]) {
        if violations.is_empty() {
            self.ctx.success(&format!(
                "{} stack(s) composed, all invariants hold",
                assembly.stacks().len()
            ));
            return;
        }
        for violation in violations {
            self.ctx.error(&violation.to_string());
        }
    }

    /// Render the effective configuration as YAML.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be serialized.
    pub fn render_config(&self, config: &ForgeConfig, path: &Path) -> Result<()> {
        let body = serde_yaml::to_string(config).context("cannot serialize config")?;
        if !self.ctx.quiet {
            self.ctx.header(&format!("Configuration ({})", path.display()));
            println!();
        }
        print!("{body}");
        Ok(())
    }

    /// Render each state of a promotion with its listener bindings.
    pub fn render_traffic_plan(&self, steps: &[PlanStep]) {
        for (i, step) in steps.iter().enumerate() {
            let styles = &self.ctx.styles;
            println!(
                "  {}. {:<24} production → {}  test → {}",
                i + 1,
                step.state.to_string(),
                step.production.style(styles.color(step.production)),
                step.test.style(styles.color(step.test)),
            );
        }
    }
}
