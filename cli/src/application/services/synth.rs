//! Application service: synthesis use-cases.
//!
//! Load → compose → verify → write. Nothing is written unless composition
//! succeeds and, by default, every invariant holds.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};

use crate::application::ports::{AssemblyWriter, ConfigStore, ProgressReporter, WrittenAssembly};
use crate::domain::assembly::Assembly;
use crate::domain::composition::compose;
use crate::domain::config::ForgeConfig;
use crate::domain::handles::Color;
use crate::domain::invariants::{Expectations, Violation, verify_with};

/// Default output directory.
pub const DEFAULT_OUT_DIR: &str = "ecsforge.out";

/// Options for [`synthesize`].
#[derive(Debug, Clone)]
pub struct SynthOptions {
    pub out_dir: PathBuf,
    /// Overrides the configured live color of the blue/green topology.
    pub live: Option<Color>,
    /// Write the assembly even when invariant checks fail.
    pub allow_violations: bool,
}

impl Default for SynthOptions {
    fn default() -> Self {
        Self {
            out_dir: PathBuf::from(DEFAULT_OUT_DIR),
            live: None,
            allow_violations: false,
        }
    }
}

/// A composed and verified assembly.
#[derive(Debug, Clone)]
pub struct Plan {
    pub config: ForgeConfig,
    pub assembly: Assembly,
    pub violations: Vec<Violation>,
}

/// Result of [`synthesize`].
#[derive(Debug, Clone)]
pub struct SynthOutcome {
    pub plan: Plan,
    pub written: WrittenAssembly,
}

/// What the invariant checks should expect for `config`.
#[must_use]
pub fn expectations(config: &ForgeConfig) -> Expectations {
    Expectations {
        live: config
            .foundation
            .blue_green
            .as_ref()
            .map_or(Color::Blue, |bg| bg.live),
        log_bucket: config.foundation.log_pipeline.bucket_removal.into(),
    }
}

/// Load the configuration, apply `live`, compose and verify.
///
/// # Errors
///
/// Returns an error if the configuration cannot be loaded or composition
/// fails.
pub fn plan(
    store: &impl ConfigStore,
    reporter: &impl ProgressReporter,
    live: Option<Color>,
) -> Result<Plan> {
    let mut config = store.load()?;
    if let Some(live) = live {
        match config.foundation.blue_green.as_mut() {
            Some(bg) => bg.live = live,
            None => reporter.warn("--live has no effect: the foundation has no blue/green topology"),
        }
    }

    reporter.step("composing stacks...");
    let assembly = compose(&config)?;
    let violations = verify_with(&assembly, &expectations(&config));
    tracing::debug!(
        stacks = assembly.stacks().len(),
        violations = violations.len(),
        "assembly verified"
    );

    Ok(Plan {
        config,
        assembly,
        violations,
    })
}

/// Compose, verify and write the assembly.
///
/// # Errors
///
/// Returns an error if planning fails, an invariant is violated and
/// `allow_violations` is off, or the assembly cannot be written.
pub fn synthesize(
    store: &impl ConfigStore,
    writer: &impl AssemblyWriter,
    reporter: &impl ProgressReporter,
    opts: &SynthOptions,
) -> Result<SynthOutcome> {
    let plan = plan(store, reporter, opts.live)?;

    if !plan.violations.is_empty() {
        let list: Vec<String> = plan.violations.iter().map(|v| format!("  {v}")).collect();
        if !opts.allow_violations {
            bail!(
                "{} invariant violation(s):\n{}\n\nFix the configuration or pass --allow-violations.",
                plan.violations.len(),
                list.join("\n")
            );
        }
        for line in &list {
            reporter.warn(line.trim_start());
        }
    }

    reporter.step(&format!("writing assembly to {}...", opts.out_dir.display()));
    let written = writer
        .write(&plan.assembly, &opts.out_dir)
        .with_context(|| format!("cannot write assembly to {}", opts.out_dir.display()))?;
    reporter.success(&format!(
        "synthesized {} stack(s) into {}",
        written.templates.len(),
        written.directory.display()
    ));

    Ok(SynthOutcome { plan, written })
}
