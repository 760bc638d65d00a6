//! `ecsforge synth`: compose, verify and write the cloud assembly.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::application::ports::AssemblyWriter;
use crate::application::services::synth::{self, DEFAULT_OUT_DIR, SynthOptions};
use crate::domain::handles::Color;

/// Arguments for the synth command.
#[derive(Args)]
pub struct SynthArgs {
    /// Output directory for templates and the manifest
    #[arg(long, short, default_value = DEFAULT_OUT_DIR)]
    pub out: PathBuf,

    /// Target group that production traffic is bound to (blue or green)
    #[arg(long)]
    pub live: Option<Color>,

    /// Write the assembly even when invariant checks fail
    #[arg(long)]
    pub allow_violations: bool,
}

/// Run `ecsforge synth`.
///
/// # Errors
///
/// Returns an error if composition fails, an invariant is violated, or the
/// output directory cannot be written.
pub fn run(app: &AppContext, args: SynthArgs) -> Result<ExitCode> {
    let existing = app.writer.existing_entries(&args.out)?;
    if !existing.is_empty() {
        if !app.is_json() {
            app.output.warn(&format!(
                "{} is not empty ({} entries)",
                args.out.display(),
                existing.len()
            ));
        }
        if !app.confirm("Overwrite?", true)? {
            app.output.info("Cancelled.");
            return Ok(ExitCode::SUCCESS);
        }
    }

    let opts = SynthOptions {
        out_dir: args.out,
        live: args.live,
        allow_violations: args.allow_violations,
    };
    let reporter = app.reporter();
    let outcome = synth::synthesize(&app.config_store, &app.writer, &reporter, &opts)?;
    app.renderer().render_synth(&outcome)?;
    Ok(ExitCode::SUCCESS)
}
