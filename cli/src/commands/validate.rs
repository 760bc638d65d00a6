//! `ecsforge validate`: compose and run the invariant checks.

use std::process::ExitCode;

use anyhow::Result;

use crate::app::AppContext;
use crate::application::services::synth;

/// Run `ecsforge validate`. Exits 1 when any invariant is violated.
///
/// # Errors
///
/// Returns an error if the configuration cannot be loaded or composed.
pub fn run(app: &AppContext) -> Result<ExitCode> {
    let reporter = app.reporter();
    let plan = synth::plan(&app.config_store, &reporter, None)?;
    app.renderer()
        .render_validation(&plan.assembly, &plan.violations)?;

    if plan.violations.is_empty() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}
