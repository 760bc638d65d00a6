//! `ecsforge list`: stacks in deployment order.

use std::process::ExitCode;

use anyhow::Result;

use crate::app::AppContext;
use crate::application::services::config_service;
use crate::domain::compose;

/// Run `ecsforge list`.
///
/// # Errors
///
/// Returns an error if the configuration cannot be loaded or composed.
pub fn run(app: &AppContext) -> Result<ExitCode> {
    let config = config_service::load_config(&app.config_store)?;
    let assembly = compose(&config)?;
    app.renderer().render_stacks(&assembly)?;
    Ok(ExitCode::SUCCESS)
}
