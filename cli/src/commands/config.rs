//! `ecsforge config`: show the effective configuration or write a starter file.

use std::process::ExitCode;

use anyhow::{Result, bail};
use clap::Subcommand;

use crate::app::AppContext;
use crate::application::ports::ConfigStore;
use crate::application::services::config_service;
use crate::domain::config::ForgeConfig;

/// Config subcommands.
#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show,
    /// Write the default configuration to the config path
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Run the config command.
///
/// # Errors
///
/// Returns an error if the configuration cannot be read or written.
pub fn run(app: &AppContext, cmd: ConfigCommand) -> Result<ExitCode> {
    match cmd {
        ConfigCommand::Show => show_config(app),
        ConfigCommand::Init { force } => init_config(app, force),
    }
}

fn show_config(app: &AppContext) -> Result<ExitCode> {
    let config = config_service::load_config(&app.config_store)?;
    let path = app.config_store.path()?;
    app.renderer().render_config(&config, &path)?;
    Ok(ExitCode::SUCCESS)
}

fn init_config(app: &AppContext, force: bool) -> Result<ExitCode> {
    let path = app.config_store.path()?;
    if path.exists() && !force {
        bail!(
            "{} already exists. Use --force to overwrite it.",
            path.display()
        );
    }

    let config = ForgeConfig::default();
    config_service::save_config(&app.config_store, &config)?;
    tracing::debug!(path = %path.display(), "wrote default configuration");

    if app.is_json() {
        app.renderer().render_config(&config, &path)?;
    } else {
        app.output.success(&format!("Wrote {}", path.display()));
    }
    Ok(ExitCode::SUCCESS)
}
