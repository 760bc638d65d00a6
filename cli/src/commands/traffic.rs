//! `ecsforge traffic`: blue/green promotion planning.

use std::process::ExitCode;

use anyhow::Result;
use clap::Subcommand;

use crate::app::AppContext;
use crate::domain::handles::Color;
use crate::domain::traffic::promotion_plan;

/// Traffic subcommands.
#[derive(Subcommand)]
pub enum TrafficCommand {
    /// Show the states and listener bindings of a promotion
    Plan {
        /// Color that currently receives production traffic
        #[arg(long, default_value = "blue")]
        from: Color,
    },
}

/// Run the traffic command.
///
/// # Errors
///
/// Returns an error if rendering fails.
pub fn run(app: &AppContext, cmd: TrafficCommand) -> Result<ExitCode> {
    match cmd {
        TrafficCommand::Plan { from } => {
            let steps = promotion_plan(from)?;
            app.renderer().render_traffic_plan(&steps)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
