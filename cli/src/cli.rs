//! CLI argument parsing with clap derive

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::app::{AppContext, AppFlags, BehaviourFlags, OutputFlags};
use crate::commands;

/// Compose ECS Fargate services and their shared foundation into CloudFormation templates
#[derive(Parser)]
#[command(
    name = "ecsforge",
    version,
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR", value_parser = clap::builder::FalseyValueParser::new())]
    pub no_color: bool,

    /// Skip confirmation prompts
    #[arg(short, long, global = true)]
    pub yes: bool,

    /// Configuration file (default: $ECSFORGE_CONFIG or ./ecsforge.yaml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log debug events to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Synthesize templates and the manifest
    Synth(commands::synth::SynthArgs),

    /// List stacks in deployment order
    List,

    /// Compose and check invariants without writing anything
    Validate,

    /// Manage configuration
    #[command(subcommand)]
    Config(commands::config::ConfigCommand),

    /// Plan blue/green traffic promotion
    #[command(subcommand)]
    Traffic(commands::traffic::TrafficCommand),

    /// Show version
    Version,
}

impl Cli {
    /// Execute the CLI command.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails.
    pub fn run(self) -> Result<ExitCode> {
        let Cli {
            json,
            quiet,
            no_color,
            yes,
            config,
            verbose: _,
            command,
        } = self;

        let app = AppContext::new(AppFlags {
            output: OutputFlags {
                no_color,
                quiet,
                json,
            },
            behaviour: BehaviourFlags { yes, config },
        });

        match command {
            Command::Synth(args) => commands::synth::run(&app, args),
            Command::List => commands::list::run(&app),
            Command::Validate => commands::validate::run(&app),
            Command::Config(cmd) => commands::config::run(&app, cmd),
            Command::Traffic(cmd) => commands::traffic::run(&app, cmd),
            Command::Version => commands::version::run(&app),
        }
    }
}
