//! ecsforge - ECS Fargate composition CLI

use std::process::ExitCode;

use clap::Parser;

use ecsforge_cli::cli::Cli;
use ecsforge_cli::logging;
use ecsforge_cli::output::json;

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    let json_mode = cli.json;

    match cli.run() {
        Ok(code) => code,
        Err(e) => {
            if json_mode {
                match json::format_error(&format!("{e:#}"), "ECSFORGE_ERROR") {
                    Ok(body) => println!("{body}"),
                    Err(_) => eprintln!("Error: {e}"),
                }
            } else {
                eprintln!("Error: {e}");
            }
            ExitCode::FAILURE
        }
    }
}
