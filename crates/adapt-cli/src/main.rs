mod cli;
mod commands;
mod config;
mod error;
mod logging;
mod progress;

use crate::cli::{Cli, Commands};
use crate::error::Result;
use clap::Parser;
use tracing::{debug, error, info};

fn main() {
    if let Err(e) = run_app() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run_app() -> Result<()> {
    let cli = Cli::parse();
    logging::setup_logging(cli.verbose, cli.quiet, cli.log_file.as_deref())?;

    info!("adaptflow CLI v{} starting up.", env!("CARGO_PKG_VERSION"));
    debug!("Full CLI arguments parsed: {:?}", &cli);

    let command_result = match cli.command {
        Commands::Distance(args) => {
            info!("Dispatching to 'distance' command.");
            commands::distance::run(args)
        }
        Commands::Site(args) => {
            info!("Dispatching to 'site' command.");
            commands::site::run(args)
        }
        Commands::Plan(args) => {
            info!("Dispatching to 'plan' command.");
            commands::plan::run(args)
        }
    };

    match &command_result {
        Ok(()) => info!("Command completed successfully."),
        Err(e) => error!("Command failed: {}", e),
    }
    command_result
}
