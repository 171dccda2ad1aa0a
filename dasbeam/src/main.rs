use clap::Parser;
use dasbeam_lib::{BeamformError, PersistenceError};
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};

mod beamform;
mod cli;

use crate::beamform::{run_beamform, run_info};
use crate::cli::{Cli, Commands};

/// Exit status after an interrupted reconstruction
const EXIT_CANCELLED: i32 = 130;

fn main() {
    let cli = Cli::parse();

    if let Err(e) = TermLogger::init(
        cli.loglevel,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    ) {
        eprintln!("Couldn't initialize logger. Error: {:?}", e);
    }

    let result = match cli.command {
        Commands::Beamform(args) => run_beamform(args),
        Commands::Info(args) => run_info(args),
    };

    match result {
        Ok(()) => {}
        Err(PersistenceError::Beamform(BeamformError::Cancelled)) => {
            log::warn!("Reconstruction cancelled");
            std::process::exit(EXIT_CANCELLED);
        }
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(1);
        }
    }
}
