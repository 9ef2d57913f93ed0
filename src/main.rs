mod cli;
mod commands;
mod doctor;

use std::error::Error as _;
use std::process::ExitCode;

use clap::Parser;

use crate::cli::Cli;

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Some(mode) = cli.color {
        starknet_docker::set_color_mode(mode);
    }
    starknet_docker::telemetry::init_logging(cli.verbose);

    match commands::run(&cli) {
        Ok(()) => ExitCode::from(0),
        Err(e) => {
            let use_err = starknet_docker::color_enabled_stderr();
            starknet_docker::log_error_stderr(use_err, &format!("starknet-docker: {e}"));
            if cli.verbose {
                let mut source = e.source();
                while let Some(cause) = source {
                    eprintln!("  caused by: {cause}");
                    source = cause.source();
                }
            }
            ExitCode::from(e.exit_code())
        }
    }
}
