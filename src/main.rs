//! Application entry point.
//!
//! Parses command-line arguments and delegates execution to [`driver::run`].

use clap::Parser;
use poac::cli::Cli;
use poac::status::TerminalReporter;
use poac::{driver, error};
use std::process::ExitCode;
use tracing::Level;
use tracing_subscriber::fmt;

fn main() -> ExitCode {
    let cli = Cli::parse().with_default_command();
    let max_level = if cli.verbose { Level::DEBUG } else { Level::ERROR };
    fmt().with_max_level(max_level).init();

    let reporter = TerminalReporter::new();
    match driver::run(&cli, &reporter) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "build failed");
            ExitCode::from(exit_code_u8(&err))
        }
    }
}

fn exit_code_u8(err: &error::Error) -> u8 {
    u8::try_from(err.exit_code()).unwrap_or(255)
}
