//! Command line interface definition using `clap`.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const MAX_JOBS: usize = 64;

fn parse_jobs(s: &str) -> Result<usize, String> {
    let value: usize = s.parse().map_err(|_| format!("{s} is not a valid number"))?;
    if (1..=MAX_JOBS).contains(&value) {
        Ok(value)
    } else {
        Err(format!("jobs must be between 1 and {MAX_JOBS}"))
    }
}

/// A C++ package manager and Ninja build driver.
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the project manifest file to use.
    #[arg(short, long, value_name = "FILE", default_value = "poac.toml")]
    pub file: PathBuf,

    /// Change to this directory before doing anything.
    #[arg(short = 'C', long, value_name = "DIR")]
    pub directory: Option<PathBuf>,

    /// Set the number of parallel build jobs.
    #[arg(short, long, value_name = "N", value_parser = parse_jobs)]
    pub jobs: Option<usize>,

    /// Enable verbose logging output.
    #[arg(short, long)]
    pub verbose: bool,

    /// Subcommand to execute; defaults to `build` when omitted.
    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Apply the default command if none was specified.
    #[must_use]
    pub fn with_default_command(mut self) -> Self {
        if self.command.is_none() {
            self.command = Some(Commands::Build(BuildArgs {
                release: false,
                targets: Vec::new(),
            }));
        }
        self
    }
}

/// Arguments accepted by the `build` command.
#[derive(Debug, Args, PartialEq, Eq, Clone)]
pub struct BuildArgs {
    /// Build with the release profile rather than debug.
    #[arg(long)]
    pub release: bool,

    /// A list of specific targets to build; all targets when empty.
    pub targets: Vec<String>,
}

/// Available top-level commands.
#[derive(Debug, Subcommand, PartialEq, Eq, Clone)]
pub enum Commands {
    /// Build specified targets, or all targets when none are given.
    Build(BuildArgs),

    /// Remove build artefacts and intermediate files.
    Clean,

    /// Write the generated Ninja manifest to the specified file without
    /// invoking `ninja`.
    Manifest {
        /// Output path for the generated Ninja file.
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn defaults_to_build_with_no_targets() {
        let cli = Cli::parse_from(["poac"]).with_default_command();
        assert_eq!(
            cli.command,
            Some(Commands::Build(BuildArgs {
                release: false,
                targets: Vec::new(),
            }))
        );
    }

    #[test]
    fn rejects_jobs_outside_range() {
        let result = Cli::try_parse_from(["poac", "-j", "0"]);
        assert!(result.is_err());
    }
}
