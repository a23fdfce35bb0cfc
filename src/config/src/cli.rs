//! Command line interface. Thin by design: almost everything a simulation
//! needs (periods, per-region overrides, adjustment matrices) is a nested
//! structure that belongs in a YAML file, not a flag; the CLI's job is
//! pointing at that file and letting a handful of scalars be overridden
//! without editing it.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use log::info;
use serde::Serialize;

use crate::record::SampleMode;

#[derive(Parser, Debug, Serialize)]
#[clap(name = "bigrig-rs", version, about = "Stochastic simulation of biogeographic range evolution")]
pub struct Cli {
    /// Set the verbosity level (-v -vv -vvv)
    ///
    /// Set the verbosity level of this program. With multiple levels
    ///    -v : Info  |  -vv : Debug  | -vvv : Trace
    /// By default, the program still emits warnings. Use --quiet/-q to disable them.
    #[clap(short = 'v', long, parse(from_occurrences), global = true)]
    pub verbose: u8,

    /// Disable warnings.
    ///
    /// Only errors are displayed. Takes precedence over --verbose.
    #[clap(short = 'q', long, global = true)]
    pub quiet: bool,

    #[clap(subcommand)]
    pub commands: Commands,
}

impl Cli {
    /// Logs the resolved command line as YAML, for provenance, the way the
    /// teacher's `Cli::serialize` logs its own arguments before running.
    pub fn serialize(&self) {
        match serde_yaml::to_string(&self) {
            Ok(serialized) => info!("\n---- Command line args ----\n{serialized}\n---"),
            Err(e) => log::warn!("Failed to serialize command line args: {e}"),
        }
    }
}

#[derive(Subcommand, Debug, Serialize)]
pub enum Commands {
    /// Run a simulation described by a YAML configuration file.
    Run {
        #[clap(flatten)]
        run: Run,
    },
    /// Load a YAML configuration file and print it back out, unchanged.
    ///
    /// Exists to let users validate and pretty-print a configuration
    /// without running anything, and to sanity-check that a previously
    /// dumped configuration round-trips.
    FromYaml {
        /// Path to a previously-serialized `Config` YAML file.
        #[clap(short, long, parse(from_os_str))]
        config: PathBuf,
    },
}

#[derive(clap::Args, Debug, Serialize)]
pub struct Run {
    /// Path to the YAML configuration file describing the simulation
    /// (root range, periods, model parameters, adjustment matrices).
    #[clap(short, long, parse(from_os_str))]
    pub config: PathBuf,

    /// Override the configured RNG seed.
    #[clap(short, long)]
    pub seed: Option<u64>,

    /// Override the configured transition-sampling mode ("fast" or "sim").
    #[clap(short, long)]
    pub mode: Option<SampleMode>,

    /// Override the configured Newick output path.
    #[clap(long, parse(from_os_str))]
    pub newick_out: Option<PathBuf>,

    /// Override the configured YAML tree-output path.
    #[clap(long, parse(from_os_str))]
    pub yaml_out: Option<PathBuf>,
}

impl std::str::FromStr for SampleMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fast" => Ok(SampleMode::Fast),
            "sim" => Ok(SampleMode::Sim),
            other => Err(format!("unknown sample mode '{other}' (expected 'fast' or 'sim')")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_run_with_overrides() {
        let cli = Cli::try_parse_from([
            "bigrig-rs",
            "-vv",
            "run",
            "--config",
            "scenario.yaml",
            "--seed",
            "42",
            "--mode",
            "sim",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(!cli.quiet);
        match cli.commands {
            Commands::Run { run } => {
                assert_eq!(run.config, PathBuf::from("scenario.yaml"));
                assert_eq!(run.seed, Some(42));
                assert_eq!(run.mode, Some(SampleMode::Sim));
            }
            Commands::FromYaml { .. } => panic!("expected Run"),
        }
    }

    #[test]
    fn parses_from_yaml() {
        let cli = Cli::try_parse_from(["bigrig-rs", "from-yaml", "--config", "dump.yaml"]).unwrap();
        match cli.commands {
            Commands::FromYaml { config } => assert_eq!(config, PathBuf::from("dump.yaml")),
            Commands::Run { .. } => panic!("expected FromYaml"),
        }
    }

    #[test]
    fn rejects_unknown_mode() {
        assert!(Cli::try_parse_from(["bigrig-rs", "run", "--config", "x.yaml", "--mode", "bogus"]).is_err());
    }
}
