// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Argument parsing and dispatch.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::churn::{churn, ChurnArgs};
use crate::graph_cmd::{normalize, validate};
use crate::settings::{config_command, open_config};

/// Top-level arguments.
#[derive(Parser, Debug)]
#[command(name = "egp-cli")]
#[command(about = "Genetic code cache developer tools")]
pub struct Cli {
    /// Directory holding `cache.json` (defaults to the platform config dir)
    #[arg(long, global = true)]
    pub config_dir: Option<PathBuf>,
    /// Command to run.
    #[command(subcommand)]
    pub command: Commands,
}

/// Subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Grow random genetic code trees through a cache and report purge and optimize stats
    Churn {
        /// Number of trees to build
        #[arg(long, default_value = "100")]
        trees: u32,
        /// Depth of each tree (a tree holds 2^(depth+1) - 1 entries)
        #[arg(long, default_value = "3")]
        depth: u32,
        /// Override the configured capacity
        #[arg(long)]
        capacity: Option<usize>,
        /// Override the configured purge fraction
        #[arg(long)]
        purge_fraction: Option<f64>,
        /// RNG seed
        #[arg(long, default_value = "0")]
        seed: u64,
        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// Validate a JSON graph and list its findings
    Validate {
        /// Path to a JSON graph
        graph: PathBuf,
    },
    /// Normalize a JSON graph and print (or write) the result
    Normalize {
        /// Path to a JSON graph
        graph: PathBuf,
        /// Write the normalized graph here instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
        /// RNG seed for choosing sources
        #[arg(long, default_value = "0")]
        seed: u64,
    },
    /// Show or change the persisted cache config
    Config {
        /// What to do with the config.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// `config` subcommands.
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the cache config as JSON (persists defaults on first use)
    Show,
    /// Print the config directory
    Path,
    /// Update fields of the cache config
    Set {
        /// Number of cache slots
        #[arg(long)]
        capacity: Option<usize>,
        /// Share of the capacity reclaimed by one purge
        #[arg(long)]
        purge_fraction: Option<f64>,
        /// Gene pool sub-process id
        #[arg(long)]
        gpspuid: Option<u32>,
        /// Upper bound on endpoints per row in random graphs
        #[arg(long)]
        max_row_endpoints: Option<u8>,
    },
}

/// Parse the process arguments and run.
pub fn entrypoint() -> Result<()> {
    run(Cli::parse())
}

/// Run already-parsed arguments.
pub fn run(cli: Cli) -> Result<()> {
    let config = open_config(cli.config_dir.as_deref())?;
    match cli.command {
        Commands::Churn {
            trees,
            depth,
            capacity,
            purge_fraction,
            seed,
            json,
        } => {
            let args = ChurnArgs {
                trees,
                depth,
                capacity,
                purge_fraction,
                seed,
                json,
            };
            churn(&config, &args)
        }
        Commands::Validate { graph } => validate(&graph),
        Commands::Normalize { graph, out, seed } => normalize(&graph, out.as_deref(), seed),
        Commands::Config { action } => config_command(&config, action),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn churn_flags_parse() {
        let argv = [
            "egp-cli",
            "churn",
            "--trees",
            "5",
            "--capacity",
            "32",
            "--json",
        ];
        let cli = Cli::try_parse_from(argv).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Churn {
                trees: 5,
                depth: 3,
                capacity: Some(32),
                json: true,
                ..
            }
        ));
    }
}
