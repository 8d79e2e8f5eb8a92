//! CLI command definitions
//!
//! Defines the clap commands for the metaperf CLI.

use clap::Subcommand;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    /// Run subtests against the simulated application and report timings
    Run {
        /// Subtest to run (repeatable, runs in the order given)
        /// Falls back to the `[run]` section of the config file when omitted
        #[arg(long = "subtest", short = 's')]
        subtests: Vec<String>,

        /// How many times each subtest runs back to back
        #[arg(long, short)]
        repeat: Option<u32>,

        /// Milliseconds to rest before each subtest invocation
        #[arg(long)]
        rest: Option<u64>,

        /// YAML run scenario (subtests, repeat, rest_ms)
        #[arg(long)]
        scenario: Option<PathBuf>,

        /// Config file to use instead of the platform default
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// List the built-in subtests
    #[command(alias = "ls")]
    List,
}
