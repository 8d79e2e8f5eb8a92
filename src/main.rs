//! metaperf - performance test harness
//!
//! Runs timed subtests against a recording UI and prints the measurements
//! as a tagged JSON line for automation to pick up.

use std::path::PathBuf;

use clap::Parser;
use commands::Commands;
use metaperf::common::logging;
use metaperf::{cli, commands};

#[derive(Parser)]
#[command(name = "metaperf", about = "Timed UI performance subtests")]
#[command(version, long_about = None)]
struct Cli {
    /// Also write a debug log into this directory
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let _log_guard = match &cli.log_dir {
        Some(dir) => logging::init_with_file(Some(dir.as_path())).map(|(_, guard)| guard),
        None => {
            logging::init_cli();
            None
        }
    };

    if let Err(e) = cli::dispatch(cli.command).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
