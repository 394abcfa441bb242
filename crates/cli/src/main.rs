//! `folio`: scan comic libraries into a catalog and serve archive pages.

mod commands;
mod error;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "folio", version, about = "Comic library catalog and archive cache")]
struct Cli {
    /// Configuration file, merged over the one in the platform config directory.
    #[arg(long, short, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (`-v` debug, `-vv` trace). `RUST_LOG` wins.
    #[arg(long, short, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List the configured data sources.
    Sources,
    /// Scan data sources and merge the results into the catalog.
    Scan {
        /// Data sources to scan; all of them when omitted.
        names: Vec<String>,
    },
    /// Own the archive cache and serve page listings to other processes.
    Coordinator,
    /// List the pages of a disk item.
    Pages {
        item_id: i64,
        /// Extract in this process instead of asking the coordinator.
        #[arg(long)]
        local: bool,
        /// Store the page geometry as the item's metadata.
        #[arg(long)]
        metadata: bool,
    },
    /// Search collection titles.
    Search {
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
    },
}

fn default_directive(verbose: u8) -> &'static str {
    match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive(cli.verbose))),
        )
        .with_writer(std::io::stderr)
        .init();

    match commands::run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::FAILURE
        },
    }
}
