//! Tendril CLI - wiki editor tools.
//!
//! Provides commands for:
//! - `encode`: Convert wiki markup to presentation HTML
//! - `decode`: Convert presentation HTML back to wiki markup
//! - `save`: Save a page through an editing session

mod commands;
mod error;
mod output;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{DecodeArgs, EncodeArgs, SaveArgs};
use error::CliError;
use output::Output;

/// Tendril - wiki editor tools.
#[derive(Parser)]
#[command(name = "tendril", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert wiki markup to presentation HTML.
    Encode(EncodeArgs),
    /// Convert presentation HTML to wiki markup.
    Decode(DecodeArgs),
    /// Save a page to the wiki server.
    Save(SaveArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let output = Output::new();

    // --verbose enables INFO level, otherwise use RUST_LOG
    let verbose = matches!(&cli.command, Commands::Save(args) if args.verbose);
    let filter = if verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Encode(args) => args.execute(),
        Commands::Decode(args) => args.execute(),
        Commands::Save(args) => run_async(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            output.error(&format!("Error: {err}"));
            ExitCode::FAILURE
        }
    }
}

fn run_async(args: SaveArgs) -> Result<(), CliError> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(args.execute())
}
