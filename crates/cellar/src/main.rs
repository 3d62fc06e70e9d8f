//! Cellar CLI - envelope-encrypted secrets in S3
//!
//! This is the main entry point for the cellar command-line interface.

mod cli;
mod commands;
mod output;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI args
    let cli = Cli::parse();

    // Initialize tracing
    init_tracing(cli.verbose, cli.quiet);

    let config = cli.config.as_deref();
    let store = &cli.store;

    // Run command
    match cli.command {
        Commands::Version(args) => commands::version::run(args),
        Commands::Ls(args) => commands::ls::run(args, config, store).await,
        Commands::Upload(args) => commands::upload::run(args, config, store).await,
        Commands::Rm(args) => commands::rm::run(args, config, store).await,
        Commands::Pack(args) => commands::pack::run(args, config, store).await,
        Commands::Unpack(args) => commands::unpack::run(args, config, store).await,
        Commands::Rotate(args) => commands::rotate::run(args, config, store).await,
    }
}

/// Initialize tracing with appropriate verbosity
fn init_tracing(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            // Info shows uploads, removals and rotation progress
            0 => EnvFilter::new("info"),
            1 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    // Logs go to stderr so `pack -` and `unpack - -` can stream on stdout
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}
