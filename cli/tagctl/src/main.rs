//! tagctl - operator CLI for the tagmint registry.
//!
//! Works directly against the registry database: minting label batches,
//! assigning ranges to devicehubs, and snapshot export/import.

use anyhow::Result;
use clap::Parser;

mod commands;
mod error;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Err(e) = cli.run().await {
        error::print_error(&e);
        std::process::exit(1);
    }

    Ok(())
}
