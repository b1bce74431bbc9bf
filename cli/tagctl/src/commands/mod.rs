//! CLI commands.

mod create;
mod set;
mod snapshot;

use anyhow::Result;
use clap::{Parser, Subcommand};

use tagmint_id::ExternalIdScheme;
use tagmint_registry::config::CodecConfig;
use tagmint_registry::db::{Database, DbConfig, TagStore};

use crate::error::CliError;

/// Largest batch `create-tags` will mint in one run.
pub const MAX_CLI_BATCH: i64 = 200;

/// tagmint CLI - mint tag batches and manage the registry database.
#[derive(Debug, Parser)]
#[command(name = "tagctl")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Mint a batch of tags and print their external ids.
    CreateTags(create::CreateTagsCommand),

    /// Point a range of tags at a devicehub.
    SetTags(set::SetTagsCommand),

    /// Export all tags as a CSV snapshot.
    Export(snapshot::ExportCommand),

    /// Replace all tags from a CSV snapshot.
    Import(snapshot::ImportCommand),

    /// Show CLI version.
    Version,
}

impl Cli {
    /// Run the CLI command.
    pub async fn run(self) -> Result<()> {
        // Version needs neither codec settings nor a database.
        if let Commands::Version = self.command {
            println!("tagctl {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }

        let ctx = CommandContext::load().await?;

        match self.command {
            Commands::CreateTags(cmd) => cmd.run(ctx).await,
            Commands::SetTags(cmd) => cmd.run(ctx).await,
            Commands::Export(cmd) => cmd.run(ctx).await,
            Commands::Import(cmd) => cmd.run(ctx).await,
            Commands::Version => unreachable!("handled above"),
        }
    }
}

/// Shared command context.
pub struct CommandContext {
    pub scheme: ExternalIdScheme,
    pub db: Database,
}

impl CommandContext {
    /// Load codec settings and open the database connection.
    pub async fn load() -> Result<Self, CliError> {
        let codec = CodecConfig::from_env()?;
        let scheme = codec.build_scheme().map_err(anyhow::Error::from)?;

        let db = Database::connect(&DbConfig::from_env()).await?;

        Ok(Self { scheme, db })
    }

    pub fn store(&self) -> TagStore {
        self.db.tag_store()
    }
}
