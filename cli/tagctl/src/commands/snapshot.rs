//! export and import commands.

use std::fs::File;
use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use tagmint_registry::snapshot::{read_snapshot, write_snapshot};

use crate::error::CliError;

use super::CommandContext;

/// Export every tag as a CSV snapshot.
#[derive(Debug, Args)]
pub struct ExportCommand {
    /// File to write the snapshot to.
    file: PathBuf,
}

impl ExportCommand {
    pub async fn run(self, ctx: CommandContext) -> Result<()> {
        let rows = ctx.store().all_ordered().await.map_err(CliError::Db)?;

        let file = File::create(&self.file).map_err(CliError::Io)?;
        write_snapshot(file, &rows).map_err(CliError::Snapshot)?;

        eprintln!(
            "{} exported {} tags to {}",
            "✓".green(),
            rows.len(),
            self.file.display()
        );
        Ok(())
    }
}

/// Replace the whole tag table from a CSV snapshot.
///
/// DESTRUCTIVE: existing tags are dropped and the id sequence is reseeded to
/// continue above the highest imported id. The snapshot is validated in full
/// before anything is touched; a malformed file leaves the table unchanged.
#[derive(Debug, Args)]
pub struct ImportCommand {
    /// Snapshot file to restore from.
    file: PathBuf,
}

impl ImportCommand {
    pub async fn run(self, ctx: CommandContext) -> Result<()> {
        let file = File::open(&self.file).map_err(CliError::Io)?;
        let rows = read_snapshot(file).map_err(CliError::Snapshot)?;

        ctx.store().replace_all(&rows).await.map_err(CliError::Db)?;

        eprintln!(
            "{} imported {} tags from {}",
            "✓".green(),
            rows.len(),
            self.file.display()
        );
        Ok(())
    }
}
