//! set-tags command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use tagmint_registry::config::validate_link_target;

use crate::error::CliError;

use super::CommandContext;

/// Point a range of tags at a devicehub.
///
/// Unlike the HTTP claim, this overwrites existing links: it is the operator
/// path for assigning freshly minted batches, and re-running it is harmless.
#[derive(Debug, Args)]
pub struct SetTagsCommand {
    /// Devicehub base URL the tags will redirect to.
    devicehub: String,

    /// First internal id in the range.
    start: i64,

    /// Last internal id in the range (inclusive).
    end: i64,

    /// Write the external ids of the updated tags to this CSV file.
    #[arg(long)]
    csv: Option<PathBuf>,
}

impl SetTagsCommand {
    pub async fn run(self, ctx: CommandContext) -> Result<()> {
        validate_range(self.start, self.end)?;

        let target = validate_link_target(&self.devicehub).map_err(CliError::Config)?;

        let rows = ctx
            .store()
            .relink_range(self.start, self.end, &target)
            .await
            .map_err(CliError::Db)?;

        let span = self.end - self.start + 1;
        if rows.len() as i64 != span {
            eprintln!(
                "{} range covers {} ids but only {} tags exist",
                "warning:".yellow(),
                span,
                rows.len()
            );
        }

        if let Some(path) = self.csv {
            let mut writer = csv::WriterBuilder::new()
                .has_headers(false)
                .from_path(&path)
                .map_err(|e| CliError::Other(e.into()))?;
            for row in &rows {
                let external = ctx
                    .scheme
                    .render(row.id as u64, row.variant)
                    .context("stored tag cannot be rendered")?;
                writer
                    .write_record([external])
                    .map_err(|e| CliError::Other(e.into()))?;
            }
            writer.flush().map_err(CliError::Io)?;
        }

        eprintln!(
            "{} linked {} tags to {}",
            "✓".green(),
            rows.len(),
            target
        );
        Ok(())
    }
}

fn validate_range(start: i64, end: i64) -> Result<(), CliError> {
    if start >= 1 && start < end {
        Ok(())
    } else {
        Err(CliError::InvalidRange { start, end })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_bounds_are_enforced() {
        assert!(matches!(
            validate_range(0, 5),
            Err(CliError::InvalidRange { start: 0, end: 5 })
        ));
        assert!(matches!(
            validate_range(-3, 5),
            Err(CliError::InvalidRange { .. })
        ));
        assert!(matches!(
            validate_range(5, 5),
            Err(CliError::InvalidRange { .. })
        ));
        assert!(matches!(
            validate_range(6, 5),
            Err(CliError::InvalidRange { .. })
        ));
        assert!(validate_range(1, 2).is_ok());
        assert!(validate_range(1, 100).is_ok());
    }
}
