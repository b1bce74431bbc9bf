//! create-tags command.

use std::fs::File;
use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use tagmint_id::TagVariant;
use tagmint_registry::config::validate_link_target;

use crate::error::CliError;

use super::{CommandContext, MAX_CLI_BATCH};

/// Mint a batch of unlinked tags.
///
/// The printed external ids are what gets etched on physical labels. With
/// `--csv` the command also writes a label sheet of scan URLs, one per tag.
#[derive(Debug, Args)]
pub struct CreateTagsCommand {
    /// How many tags to mint.
    num: i64,

    /// Mint provider-prefixed tags (e.g. FO-A7K2M) instead of bare ones.
    #[arg(long)]
    etag: bool,

    /// Write a CSV label sheet of scan URLs to this file.
    #[arg(long, requires = "base_url")]
    csv: Option<PathBuf>,

    /// Registry base URL the label sheet links point at.
    #[arg(long)]
    base_url: Option<String>,
}

impl CreateTagsCommand {
    pub async fn run(self, ctx: CommandContext) -> Result<()> {
        validate_count(self.num)?;

        let base_url = match self.base_url.as_deref() {
            Some(url) => Some(validate_link_target(url).map_err(CliError::Config)?),
            None => None,
        };

        let variant = if self.etag {
            TagVariant::Provider
        } else {
            TagVariant::Bare
        };

        let rows = ctx
            .store()
            .create_batch(self.num, variant, None)
            .await
            .map_err(CliError::Db)?;

        let mut external_ids = Vec::with_capacity(rows.len());
        for row in &rows {
            external_ids.push(
                ctx.scheme
                    .render(row.id as u64, row.variant)
                    .context("minted tag cannot be rendered")?,
            );
        }

        for external in &external_ids {
            println!("{external}");
        }

        if let (Some(path), Some(base_url)) = (self.csv, base_url) {
            let file = File::create(&path).map_err(CliError::Io)?;
            write_label_sheet(file, &base_url, &external_ids)?;
            eprintln!(
                "{} wrote label sheet to {}",
                "✓".green(),
                path.display()
            );
        }

        eprintln!("{} minted {} tags", "✓".green(), external_ids.len());
        Ok(())
    }
}

fn validate_count(num: i64) -> Result<(), CliError> {
    if (1..=MAX_CLI_BATCH).contains(&num) {
        Ok(())
    } else {
        Err(CliError::InvalidCount(num))
    }
}

/// Writes one `{base_url}/{external_id}` scan URL per row.
fn write_label_sheet<W: io::Write>(
    writer: W,
    base_url: &str,
    external_ids: &[String],
) -> Result<(), CliError> {
    let mut csv = csv::WriterBuilder::new().has_headers(false).from_writer(writer);
    for external in external_ids {
        csv.write_record([format!("{base_url}/{external}")])
            .map_err(|e| CliError::Other(e.into()))?;
    }
    csv.flush().map_err(CliError::Io)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_bounds_are_enforced() {
        for num in [0, -1, MAX_CLI_BATCH + 1] {
            assert!(matches!(
                validate_count(num),
                Err(CliError::InvalidCount(n)) if n == num
            ));
        }
        assert!(validate_count(1).is_ok());
        assert!(validate_count(MAX_CLI_BATCH).is_ok());
    }

    #[test]
    fn label_sheet_has_one_scan_url_per_tag() {
        let ids = vec!["A7K2M".to_string(), "FO-9QZ3T".to_string()];
        let mut buf = Vec::new();

        write_label_sheet(&mut buf, "https://tags.example", &ids).unwrap();

        let sheet = String::from_utf8(buf).unwrap();
        assert_eq!(
            sheet,
            "https://tags.example/A7K2M\nhttps://tags.example/FO-9QZ3T\n"
        );
    }
}
