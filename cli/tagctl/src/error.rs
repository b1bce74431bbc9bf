//! Error handling and display for the CLI.

use colored::Colorize;
use thiserror::Error;

use tagmint_registry::config::ConfigError;
use tagmint_registry::db::DbError;
use tagmint_registry::snapshot::SnapshotError;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Db(#[from] DbError),

    #[error("Snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),

    #[error("Invalid range {start}..{end}: start must be at least 1 and below end")]
    InvalidRange { start: i64, end: i64 },

    #[error("Invalid count {0}: must be between 1 and {max}", max = crate::commands::MAX_CLI_BATCH)]
    InvalidCount(i64),

    #[error("File error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// Print an error in a user-friendly format.
pub fn print_error(err: &anyhow::Error) {
    eprintln!("{} {}", "Error:".red().bold(), err);

    if let Some(cli_err) = err.downcast_ref::<CliError>() {
        match cli_err {
            CliError::Config(_) => {
                eprintln!(
                    "\n{}",
                    "Hint: set TAGMINT_HASH_SALT, TAGMINT_PROVIDER_ID and DATABASE_URL.".yellow()
                );
            }
            CliError::Db(_) => {
                eprintln!(
                    "\n{}",
                    "Hint: check DATABASE_URL and that the registry database is reachable."
                        .yellow()
                );
            }
            _ => {}
        }
    }
}
