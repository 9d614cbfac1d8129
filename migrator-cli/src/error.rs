//! Error types for the migrator CLI.

use miette::Diagnostic;
use migrator_engine::MigrationError;
use thiserror::Error;

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

/// Errors that can occur while running a CLI command.
#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    /// IO error
    #[error("IO error: {0}")]
    #[diagnostic(code(migrator::io))]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    #[diagnostic(
        code(migrator::config),
        help("set `provider` and `connection` in migrator.toml, MIGRATOR_PROVIDER / MIGRATOR_CONN, or --provider / --conn")
    )]
    Config(String),

    /// Engine error
    #[error("{0}")]
    #[diagnostic(code(migrator::migration))]
    Migration(#[from] MigrationError),

    /// JSON output error
    #[error("Serialization error: {0}")]
    #[diagnostic(code(migrator::json))]
    Json(#[from] serde_json::Error),

    /// Command failed after partial progress
    #[error("{0}")]
    #[diagnostic(code(migrator::command))]
    Command(String),
}

impl CliError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// A one-line suggestion for the operator, when there is an obvious one.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::Config(_) | Self::Migration(MigrationError::Configuration(_)) => Some(
                "set `provider` and `connection` in migrator.toml, MIGRATOR_PROVIDER / MIGRATOR_CONN, or --provider / --conn",
            ),
            Self::Migration(MigrationError::Conflict(_)) => {
                Some("review the overlapping migrations, or re-run with --force to confirm")
            }
            Self::Migration(MigrationError::UnsafeSql { .. }) => {
                Some("move the statement to its own migration with `-- Transaction: off`")
            }
            Self::Migration(MigrationError::ChecksumMismatch { .. }) => {
                Some("restore the applied file, or use `redo` to re-apply the edited version")
            }
            Self::Migration(MigrationError::MigrationMetadata { .. }) => {
                Some("add an `-- Author: <name>` line above `-- UP`")
            }
            Self::Migration(MigrationError::LockUnavailable { .. }) => {
                Some("another migrator run holds the lock; wait for it to finish")
            }
            _ => None,
        }
    }
}

impl From<toml::de::Error> for CliError {
    fn from(err: toml::de::Error) -> Self {
        CliError::Config(format!("Failed to parse migrator.toml: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hint_for_conflict() {
        let err = CliError::from(MigrationError::Conflict("orders".into()));
        assert!(err.hint().unwrap().contains("--force"));
    }

    #[test]
    fn test_migration_error_display_is_unwrapped() {
        let err = CliError::from(MigrationError::NotFound("20240101_abc".into()));
        assert_eq!(err.to_string(), "Migration '20240101_abc' not found");
    }

    #[test]
    fn test_no_hint_for_io() {
        let err = CliError::from(std::io::Error::other("disk"));
        assert!(err.hint().is_none());
    }
}
