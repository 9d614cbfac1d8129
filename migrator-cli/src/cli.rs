//! CLI argument definitions using clap.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use migrator_engine::{ApplyTarget, RollbackTarget};

use crate::error::{CliError, CliResult};

/// migrator - versioned SQL schema migrations
#[derive(Parser, Debug)]
#[command(name = "migrator")]
#[command(author = "Pegasus Heavy Industries LLC")]
#[command(version)]
#[command(
    about = "migrator - versioned SQL schema migrations for PostgreSQL, SQL Server, MySQL and Oracle",
    long_about = None
)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Connection and location settings shared by every command
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Settings that override `migrator.toml`.
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Path to migrator.toml (searched upward from the working directory by default)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Database provider: postgresql, mssql, mysql or oracle
    #[arg(long, global = true, env = "MIGRATOR_PROVIDER")]
    pub provider: Option<String>,

    /// Database connection string
    #[arg(long, global = true, env = "MIGRATOR_CONN", hide_env_values = true)]
    pub conn: Option<String>,

    /// Directory holding the migration files
    #[arg(long, global = true, env = "MIGRATOR_DIR", value_name = "DIR")]
    pub migrations_dir: Option<PathBuf>,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show applied and pending migrations and conflicts between pending ones
    Status(StatusArgs),

    /// Apply pending migrations
    Apply(ApplyArgs),

    /// Roll back applied migrations
    Rollback(RollbackArgs),

    /// Roll back one migration, re-apply it from disk and refresh its checksum
    Redo(RedoArgs),

    /// Scaffold a new migration file
    Create(CreateArgs),

    /// Display version information
    Version,
}

// =============================================================================
// Status Command
// =============================================================================

/// Arguments for the `status` command
#[derive(Args, Debug, Default)]
pub struct StatusArgs {
    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

// =============================================================================
// Apply Command
// =============================================================================

/// Arguments for the `apply` command
#[derive(Args, Debug, Default)]
pub struct ApplyArgs {
    /// `to <version>`: apply pending migrations up to and including this version
    #[command(subcommand)]
    pub scope: Option<ApplyScope>,

    /// Apply exactly this migration
    #[arg(id = "target_version", short = 'v', long = "target-version", value_name = "VERSION")]
    pub version: Option<String>,

    /// Proceed past conflicts between pending migrations after confirmation
    #[arg(long, global = true)]
    pub force: bool,

    /// Validate and list what would run without executing anything
    #[arg(long, global = true)]
    pub dry_run: bool,
}

/// Positional forms of `apply`
#[derive(Subcommand, Debug)]
pub enum ApplyScope {
    /// Apply pending migrations up to and including VERSION
    To {
        /// Ceiling version
        #[arg(id = "scope_version", value_name = "VERSION")]
        version: String,
    },
}

impl ApplyArgs {
    /// The engine target these arguments select.
    pub fn target(&self) -> CliResult<ApplyTarget> {
        match (&self.scope, &self.version) {
            (Some(_), Some(_)) => Err(CliError::Command(
                "`apply to <version>` and `-v <version>` cannot be combined".into(),
            )),
            (Some(ApplyScope::To { version }), None) => Ok(ApplyTarget::UpTo(version.clone())),
            (None, Some(version)) => Ok(ApplyTarget::Only(version.clone())),
            (None, None) => Ok(ApplyTarget::All),
        }
    }
}

// =============================================================================
// Rollback Command
// =============================================================================

/// Arguments for the `rollback` command
#[derive(Args, Debug, Default)]
pub struct RollbackArgs {
    /// `all` or `to <version>`; the most recent migration when omitted
    #[command(subcommand)]
    pub scope: Option<RollbackScope>,

    /// Roll back exactly this migration
    #[arg(id = "target_version", short = 'v', long = "target-version", value_name = "VERSION")]
    pub version: Option<String>,
}

/// Positional forms of `rollback`
#[derive(Subcommand, Debug)]
pub enum RollbackScope {
    /// Roll back every applied migration
    All,
    /// Roll back every applied migration newer than VERSION
    To {
        /// Version to keep
        #[arg(id = "scope_version", value_name = "VERSION")]
        version: String,
    },
}

impl RollbackArgs {
    /// The engine target these arguments select.
    pub fn target(&self) -> CliResult<RollbackTarget> {
        match (&self.scope, &self.version) {
            (Some(_), Some(_)) => Err(CliError::Command(
                "`rollback all|to <version>` and `-v <version>` cannot be combined".into(),
            )),
            (Some(RollbackScope::All), None) => Ok(RollbackTarget::All),
            (Some(RollbackScope::To { version }), None) => Ok(RollbackTarget::To(version.clone())),
            (None, Some(version)) => Ok(RollbackTarget::Only(version.clone())),
            (None, None) => Ok(RollbackTarget::Last),
        }
    }
}

// =============================================================================
// Redo Command
// =============================================================================

/// Arguments for the `redo` command
#[derive(Args, Debug)]
pub struct RedoArgs {
    /// Version to redo
    #[arg(id = "redo_version", value_name = "VERSION")]
    pub version: String,
}

// =============================================================================
// Create Command
// =============================================================================

/// Arguments for the `create` command
#[derive(Args, Debug)]
pub struct CreateArgs {
    /// What the migration does; slugged into the file name
    #[arg(required = true, num_args = 1..)]
    pub description: Vec<String>,

    /// Write `-- Transaction: off`
    #[arg(long)]
    pub no_transaction: bool,

    /// Author header (defaults to config, then `git config user.name`)
    #[arg(long)]
    pub author: Option<String>,

    /// Branch header (defaults to config, then the current git branch)
    #[arg(long)]
    pub branch: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use pretty_assertions::assert_eq;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("migrator").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_apply_targets() {
        let Command::Apply(args) = parse(&["apply"]).command else {
            panic!("expected apply");
        };
        assert_eq!(args.target().unwrap(), ApplyTarget::All);

        let Command::Apply(args) = parse(&["apply", "to", "20240101000000_abc123"]).command else {
            panic!("expected apply");
        };
        assert_eq!(
            args.target().unwrap(),
            ApplyTarget::UpTo("20240101000000_abc123".into())
        );

        let Command::Apply(args) = parse(&["apply", "-v", "20240101000000_abc123", "--force"]).command
        else {
            panic!("expected apply");
        };
        assert!(args.force);
        assert_eq!(
            args.target().unwrap(),
            ApplyTarget::Only("20240101000000_abc123".into())
        );
    }

    #[test]
    fn test_apply_to_with_force_after_version() {
        let Command::Apply(args) = parse(&["apply", "to", "v1", "--force"]).command else {
            panic!("expected apply");
        };
        assert!(args.force);
        assert_eq!(args.target().unwrap(), ApplyTarget::UpTo("v1".into()));
    }

    #[test]
    fn test_rollback_targets() {
        let Command::Rollback(args) = parse(&["rollback"]).command else {
            panic!("expected rollback");
        };
        assert_eq!(args.target().unwrap(), RollbackTarget::Last);

        let Command::Rollback(args) = parse(&["rollback", "all"]).command else {
            panic!("expected rollback");
        };
        assert_eq!(args.target().unwrap(), RollbackTarget::All);

        let Command::Rollback(args) = parse(&["rollback", "to", "v1"]).command else {
            panic!("expected rollback");
        };
        assert_eq!(args.target().unwrap(), RollbackTarget::To("v1".into()));

        let Command::Rollback(args) = parse(&["rollback", "-v", "v1"]).command else {
            panic!("expected rollback");
        };
        assert_eq!(args.target().unwrap(), RollbackTarget::Only("v1".into()));
    }

    #[test]
    fn test_create_joins_words() {
        let Command::Create(args) = parse(&["create", "add", "orders", "--no-transaction"]).command
        else {
            panic!("expected create");
        };
        assert_eq!(args.description, vec!["add", "orders"]);
        assert!(args.no_transaction);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = parse(&["status", "--provider", "pg", "--conn", "postgres://x/y"]);
        assert_eq!(cli.global.provider.as_deref(), Some("pg"));
        assert_eq!(cli.global.conn.as_deref(), Some("postgres://x/y"));
    }
}
