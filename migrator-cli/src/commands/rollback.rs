//! `migrator rollback` - revert applied migrations.

use crate::cli::RollbackArgs;
use crate::config::Settings;
use crate::error::{CliError, CliResult};
use crate::output;

/// Run the rollback command
pub async fn run(args: RollbackArgs, settings: &Settings) -> CliResult<()> {
    let target = args.target()?;

    output::header("Rollback");
    let engine = super::engine(settings)?;
    let report = engine.rollback(target).await?;

    if report.rolled_back.is_empty() && report.failures.is_empty() {
        output::info("Nothing to roll back");
        return Ok(());
    }

    for version in &report.rolled_back {
        output::list_item(version);
    }
    if !report.rolled_back.is_empty() {
        output::newline();
        output::success(&format!(
            "Rolled back {} migration(s)",
            report.rolled_back.len()
        ));
    }

    if report.is_complete() {
        return Ok(());
    }

    output::newline();
    for failure in &report.failures {
        output::warn(&format!("{}: {}", failure.version, failure.reason));
    }
    Err(CliError::Command(format!(
        "{} migration(s) could not be rolled back",
        report.failures.len()
    )))
}
