//! `migrator apply` - apply pending migrations.

use migrator_engine::{ApplyOptions, ConflictSet};

use crate::cli::ApplyArgs;
use crate::config::Settings;
use crate::error::CliResult;
use crate::output;

/// Run the apply command
pub async fn run(args: ApplyArgs, settings: &Settings) -> CliResult<()> {
    let target = args.target()?;
    let options = ApplyOptions {
        force: args.force,
        dry_run: args.dry_run,
    };

    output::header(if options.dry_run {
        "Apply (dry run)"
    } else {
        "Apply"
    });

    let engine = super::engine(settings)?.with_confirmation(confirm_conflicts);
    let report = engine.apply(target, options).await?;

    for warning in &report.warnings {
        output::warn(warning);
    }
    if !report.conflicts.is_empty() {
        output::warn("Proceeded past conflicts (--force)");
    }

    if report.dry_run {
        if report.planned.is_empty() {
            output::info("Dry run: nothing to apply");
        } else {
            output::info(&format!(
                "Dry run: {} migration(s) would be applied",
                report.planned.len()
            ));
            for version in &report.planned {
                output::list_item(version);
            }
        }
        return Ok(());
    }

    if report.applied.is_empty() {
        output::info("No pending migrations");
        return Ok(());
    }

    for version in &report.applied {
        output::list_item(version);
    }
    output::newline();
    output::success(&format!("Applied {} migration(s)", report.applied.len()));
    Ok(())
}

fn confirm_conflicts(conflicts: &ConflictSet) -> bool {
    output::newline();
    output::warn("Pending migrations touch the same tables:");
    print!("{conflicts}");
    output::newline();
    output::confirm("Apply them anyway?")
}
