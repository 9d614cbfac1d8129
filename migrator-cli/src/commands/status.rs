//! `migrator status` - applied and pending migrations.

use migrator_engine::StatusReport;

use crate::cli::StatusArgs;
use crate::config::Settings;
use crate::error::CliResult;
use crate::output;

/// Run the status command
pub async fn run(args: StatusArgs, settings: &Settings) -> CliResult<()> {
    if args.json {
        let engine = super::build_engine(settings)?;
        let report = engine.status().await?;
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    output::header("Migration Status");
    let engine = super::engine(settings)?;
    let report = engine.status().await?;
    print_report(&report);
    Ok(())
}

fn print_report(report: &StatusReport) {
    output::section("MIGRATIONS STATUS:");
    for entry in &report.migrations {
        let marker = if entry.applied {
            output::style_success("[X]")
        } else {
            output::style_pending("[ ]")
        };
        match (&entry.name, &entry.filename) {
            (Some(name), Some(filename)) => {
                println!("{marker} {}  {name}  ({filename})", entry.version)
            }
            _ => println!(
                "{marker} {}  {}",
                entry.version,
                output::style_error("(file missing)")
            ),
        }
    }

    output::newline();
    output::kv("Pending", &report.pending.to_string());

    if !report.conflicts.is_empty() {
        output::newline();
        output::warn(&format!(
            "{} table(s) touched by more than one pending migration",
            report.conflicts.len()
        ));
        print!("{}", report.conflicts);
    }
}
