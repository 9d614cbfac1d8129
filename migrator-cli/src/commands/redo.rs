//! `migrator redo` - roll back, re-apply and refresh the checksum of one migration.

use crate::cli::RedoArgs;
use crate::config::Settings;
use crate::error::CliResult;
use crate::output;

/// Run the redo command
pub async fn run(args: RedoArgs, settings: &Settings) -> CliResult<()> {
    output::header("Redo");
    let engine = super::engine(settings)?;
    engine.redo(&args.version).await?;
    output::success(&format!("Re-applied migration {}", args.version));
    Ok(())
}
