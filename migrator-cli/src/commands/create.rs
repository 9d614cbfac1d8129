//! `migrator create` - scaffold a new migration file.

use migrator_engine::MigrationTemplate;
use tokio::process::Command;
use tracing::debug;

use crate::cli::CreateArgs;
use crate::config::Settings;
use crate::error::CliResult;
use crate::output;

/// Run the create command
pub async fn run(args: CreateArgs, settings: &Settings) -> CliResult<()> {
    output::header("Create Migration");

    let author = match args.author.or_else(|| settings.author.clone()) {
        Some(author) => Some(author),
        None => git(&["config", "user.name"]).await,
    };
    let branch = match args.branch.or_else(|| settings.branch.clone()) {
        Some(branch) => Some(branch),
        None => git(&["rev-parse", "--abbrev-ref", "HEAD"]).await,
    };

    if author.is_none() {
        output::warn("No author found; fill in the `-- Author:` header before applying");
    }

    let template = MigrationTemplate::new(args.description.join(" "))
        .author(author)
        .branch(branch)
        .use_transaction(!args.no_transaction);

    let path = template.write_to(&settings.migrations_dir).await?;

    output::kv("Version", &template.version());
    output::kv(
        "Transaction",
        if template.use_transaction { "on" } else { "off" },
    );
    output::success(&format!("Created {}", path.display()));
    Ok(())
}

/// First line of a git command's stdout, or `None` when git is unavailable.
async fn git(args: &[&str]) -> Option<String> {
    let output = match Command::new("git").args(args).output().await {
        Ok(output) => output,
        Err(e) => {
            debug!(error = %e, "git not available");
            return None;
        }
    };
    if !output.status.success() {
        return None;
    }

    String::from_utf8(output.stdout)
        .ok()
        .and_then(|s| s.lines().next().map(|line| line.trim().to_string()))
        .filter(|s| !s.is_empty() && s != "HEAD")
}
