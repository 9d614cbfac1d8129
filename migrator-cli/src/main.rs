//! migrator - apply, roll back and audit versioned SQL migrations.

use clap::Parser;

use migrator_cli::cli::{Cli, Command};
use migrator_cli::commands;
use migrator_cli::config::Settings;
use migrator_cli::error::CliResult;
use migrator_cli::{logging, output};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        output::newline();
        output::error(&e.to_string());
        if let Some(hint) = e.hint() {
            output::dim(&format!("  hint: {hint}"));
        }
        std::process::exit(1);
    }
}

async fn run() -> CliResult<()> {
    // Must run before parsing so `.env` values reach the clap `env` fallbacks.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    logging::init();

    let cwd = std::env::current_dir()?;
    let settings = Settings::resolve(&cli.global, &cwd)?;

    match cli.command {
        Command::Status(args) => commands::status::run(args, &settings).await,
        Command::Apply(args) => commands::apply::run(args, &settings).await,
        Command::Rollback(args) => commands::rollback::run(args, &settings).await,
        Command::Redo(args) => commands::redo::run(args, &settings).await,
        Command::Create(args) => commands::create::run(args, &settings).await,
        Command::Version => commands::version::run().await,
    }
}
