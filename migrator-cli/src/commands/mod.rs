//! CLI command implementations.

pub mod apply;
pub mod create;
pub mod redo;
pub mod rollback;
pub mod status;
pub mod version;

use migrator_engine::{DriverRegistry, MigrationEngine};

use crate::config::{Settings, redact_connection};
use crate::error::CliResult;
use crate::output;

/// Drivers compiled into this binary.
pub fn registry() -> DriverRegistry {
    #[allow(unused_mut)]
    let mut registry = DriverRegistry::new();

    #[cfg(feature = "postgres")]
    migrator_postgres::register(&mut registry);

    #[cfg(feature = "mysql")]
    migrator_mysql::register(&mut registry);

    #[cfg(feature = "mssql")]
    migrator_mssql::register(&mut registry);

    registry
}

/// Build the engine for a database command.
pub(crate) fn build_engine(settings: &Settings) -> CliResult<MigrationEngine> {
    Ok(MigrationEngine::from_registry(
        settings.migration_config()?,
        &registry(),
    )?)
}

/// Build the engine and print where it points.
pub(crate) fn engine(settings: &Settings) -> CliResult<MigrationEngine> {
    let engine = build_engine(settings)?;
    let config = engine.config();

    output::kv("Provider", config.provider.display_name());
    output::kv("Database", &redact_connection(&config.connection_string));
    output::kv("Migrations", &config.migrations_dir.display().to_string());
    output::newline();

    Ok(engine)
}
