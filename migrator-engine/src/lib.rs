//! # migrator-engine
//!
//! Core of the migrator: applies, rolls back and audits versioned SQL
//! migration files against PostgreSQL, SQL Server, MySQL and Oracle.
//!
//! This crate provides:
//! - Migration file parsing (`TIMESTAMP_ID_NAME.sql` with `-- UP` / `-- DOWN`)
//! - A quote and comment aware statement splitter and tokenizer
//! - Table extraction and conflict detection between pending migrations
//! - Per-provider rules for statements that must not run in a transaction
//! - Per-provider SQL for the `migrator_versions` table and advisory locks
//! - The [`MigrationEngine`] state machine: apply, rollback, redo and status
//!
//! Database access goes through the [`Driver`] and [`Session`] traits.
//! Driver crates (`migrator-postgres`, `migrator-mysql`, `migrator-mssql`)
//! register themselves in a [`DriverRegistry`].
//!
//! ## Example
//!
//! ```rust,ignore
//! use migrator_engine::prelude::*;
//!
//! async fn migrate(registry: &DriverRegistry) -> MigrateResult<()> {
//!     let config = MigrationConfig::new(Provider::Postgresql, "postgres://localhost/app")
//!         .migrations_dir("./migrations");
//!     let engine = MigrationEngine::from_registry(config, registry)?;
//!
//!     println!("{}", engine.status().await?);
//!     let report = engine.apply(ApplyTarget::All, ApplyOptions::default()).await?;
//!     println!("{report}");
//!     Ok(())
//! }
//! ```
//!
//! ## Version table
//!
//! Each applied migration has one row holding its checksum, header metadata,
//! the transaction flag and the zstd-compressed DOWN script. Rollbacks run the
//! stored script, and refuse to run when the file's checksum has changed.

pub mod conflict;
pub mod dialect;
pub mod driver;
pub mod engine;
pub mod error;
pub mod history;
pub mod lexer;
pub mod migration;
pub mod provider;
pub mod runner;
pub mod safety;
pub mod split;
pub mod tables;
pub mod template;

pub use conflict::{ConflictEntry, ConflictSet, TableConflict, detect_conflicts};
pub use dialect::{Dialect, LockStatements, VERSION_TABLE, dialect_for};
pub use driver::{
    Driver, DriverFactory, DriverRegistry, FromValue, Param, ParamKind, PlaceholderStyle, Session,
    Value, bind_named,
};
pub use engine::{
    ApplyOptions, ApplyReport, ApplyTarget, ConflictConfirmation, DEFAULT_LOCK_TIMEOUT,
    DenyConflicts, LOCK_NAME, MigrationConfig, MigrationEngine, RollbackFailure, RollbackReport,
    RollbackTarget, StatusEntry, StatusReport,
};
pub use error::{MigrateResult, MigrationError};
pub use history::VersionRecord;
pub use migration::{Migration, MigrationHeader};
pub use provider::Provider;
pub use runner::{LockGuard, SqlRunner, UnitOfWork};
pub use safety::{RiskLevel, RuleMatch, UnsafeSqlRule};
pub use split::split_statements;
pub use tables::{TableSet, extract_table_names};
pub use template::MigrationTemplate;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::driver::{Driver, DriverRegistry, Session};
    pub use crate::engine::{
        ApplyOptions, ApplyTarget, MigrationConfig, MigrationEngine, RollbackTarget,
    };
    pub use crate::error::{MigrateResult, MigrationError};
    pub use crate::provider::Provider;
}
