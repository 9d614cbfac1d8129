//! # migrator
//!
//! Versioned SQL schema migrations for PostgreSQL, SQL Server, MySQL and Oracle.
//!
//! migrator provides:
//! - Plain `.sql` migration files with `-- UP` / `-- DOWN` sections and header metadata
//! - Apply, rollback, redo and status against a `migrator_versions` table
//! - A cross-process advisory lock around every apply and rollback
//! - Conflict detection between pending migrations that touch the same table
//! - Rejection of statements that cannot run inside a transaction
//!
//! Drivers are bundled behind the `postgres`, `mysql` and `mssql` features.
//! Oracle is supported at the dialect level; register your own [`Driver`] for it.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use migrator::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> MigrateResult<()> {
//!     let config = MigrationConfig::new(Provider::Postgresql, "postgres://localhost/app")
//!         .migrations_dir("./migrations");
//!     let engine = MigrationEngine::from_registry(config, &migrator::default_registry())?;
//!
//!     let report = engine.apply(ApplyTarget::All, ApplyOptions::default()).await?;
//!     println!("{report}");
//!     Ok(())
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

/// The migration engine: model, parser, rules, dialects and orchestrator.
pub mod engine {
    pub use migrator_engine::*;
}

/// PostgreSQL driver.
#[cfg(feature = "postgres")]
#[cfg_attr(docsrs, doc(cfg(feature = "postgres")))]
pub mod postgres {
    pub use migrator_postgres::*;
}

/// MySQL driver.
#[cfg(feature = "mysql")]
#[cfg_attr(docsrs, doc(cfg(feature = "mysql")))]
pub mod mysql {
    pub use migrator_mysql::*;
}

/// SQL Server driver.
#[cfg(feature = "mssql")]
#[cfg_attr(docsrs, doc(cfg(feature = "mssql")))]
pub mod mssql {
    pub use migrator_mssql::*;
}

/// Prelude module for convenient imports.
pub mod prelude {
    pub use migrator_engine::prelude::*;
}

// Re-export key types at the crate root
pub use migrator_engine::{
    ApplyOptions, ApplyReport, ApplyTarget, Driver, DriverRegistry, MigrateResult, Migration,
    MigrationConfig, MigrationEngine, MigrationError, Provider, RollbackReport, RollbackTarget,
    Session, StatusReport,
};

/// A registry holding every driver enabled by cargo features.
pub fn default_registry() -> DriverRegistry {
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
