//! # migrator-postgres
//!
//! PostgreSQL driver for the migrator engine.
//!
//! This crate provides:
//! - Connection pool management using `deadpool-postgres`
//! - A [`migrator_engine::Session`] per pooled connection, so transactions and
//!   `pg_try_advisory_lock` locks stay on one backend
//! - Named-to-positional (`@name` to `$n`) parameter rewriting
//!
//! ## Example
//!
//! ```rust,ignore
//! use migrator_engine::DriverRegistry;
//!
//! let mut registry = DriverRegistry::new();
//! migrator_postgres::register(&mut registry);
//! ```

use std::sync::Arc;

use migrator_engine::{Driver, DriverRegistry, Provider};

pub mod config;
pub mod connection;
pub mod error;
pub mod pool;
pub mod types;

pub use config::PgConfig;
pub use connection::PgSession;
pub use error::{PgError, PgResult};
pub use pool::PgDriver;

/// Register the PostgreSQL driver.
pub fn register(registry: &mut DriverRegistry) {
    registry.register(Provider::Postgresql, |connection| {
        let driver = PgDriver::new(connection)?;
        Ok(Arc::new(driver) as Arc<dyn Driver>)
    });
}

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::config::PgConfig;
    pub use crate::error::{PgError, PgResult};
    pub use crate::pool::PgDriver;
}
