//! # migrator-mssql
//!
//! Microsoft SQL Server driver for the migrator engine, built on `tiberius`
//! with `bb8` connection pooling.
//!
//! Named parameters are rewritten to `@P1`, `@P2`, ... Locks use
//! `sp_getapplock` with a session owner, held on a dedicated pooled
//! connection until released.
//!
//! ## Example
//!
//! ```rust,ignore
//! use migrator_engine::DriverRegistry;
//!
//! let mut registry = DriverRegistry::new();
//! migrator_mssql::register(&mut registry);
//! ```

use std::sync::Arc;

use migrator_engine::{Driver, DriverRegistry, Provider};

pub mod config;
pub mod connection;
pub mod error;
pub mod pool;
pub mod types;

pub use config::MssqlConfig;
pub use connection::MssqlSession;
pub use error::{MssqlError, MssqlResult};
pub use pool::MssqlDriver;

/// Register the SQL Server driver.
pub fn register(registry: &mut DriverRegistry) {
    registry.register(Provider::Mssql, |connection| {
        let driver = MssqlDriver::new(connection)?;
        Ok(Arc::new(driver) as Arc<dyn Driver>)
    });
}
