//! # migrator-mysql
//!
//! MySQL and MariaDB driver for the migrator engine, built on `mysql_async`.
//!
//! Named parameters are rewritten to `?` placeholders. Locks use `GET_LOCK`,
//! which is scoped to the connection that took it, so the lock session is
//! kept checked out of the pool until the lock is released.
//!
//! ## Example
//!
//! ```rust,ignore
//! use migrator_engine::DriverRegistry;
//!
//! let mut registry = DriverRegistry::new();
//! migrator_mysql::register(&mut registry);
//! ```

use std::sync::Arc;

use migrator_engine::{Driver, DriverRegistry, Provider};

pub mod config;
pub mod connection;
pub mod error;
pub mod pool;
pub mod types;

pub use config::MysqlConfig;
pub use connection::MysqlSession;
pub use error::{MysqlError, MysqlResult};
pub use pool::MysqlDriver;

/// Register the MySQL driver.
pub fn register(registry: &mut DriverRegistry) {
    registry.register(Provider::Mysql, |connection| {
        let driver = MysqlDriver::new(connection)?;
        Ok(Arc::new(driver) as Arc<dyn Driver>)
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_rejects_bad_url() {
        let mut registry = DriverRegistry::new();
        register(&mut registry);
        assert!(registry.supports(Provider::Mysql));
        assert!(registry.create(Provider::Mysql, "http://localhost/app").is_err());
    }
}
