//! Connection pool and [`Driver`] implementation for MySQL.

use migrator_engine::{Driver, MigrateResult, Provider, Session};
use mysql_async::Pool;
use tracing::{debug, info};

use crate::config::MysqlConfig;
use crate::connection::MysqlSession;
use crate::error::{MysqlError, MysqlResult};

/// A pooled MySQL driver.
#[derive(Clone)]
pub struct MysqlDriver {
    pool: Pool,
}

impl MysqlDriver {
    /// Build the pool from a connection string. Connections open lazily.
    pub fn new(connection: &str) -> MysqlResult<Self> {
        Ok(Self::with_config(MysqlConfig::from_connection_string(connection)?))
    }

    /// Build the pool from a parsed configuration.
    pub fn with_config(config: MysqlConfig) -> Self {
        let pool = Pool::new(config.to_opts());

        info!(
            database = config.database().unwrap_or_default(),
            max_connections = config.max_connections,
            "MySQL connection pool created"
        );

        Self { pool }
    }

    /// Close every pooled connection.
    pub async fn disconnect(self) -> MysqlResult<()> {
        self.pool.disconnect().await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl Driver for MysqlDriver {
    fn provider(&self) -> Provider {
        Provider::Mysql
    }

    async fn connect(&self) -> MigrateResult<Box<dyn Session>> {
        debug!("Acquiring connection from pool");
        let conn = self.pool.get_conn().await.map_err(MysqlError::from)?;
        Ok(Box::new(MysqlSession::new(conn)))
    }
}
