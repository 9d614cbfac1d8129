//! Connection pool and [`Driver`] implementation for SQL Server.

use bb8::Pool;
use bb8_tiberius::ConnectionManager;
use migrator_engine::{Driver, MigrateResult, Provider, Session};
use tracing::{debug, info};

use crate::config::MssqlConfig;
use crate::connection::MssqlSession;
use crate::error::{MssqlError, MssqlResult};

/// Type alias for the BB8 pool with Tiberius.
type TiberiusPool = Pool<ConnectionManager>;

/// A pooled SQL Server driver.
#[derive(Clone)]
pub struct MssqlDriver {
    pool: TiberiusPool,
}

impl MssqlDriver {
    /// Build the pool from a connection string. Connections open lazily.
    pub fn new(connection: &str) -> MssqlResult<Self> {
        Ok(Self::with_config(MssqlConfig::from_connection_string(connection)?))
    }

    /// Build the pool from a parsed configuration.
    pub fn with_config(config: MssqlConfig) -> Self {
        let mgr = ConnectionManager::new(config.client.clone());
        let pool = Pool::builder()
            .max_size(config.max_connections)
            .build_unchecked(mgr);

        info!(
            database = config.database.as_deref().unwrap_or_default(),
            max_connections = config.max_connections,
            "MSSQL connection pool created"
        );

        Self { pool }
    }
}

#[async_trait::async_trait]
impl Driver for MssqlDriver {
    fn provider(&self) -> Provider {
        Provider::Mssql
    }

    async fn connect(&self) -> MigrateResult<Box<dyn Session>> {
        debug!("Acquiring connection from pool");
        let client = self.pool.get_owned().await.map_err(MssqlError::from)?;
        Ok(Box::new(MssqlSession::new(client)))
    }
}
