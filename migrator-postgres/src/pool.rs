//! Connection pool and [`Driver`] implementation for PostgreSQL.

use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod};
use migrator_engine::{Driver, MigrateResult, Provider, Session};
use tokio_postgres::NoTls;
use tracing::{debug, info};

use crate::config::PgConfig;
use crate::connection::PgSession;
use crate::error::{PgError, PgResult};

/// A pooled PostgreSQL driver.
#[derive(Clone)]
pub struct PgDriver {
    pool: Pool,
}

impl PgDriver {
    /// Build the pool from a connection string. Connections open lazily.
    pub fn new(connection: &str) -> PgResult<Self> {
        Self::with_config(PgConfig::from_connection_string(connection)?)
    }

    /// Build the pool from a parsed configuration.
    pub fn with_config(config: PgConfig) -> PgResult<Self> {
        // Clean recycling runs pg_advisory_unlock_all, so a session that never
        // released its migration lock cannot leak it to the next user.
        let mgr_config = ManagerConfig {
            recycling_method: RecyclingMethod::Clean,
        };
        let mgr = Manager::from_config(config.client.clone(), NoTls, mgr_config);

        let pool = Pool::builder(mgr)
            .max_size(config.max_connections)
            .build()
            .map_err(|e| PgError::config(format!("failed to create pool: {e}")))?;

        info!(
            database = config.database().unwrap_or_default(),
            max_connections = config.max_connections,
            "PostgreSQL connection pool created"
        );

        Ok(Self { pool })
    }

    /// Close the pool.
    pub fn close(&self) {
        self.pool.close();
    }
}

#[async_trait::async_trait]
impl Driver for PgDriver {
    fn provider(&self) -> Provider {
        Provider::Postgresql
    }

    async fn connect(&self) -> MigrateResult<Box<dyn Session>> {
        debug!("Acquiring connection from pool");
        let client = self.pool.get().await.map_err(PgError::from)?;
        Ok(Box::new(PgSession::new(client)))
    }
}
