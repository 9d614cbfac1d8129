//! PostgreSQL connection configuration.

use std::time::Duration;

use crate::error::{PgError, PgResult};

/// Connections the engine may hold at once: the lock session, the unit of
/// work and one short-lived query session.
pub const DEFAULT_MAX_CONNECTIONS: usize = 4;

/// PostgreSQL connection configuration.
#[derive(Debug, Clone)]
pub struct PgConfig {
    /// Parsed client configuration.
    pub client: tokio_postgres::Config,
    /// Pool size.
    pub max_connections: usize,
    /// Time to wait for a pooled connection.
    pub connect_timeout: Duration,
}

impl PgConfig {
    /// Parse a `postgres://` URL or a `host=... user=...` key/value string.
    pub fn from_connection_string(connection: &str) -> PgResult<Self> {
        let client: tokio_postgres::Config = connection
            .parse()
            .map_err(|e| PgError::config(format!("invalid PostgreSQL connection string: {e}")))?;

        if client.get_hosts().is_empty() {
            return Err(PgError::config("missing host in connection string"));
        }

        let connect_timeout = client
            .get_connect_timeout()
            .copied()
            .unwrap_or(Duration::from_secs(30));

        Ok(Self {
            client,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            connect_timeout,
        })
    }

    /// Set the pool size.
    pub fn max_connections(mut self, max: usize) -> Self {
        self.max_connections = max.max(2);
        self
    }

    /// Target database name, if given.
    pub fn database(&self) -> Option<&str> {
        self.client.get_dbname()
    }
}
