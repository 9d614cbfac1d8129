//! MySQL connection configuration.

use mysql_async::{Opts, OptsBuilder, PoolConstraints, PoolOpts};
use url::Url;

use crate::error::{MysqlError, MysqlResult};

/// Connections the engine may hold at once.
pub const DEFAULT_MAX_CONNECTIONS: usize = 4;

/// MySQL connection configuration.
#[derive(Debug, Clone)]
pub struct MysqlConfig {
    /// Parsed driver options.
    pub opts: Opts,
    /// Pool size.
    pub max_connections: usize,
}

impl MysqlConfig {
    /// Parse a `mysql://` (or `mariadb://`) URL.
    pub fn from_connection_string(connection: &str) -> MysqlResult<Self> {
        let mut url = Url::parse(connection)
            .map_err(|e| MysqlError::config(format!("invalid MySQL URL: {e}")))?;

        match url.scheme() {
            "mysql" => {}
            "mariadb" => url
                .set_scheme("mysql")
                .map_err(|()| MysqlError::config("cannot rewrite mariadb:// scheme"))?,
            other => {
                return Err(MysqlError::config(format!(
                    "invalid scheme: expected 'mysql' or 'mariadb', got '{other}'"
                )));
            }
        }

        let opts = Opts::from_url(url.as_str())
            .map_err(|e| MysqlError::config(format!("invalid MySQL URL: {e}")))?;

        Ok(Self {
            opts,
            max_connections: DEFAULT_MAX_CONNECTIONS,
        })
    }

    /// Set the pool size.
    pub fn max_connections(mut self, max: usize) -> Self {
        self.max_connections = max.max(2);
        self
    }

    /// Database name, if given.
    pub fn database(&self) -> Option<&str> {
        self.opts.db_name()
    }

    /// Driver options with pool constraints applied.
    pub fn to_opts(&self) -> Opts {
        let constraints =
            PoolConstraints::new(0, self.max_connections).unwrap_or_default();
        OptsBuilder::from_opts(self.opts.clone())
            .pool_opts(PoolOpts::new().with_constraints(constraints))
            .into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_url() {
        let config = MysqlConfig::from_connection_string("mysql://app:secret@db:3307/orders").unwrap();
        assert_eq!(config.database(), Some("orders"));
        assert_eq!(config.opts.tcp_port(), 3307);
    }

    #[test]
    fn test_mariadb_scheme() {
        let config = MysqlConfig::from_connection_string("mariadb://app@localhost/orders").unwrap();
        assert_eq!(config.database(), Some("orders"));
    }

    #[test]
    fn test_rejects_other_schemes() {
        assert!(MysqlConfig::from_connection_string("postgres://localhost/orders").is_err());
        assert!(MysqlConfig::from_connection_string("not a url").is_err());
    }

    #[test]
    fn test_pool_constraints() {
        let config = MysqlConfig::from_connection_string("mysql://localhost/orders")
            .unwrap()
            .max_connections(6);
        assert_eq!(config.to_opts().pool_opts().constraints().max(), 6);
    }
}
