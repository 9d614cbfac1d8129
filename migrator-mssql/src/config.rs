//! SQL Server connection configuration.

use crate::error::{MssqlError, MssqlResult};

/// Connections the engine may hold at once.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 4;

/// SQL Server connection configuration.
#[derive(Debug, Clone)]
pub struct MssqlConfig {
    /// Parsed driver configuration.
    pub client: tiberius::Config,
    /// Database named in the connection string.
    pub database: Option<String>,
    /// Pool size.
    pub max_connections: u32,
}

impl MssqlConfig {
    /// Parse an ADO.NET (`Server=...;Database=...`) or JDBC
    /// (`jdbc:sqlserver://...`) connection string.
    pub fn from_connection_string(connection: &str) -> MssqlResult<Self> {
        let trimmed = connection.trim();
        let client = if trimmed.to_ascii_lowercase().starts_with("jdbc:") {
            tiberius::Config::from_jdbc_string(trimmed)
        } else {
            tiberius::Config::from_ado_string(trimmed)
        }
        .map_err(|e| MssqlError::config(format!("invalid SQL Server connection string: {e}")))?;

        Ok(Self {
            client,
            database: database_name(trimmed),
            max_connections: DEFAULT_MAX_CONNECTIONS,
        })
    }

    /// Set the pool size.
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max.max(2);
        self
    }
}

/// `Database` / `Initial Catalog` / `databaseName` value, for logging.
fn database_name(connection: &str) -> Option<String> {
    connection
        .split(';')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| {
            matches!(
                key.trim().to_ascii_lowercase().as_str(),
                "database" | "initial catalog" | "databasename"
            )
        })
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_ado_string() {
        let config = MssqlConfig::from_connection_string(
            "Server=tcp:db,1433;Initial Catalog=orders;User Id=sa;Password=x;TrustServerCertificate=true",
        )
        .unwrap();
        assert_eq!(config.database.as_deref(), Some("orders"));
        assert_eq!(config.max_connections, DEFAULT_MAX_CONNECTIONS);
    }

    #[test]
    fn test_jdbc_string() {
        let config = MssqlConfig::from_connection_string(
            "jdbc:sqlserver://db:1433;databaseName=orders;user=sa;password=x",
        )
        .unwrap();
        assert_eq!(config.database.as_deref(), Some("orders"));
    }

    #[test]
    fn test_database_name_absent() {
        assert_eq!(database_name("Server=db;User Id=sa"), None);
    }
}
