//! Error types for MySQL operations.

use migrator_engine::MigrationError;
use thiserror::Error;

/// Result type for MySQL operations.
pub type MysqlResult<T> = Result<T, MysqlError>;

/// Error type for MySQL operations.
#[derive(Error, Debug)]
pub enum MysqlError {
    /// MySQL driver error.
    #[error("mysql error: {0}")]
    Mysql(#[from] mysql_async::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl MysqlError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Server error code, e.g. 1062 for a duplicate key.
    pub fn server_code(&self) -> Option<u16> {
        match self {
            Self::Mysql(mysql_async::Error::Server(e)) => Some(e.code),
            _ => None,
        }
    }
}

impl From<MysqlError> for MigrationError {
    fn from(err: MysqlError) -> Self {
        match err {
            MysqlError::Config(msg) => MigrationError::Configuration(msg),
            other => MigrationError::Database(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_maps_to_configuration() {
        let err: MigrationError = MysqlError::config("bad url").into();
        assert!(matches!(err, MigrationError::Configuration(_)));
        assert_eq!(MysqlError::config("x").server_code(), None);
    }
}
