//! Error types for SQL Server operations.

use migrator_engine::MigrationError;
use thiserror::Error;

/// Result type for SQL Server operations.
pub type MssqlResult<T> = Result<T, MssqlError>;

/// Errors that can occur during SQL Server operations.
#[derive(Error, Debug)]
pub enum MssqlError {
    /// Connection pool error.
    #[error("pool error: {0}")]
    Pool(String),

    /// Tiberius driver error.
    #[error("sql server error: {0}")]
    Tiberius(#[from] tiberius::error::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl MssqlError {
    /// Create a pool error.
    pub fn pool(message: impl Into<String>) -> Self {
        Self::Pool(message.into())
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Check if this is a connection error.
    pub fn is_connection_error(&self) -> bool {
        matches!(self, Self::Pool(_))
    }

    /// Server error number, e.g. 1222 for a lock request timeout.
    pub fn error_number(&self) -> Option<u32> {
        match self {
            Self::Tiberius(tiberius::error::Error::Server(token)) => Some(token.code()),
            _ => None,
        }
    }
}

impl From<bb8::RunError<bb8_tiberius::Error>> for MssqlError {
    fn from(err: bb8::RunError<bb8_tiberius::Error>) -> Self {
        Self::Pool(err.to_string())
    }
}

impl From<MssqlError> for MigrationError {
    fn from(err: MssqlError) -> Self {
        match err {
            MssqlError::Config(msg) => MigrationError::Configuration(msg),
            other => MigrationError::Database(other.to_string()),
        }
    }
}
