//! Error types for PostgreSQL operations.

use migrator_engine::MigrationError;
use thiserror::Error;

/// Result type for PostgreSQL operations.
pub type PgResult<T> = Result<T, PgError>;

/// Errors that can occur during PostgreSQL operations.
#[derive(Error, Debug)]
pub enum PgError {
    /// Connection pool error.
    #[error("pool error: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),

    /// PostgreSQL error.
    #[error("postgres error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Type conversion error.
    #[error("type conversion error: {0}")]
    TypeConversion(String),
}

impl PgError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a type conversion error.
    pub fn type_conversion(message: impl Into<String>) -> Self {
        Self::TypeConversion(message.into())
    }

    /// Check if this is a connection error.
    pub fn is_connection_error(&self) -> bool {
        matches!(self, Self::Pool(_))
    }

    /// SQLSTATE of a server-side error.
    pub fn sqlstate(&self) -> Option<&str> {
        match self {
            Self::Postgres(e) => e.code().map(|c| c.code()),
            _ => None,
        }
    }
}

impl From<PgError> for MigrationError {
    fn from(err: PgError) -> Self {
        match err {
            PgError::Config(msg) => MigrationError::Configuration(msg),
            PgError::Postgres(e) => match e.as_db_error() {
                // The plain Display of a server error is only "db error".
                Some(db) => MigrationError::Database(format!(
                    "{}: {} (SQLSTATE {})",
                    db.severity(),
                    db.message(),
                    db.code().code()
                )),
                None => MigrationError::Database(e.to_string()),
            },
            other => MigrationError::Database(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = PgError::config("invalid URL");
        assert!(matches!(err, PgError::Config(_)));
        assert!(!err.is_connection_error());
        assert_eq!(err.sqlstate(), None);
    }

    #[test]
    fn test_into_migration_error() {
        let err: MigrationError = PgError::config("missing host").into();
        assert!(matches!(err, MigrationError::Configuration(_)));

        let err: MigrationError = PgError::type_conversion("numeric").into();
        assert!(matches!(err, MigrationError::Database(_)));
    }
}
