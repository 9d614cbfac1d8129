//! Error types for the migration engine.

use thiserror::Error;

/// Result type alias for migration operations.
pub type MigrateResult<T> = Result<T, MigrationError>;

/// Errors that can occur during migration operations.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// Missing or invalid provider, connection string or driver registration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Malformed migration filename or body.
    #[error("Invalid migration file '{file}': {reason}")]
    MigrationFormat {
        /// File name.
        file: String,
        /// What is wrong with it.
        reason: String,
    },

    /// The migration file has no `-- UP` section.
    #[error("Migration file '{0}' has no '-- UP' section")]
    MissingUpSection(String),

    /// A required header field is missing.
    #[error("Migration '{version}' is missing required header: {reason}")]
    MigrationMetadata {
        /// Migration version.
        version: String,
        /// Which field is missing.
        reason: String,
    },

    /// A statement matched a fatal unsafe-pattern rule.
    #[error("Unsafe SQL in migration '{version}': {reason}\n  statement: {statement}")]
    UnsafeSql {
        /// Migration version.
        version: String,
        /// Rule reason.
        reason: String,
        /// Offending statement (truncated).
        statement: String,
    },

    /// Multiple pending migrations touch the same table.
    #[error("Semantic conflicts detected between pending migrations:\n{0}")]
    Conflict(String),

    /// The global migration lock could not be acquired in time.
    #[error("Could not acquire migration lock '{name}' within {timeout_secs}s")]
    LockUnavailable {
        /// Lock name.
        name: String,
        /// Timeout that elapsed.
        timeout_secs: u64,
    },

    /// Migration checksum mismatch.
    #[error("Checksum mismatch for migration '{version}': expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// Migration version.
        version: String,
        /// Checksum persisted when the migration was applied.
        expected: String,
        /// Checksum of the file on disk.
        actual: String,
    },

    /// Rollback requested for a migration without a DOWN section.
    #[error("Migration '{0}' is irreversible (no '-- DOWN' section)")]
    Irreversible(String),

    /// A statement failed while applying or rolling back a migration.
    #[error("Migration '{version}' failed: {message}")]
    Execution {
        /// Migration version.
        version: String,
        /// Driver error message.
        message: String,
    },

    /// Database operation error outside a migration body.
    #[error("Database error: {0}")]
    Database(String),

    /// Migration not found on disk.
    #[error("Migration '{0}' not found")]
    NotFound(String),

    /// Migration is not recorded as applied.
    #[error("Migration '{0}' has not been applied")]
    NotApplied(String),

    /// The operator declined a confirmation prompt.
    #[error("Operation cancelled")]
    Cancelled,

    /// File system error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl MigrationError {
    /// Create a configuration error.
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create a migration format error.
    pub fn format(file: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MigrationFormat {
            file: file.into(),
            reason: reason.into(),
        }
    }

    /// Create a missing header error.
    pub fn metadata(version: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MigrationMetadata {
            version: version.into(),
            reason: reason.into(),
        }
    }

    /// Create a database error.
    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    /// Create an execution error for a migration.
    pub fn execution(version: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Execution {
            version: version.into(),
            message: message.into(),
        }
    }

    /// Wrap a database error raised while running the given migration.
    pub fn in_migration(self, version: &str) -> Self {
        match self {
            Self::Database(message) => Self::execution(version, message),
            other => other,
        }
    }

    /// Whether this error only disqualifies a single migration file at load time.
    pub fn is_format_error(&self) -> bool {
        matches!(self, Self::MigrationFormat { .. } | Self::MissingUpSection(_))
    }

    /// Whether a range rollback may continue past this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Irreversible(_) | Self::ChecksumMismatch { .. } | Self::NotFound(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MigrationError::NotFound("20240101120000_ab12cd".to_string());
        assert!(err.to_string().contains("20240101120000_ab12cd"));
    }

    #[test]
    fn test_checksum_mismatch_display() {
        let err = MigrationError::ChecksumMismatch {
            version: "v1".to_string(),
            expected: "abc".to_string(),
            actual: "xyz".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("abc"));
        assert!(msg.contains("xyz"));
    }

    #[test]
    fn test_in_migration_wraps_database_errors() {
        let err = MigrationError::database("syntax error").in_migration("v1");
        assert!(matches!(err, MigrationError::Execution { ref version, .. } if version == "v1"));

        let err = MigrationError::Cancelled.in_migration("v1");
        assert!(matches!(err, MigrationError::Cancelled));
    }

    #[test]
    fn test_classification() {
        assert!(MigrationError::MissingUpSection("x.sql".into()).is_format_error());
        assert!(MigrationError::format("x.sql", "bad name").is_format_error());
        assert!(MigrationError::Irreversible("v1".into()).is_recoverable());
        assert!(!MigrationError::database("down").is_recoverable());
        assert!(
            !MigrationError::LockUnavailable {
                name: "migrator_lock".into(),
                timeout_secs: 30
            }
            .is_recoverable()
        );
    }
}
