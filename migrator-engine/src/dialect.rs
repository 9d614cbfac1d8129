//! Per-provider SQL generation.
//!
//! Each provider is a unit struct implementing [`Dialect`]. Queries use named
//! parameters written with the dialect's placeholder prefix (`@name`, or
//! `:name` for Oracle); drivers rewrite them to their native syntax.

use std::time::Duration;

use sha1::{Digest, Sha1};

use crate::driver::{Param, Value};
use crate::provider::Provider;

/// Default name of the version-tracking table.
pub const VERSION_TABLE: &str = "migrator_versions";

/// Statements implementing a named lock on one session.
#[derive(Debug, Clone)]
pub struct LockStatements {
    /// Query returning a single scalar that signals acquisition.
    pub acquire: String,
    /// Parameters for `acquire`.
    pub acquire_params: Vec<Param>,
    /// Statement releasing the lock.
    pub release: String,
    /// Parameters for `release`.
    pub release_params: Vec<Param>,
    /// Whether `acquire` returns immediately and must be retried until the timeout.
    pub poll: bool,
}

/// SQL text and lock protocol for one provider.
pub trait Dialect: Send + Sync {
    /// The provider this dialect targets.
    fn provider(&self) -> Provider;

    /// Character that introduces a named parameter.
    fn param_prefix(&self) -> char {
        '@'
    }

    /// Placeholder text for a named parameter.
    fn param(&self, name: &str) -> String {
        format!("{}{}", self.param_prefix(), name)
    }

    /// Idempotent creation of the version table.
    fn create_version_table(&self, table: &str) -> String;

    /// Most recently applied version.
    fn latest_version(&self, table: &str) -> String;

    /// All applied versions as one comma-separated scalar.
    fn applied_versions(&self, table: &str) -> String;

    /// All applied versions, one row each.
    fn applied_versions_rows(&self, table: &str) -> String {
        format!("SELECT version FROM {table} ORDER BY id")
    }

    /// Number of applied versions.
    fn count_versions(&self, table: &str) -> String {
        format!("SELECT COUNT(*) FROM {table}")
    }

    /// Persisted checksum of `@version`.
    fn checksum_by_version(&self, table: &str) -> String {
        format!(
            "SELECT checksum FROM {table} WHERE version = {}",
            self.param("version")
        )
    }

    /// Persisted compressed down-script of `@version`.
    fn down_script_by_version(&self, table: &str) -> String {
        format!(
            "SELECT down_script FROM {table} WHERE version = {}",
            self.param("version")
        )
    }

    /// Persisted transaction flag of `@version`.
    fn use_transaction_by_version(&self, table: &str) -> String {
        format!(
            "SELECT use_transaction FROM {table} WHERE version = {}",
            self.param("version")
        )
    }

    /// Delete the row of `@version`.
    fn delete_version(&self, table: &str) -> String {
        format!("DELETE FROM {table} WHERE version = {}", self.param("version"))
    }

    /// Count rows with `@version` (0 or 1).
    fn version_exists(&self, table: &str) -> String {
        format!(
            "SELECT COUNT(*) FROM {table} WHERE version = {}",
            self.param("version")
        )
    }

    /// Set the checksum of `@version` to `@checksum`.
    fn update_checksum(&self, table: &str) -> String {
        format!(
            "UPDATE {table} SET checksum = {} WHERE version = {}",
            self.param("checksum"),
            self.param("version")
        )
    }

    /// Insert a version row.
    fn insert_version(&self, table: &str) -> String {
        let columns = [
            "version",
            "filename",
            "checksum",
            "author",
            "branch",
            "down_script",
            "use_transaction",
        ];
        let values: Vec<String> = columns.iter().map(|c| self.param(c)).collect();
        format!(
            "INSERT INTO {table} ({}) VALUES ({})",
            columns.join(", "),
            values.join(", ")
        )
    }

    /// Lock statements, or `None` when the provider has no native primitive.
    fn lock_statements(&self, name: &str, timeout: Duration) -> Option<LockStatements>;

    /// Interpret the scalar returned by the acquire query.
    fn is_lock_acquired(&self, result: &Value) -> bool {
        match result {
            Value::Bool(b) => *b,
            Value::Int(n) => *n == 1,
            _ => false,
        }
    }
}

/// Dialect for a provider.
pub fn dialect_for(provider: Provider) -> &'static dyn Dialect {
    match provider {
        Provider::Postgresql => &Postgres,
        Provider::Mssql => &SqlServer,
        Provider::Mysql => &MySql,
        Provider::Oracle => &Oracle,
    }
}

/// 64-bit advisory lock key for a lock name: the first 8 bytes of its SHA-1
/// digest read as a little-endian signed integer, made non-negative.
pub fn advisory_lock_key(name: &str) -> i64 {
    let digest = Sha1::digest(name.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    i64::from_le_bytes(bytes).checked_abs().unwrap_or(i64::MAX)
}

/// PostgreSQL.
#[derive(Debug, Clone, Copy, Default)]
pub struct Postgres;

impl Dialect for Postgres {
    fn provider(&self) -> Provider {
        Provider::Postgresql
    }

    fn create_version_table(&self, table: &str) -> String {
        format!(
            "CREATE TABLE IF NOT EXISTS {table} (\n\
             \x20   id BIGSERIAL PRIMARY KEY,\n\
             \x20   version VARCHAR(100) NOT NULL UNIQUE,\n\
             \x20   filename TEXT,\n\
             \x20   checksum CHAR(64),\n\
             \x20   author TEXT,\n\
             \x20   branch TEXT,\n\
             \x20   down_script BYTEA,\n\
             \x20   use_transaction BOOLEAN NOT NULL DEFAULT TRUE,\n\
             \x20   applied_at TIMESTAMPTZ DEFAULT now()\n\
             )"
        )
    }

    fn latest_version(&self, table: &str) -> String {
        format!("SELECT version FROM {table} ORDER BY id DESC LIMIT 1")
    }

    fn applied_versions(&self, table: &str) -> String {
        format!("SELECT STRING_AGG(version, ',' ORDER BY id) FROM {table}")
    }

    fn lock_statements(&self, name: &str, _timeout: Duration) -> Option<LockStatements> {
        let key = Param::int("key", advisory_lock_key(name));
        Some(LockStatements {
            acquire: format!("SELECT pg_try_advisory_lock({})", self.param("key")),
            acquire_params: vec![key.clone()],
            release: format!("SELECT pg_advisory_unlock({})", self.param("key")),
            release_params: vec![key],
            poll: true,
        })
    }
}

/// Microsoft SQL Server.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlServer;

impl Dialect for SqlServer {
    fn provider(&self) -> Provider {
        Provider::Mssql
    }

    fn create_version_table(&self, table: &str) -> String {
        format!(
            "IF NOT EXISTS (SELECT * FROM sys.objects WHERE object_id = OBJECT_ID(N'{table}') AND type = N'U')\n\
             BEGIN\n\
             \x20   CREATE TABLE {table} (\n\
             \x20       id BIGINT IDENTITY(1,1) PRIMARY KEY,\n\
             \x20       version NVARCHAR(100) NOT NULL UNIQUE,\n\
             \x20       filename NVARCHAR(4000),\n\
             \x20       checksum CHAR(64),\n\
             \x20       author NVARCHAR(4000),\n\
             \x20       branch NVARCHAR(4000),\n\
             \x20       down_script VARBINARY(MAX),\n\
             \x20       use_transaction BIT NOT NULL DEFAULT 1,\n\
             \x20       applied_at DATETIMEOFFSET DEFAULT SYSDATETIMEOFFSET()\n\
             \x20   )\n\
             END"
        )
    }

    fn latest_version(&self, table: &str) -> String {
        format!("SELECT TOP 1 version FROM {table} ORDER BY id DESC")
    }

    fn applied_versions(&self, table: &str) -> String {
        format!("SELECT STRING_AGG(version, ',') WITHIN GROUP (ORDER BY id) FROM {table}")
    }

    fn lock_statements(&self, name: &str, timeout: Duration) -> Option<LockStatements> {
        let resource = Param::text("resource", name);
        let timeout_ms = i64::try_from(timeout.as_millis()).unwrap_or(i64::MAX);
        Some(LockStatements {
            acquire: format!(
                "DECLARE @result INT;\n\
                 EXEC @result = sp_getapplock @Resource = {}, @LockMode = 'Exclusive', \
                 @LockOwner = 'Session', @LockTimeout = {};\n\
                 SELECT @result",
                self.param("resource"),
                self.param("timeout_ms")
            ),
            acquire_params: vec![resource.clone(), Param::int("timeout_ms", timeout_ms)],
            release: format!(
                "EXEC sp_releaseapplock @Resource = {}, @LockOwner = 'Session'",
                self.param("resource")
            ),
            release_params: vec![resource],
            poll: false,
        })
    }

    /// `sp_getapplock` returns 0 or 1 on success and a negative code otherwise.
    fn is_lock_acquired(&self, result: &Value) -> bool {
        matches!(result, Value::Int(n) if *n >= 0)
    }
}

/// MySQL and MariaDB.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySql;

impl Dialect for MySql {
    fn provider(&self) -> Provider {
        Provider::Mysql
    }

    fn create_version_table(&self, table: &str) -> String {
        format!(
            "CREATE TABLE IF NOT EXISTS {table} (\n\
             \x20   id BIGINT AUTO_INCREMENT PRIMARY KEY,\n\
             \x20   version VARCHAR(100) NOT NULL UNIQUE,\n\
             \x20   filename TEXT,\n\
             \x20   checksum CHAR(64),\n\
             \x20   author TEXT,\n\
             \x20   branch TEXT,\n\
             \x20   down_script LONGBLOB,\n\
             \x20   use_transaction BOOLEAN NOT NULL DEFAULT TRUE,\n\
             \x20   applied_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP\n\
             ) ENGINE=InnoDB"
        )
    }

    fn latest_version(&self, table: &str) -> String {
        format!("SELECT version FROM {table} ORDER BY id DESC LIMIT 1")
    }

    fn applied_versions(&self, table: &str) -> String {
        format!("SELECT GROUP_CONCAT(version ORDER BY id SEPARATOR ',') FROM {table}")
    }

    fn lock_statements(&self, name: &str, timeout: Duration) -> Option<LockStatements> {
        let lock_name = Param::text("name", name);
        let timeout_secs = i64::try_from(timeout.as_secs()).unwrap_or(i64::MAX);
        Some(LockStatements {
            acquire: format!(
                "SELECT GET_LOCK({}, {})",
                self.param("name"),
                self.param("timeout")
            ),
            acquire_params: vec![lock_name.clone(), Param::int("timeout", timeout_secs)],
            release: format!("SELECT RELEASE_LOCK({})", self.param("name")),
            release_params: vec![lock_name],
            poll: false,
        })
    }
}

/// Oracle Database.
#[derive(Debug, Clone, Copy, Default)]
pub struct Oracle;

impl Dialect for Oracle {
    fn provider(&self) -> Provider {
        Provider::Oracle
    }

    fn param_prefix(&self) -> char {
        ':'
    }

    /// Oracle has no `IF NOT EXISTS`; ORA-00955 (name already used) is trapped.
    fn create_version_table(&self, table: &str) -> String {
        format!(
            "BEGIN\n\
             \x20   EXECUTE IMMEDIATE 'CREATE TABLE {table} (\n\
             \x20       id NUMBER GENERATED ALWAYS AS IDENTITY PRIMARY KEY,\n\
             \x20       version VARCHAR2(100) NOT NULL UNIQUE,\n\
             \x20       filename CLOB,\n\
             \x20       checksum CHAR(64),\n\
             \x20       author CLOB,\n\
             \x20       branch CLOB,\n\
             \x20       down_script BLOB,\n\
             \x20       use_transaction NUMBER(1) DEFAULT 1 NOT NULL,\n\
             \x20       applied_at TIMESTAMP WITH TIME ZONE DEFAULT SYSTIMESTAMP\n\
             \x20   )';\n\
             EXCEPTION\n\
             \x20   WHEN OTHERS THEN\n\
             \x20       IF SQLCODE = -955 THEN NULL; ELSE RAISE; END IF;\n\
             END;"
        )
    }

    fn latest_version(&self, table: &str) -> String {
        format!("SELECT version FROM {table} ORDER BY id DESC FETCH FIRST 1 ROWS ONLY")
    }

    fn applied_versions(&self, table: &str) -> String {
        format!("SELECT LISTAGG(version, ',') WITHIN GROUP (ORDER BY id) FROM {table}")
    }

    fn lock_statements(&self, _name: &str, _timeout: Duration) -> Option<LockStatements> {
        None
    }
}
