//! Persisted migration history.
//!
//! One row per applied migration lives in the version table. The DOWN script
//! is stored zstd-compressed so rollbacks run exactly what was recorded at
//! apply time, not whatever the file on disk says today.

use std::io::Cursor;

use serde::{Deserialize, Serialize};

use crate::driver::Param;
use crate::error::{MigrateResult, MigrationError};
use crate::migration::Migration;

/// A row of the version table, as written on apply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRecord {
    /// Migration version.
    pub version: String,
    /// File the migration was loaded from.
    pub filename: String,
    /// Checksum at apply time.
    pub checksum: String,
    /// Header author.
    pub author: Option<String>,
    /// Header branch.
    pub branch: Option<String>,
    /// Compressed DOWN script, absent for irreversible migrations.
    #[serde(skip)]
    pub down_script: Option<Vec<u8>>,
    /// Whether the migration ran in a transaction.
    pub use_transaction: bool,
}

impl VersionRecord {
    /// Build the record for a migration about to be applied.
    pub fn from_migration(migration: &Migration) -> MigrateResult<Self> {
        let down_script = if migration.is_reversible() {
            Some(compress_script(&migration.down_sql)?)
        } else {
            None
        };

        Ok(Self {
            version: migration.version.clone(),
            filename: migration.filename.clone(),
            checksum: migration.checksum.clone(),
            author: migration.header.author.clone(),
            branch: migration.header.branch.clone(),
            down_script,
            use_transaction: migration.header.use_transaction,
        })
    }

    /// Named parameters for the dialect's insert statement.
    pub fn insert_params(&self) -> Vec<Param> {
        vec![
            Param::text("version", &self.version),
            Param::text("filename", &self.filename),
            Param::text("checksum", &self.checksum),
            Param::opt_text("author", self.author.as_deref()),
            Param::opt_text("branch", self.branch.as_deref()),
            Param::binary("down_script", self.down_script.clone()),
            Param::bool("use_transaction", self.use_transaction),
        ]
    }
}

/// Compress a DOWN script for storage.
pub fn compress_script(sql: &str) -> MigrateResult<Vec<u8>> {
    zstd::stream::encode_all(Cursor::new(sql.as_bytes()), 0).map_err(MigrationError::Io)
}

/// Decompress a stored DOWN script.
pub fn decompress_script(bytes: &[u8]) -> MigrateResult<String> {
    let raw = zstd::stream::decode_all(Cursor::new(bytes)).map_err(MigrationError::Io)?;
    String::from_utf8(raw)
        .map_err(|e| MigrationError::database(format!("stored down script is not UTF-8: {e}")))
}
