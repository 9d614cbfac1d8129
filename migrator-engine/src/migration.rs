//! Migration file model and parser.
//!
//! A migration is a single `.sql` file named `TIMESTAMP_ID_NAME.sql`:
//!
//! ```text
//! -- Author: jane
//! -- Branch: feature/orders
//! -- Transaction: on
//!
//! -- UP
//! CREATE TABLE orders (id BIGINT PRIMARY KEY);
//!
//! -- DOWN
//! DROP TABLE orders;
//! ```
//!
//! Leading `-- Key: Value` lines form the header. The body is split on the
//! `-- UP` and `-- DOWN` markers, and the checksum covers only the two bodies.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex_lite::Regex;
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::error::{MigrateResult, MigrationError};

/// Explicit transaction statements on their own (`BEGIN;`, `COMMIT TRANSACTION;`, ...).
static TRANSACTION_STATEMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:BEGIN(?:\s+(?:TRANSACTION|TRAN|WORK))?|START\s+TRANSACTION|COMMIT(?:\s+(?:TRANSACTION|TRAN|WORK))?)\s*;",
    )
    .expect("transaction statement pattern is valid")
});

/// A bare `BEGIN` or `COMMIT` line without a terminator.
static TRANSACTION_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^[ \t]*(?:BEGIN|COMMIT)[ \t]*$").expect("transaction line pattern is valid")
});

/// Metadata parsed from the leading comment block of a migration file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationHeader {
    /// Author of the migration. Required for apply.
    pub author: Option<String>,
    /// Branch the migration was written on.
    pub branch: Option<String>,
    /// Commit the migration was written at.
    pub commit_id: Option<String>,
    /// Detached signature over [`MigrationHeader::signing_payload`].
    pub signature: Option<String>,
    /// Whether the UP body runs inside a transaction.
    pub use_transaction: bool,
}

impl Default for MigrationHeader {
    fn default() -> Self {
        Self {
            author: None,
            branch: None,
            commit_id: None,
            signature: None,
            use_transaction: true,
        }
    }
}

impl MigrationHeader {
    /// Parse the header block of a migration file.
    ///
    /// Parsing stops at the first line that is not a `--` comment. Keys are
    /// case-insensitive and unknown keys are ignored.
    pub fn parse(sql: &str) -> Self {
        let mut header = Self::default();

        for line in sql.lines() {
            let line = line.trim();
            let Some(content) = line.strip_prefix("--") else {
                break;
            };
            let Some((key, value)) = content.split_once(':') else {
                continue;
            };

            let value = value.trim();
            let non_empty = || (!value.is_empty()).then(|| value.to_string());

            match key.trim().to_ascii_lowercase().as_str() {
                "author" => header.author = non_empty(),
                "branch" => header.branch = non_empty(),
                "commit" | "commitid" | "commit-id" => header.commit_id = non_empty(),
                "signature" => header.signature = non_empty(),
                "transaction" => header.use_transaction = parse_switch(value),
                _ => {}
            }
        }

        header
    }

    /// Payload a signature is computed over.
    pub fn signing_payload(&self, checksum: &str) -> String {
        format!(
            "Author:{}\nBranch:{}\nCommit:{}\nChecksum:{}",
            self.author.as_deref().unwrap_or_default(),
            self.branch.as_deref().unwrap_or_default(),
            self.commit_id.as_deref().unwrap_or_default(),
            checksum
        )
    }
}

fn parse_switch(value: &str) -> bool {
    !matches!(
        value.to_ascii_lowercase().as_str(),
        "off" | "false" | "no" | "0"
    )
}

/// The UP and DOWN bodies of a migration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpDown {
    /// SQL applied by the migration.
    pub up: String,
    /// SQL that reverts it. Empty for irreversible migrations.
    pub down: String,
}

/// A parsed migration file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Migration {
    /// Random id segment of the filename.
    pub id: String,
    /// `yyyyMMddHHmmss` timestamp segment of the filename.
    pub timestamp: String,
    /// Human readable name.
    pub name: String,
    /// File name including extension.
    pub filename: String,
    /// Path the migration was loaded from, if any.
    pub path: PathBuf,
    /// `timestamp_id`, the unique key of the migration.
    pub version: String,
    /// The whole file.
    pub raw_sql: String,
    /// Stripped UP body.
    pub up_sql: String,
    /// Stripped DOWN body.
    pub down_sql: String,
    /// SHA-256 hex over the UP and DOWN bodies.
    pub checksum: String,
    /// Header metadata.
    pub header: MigrationHeader,
}

impl Migration {
    /// Parse a migration from its file name and contents.
    pub fn parse(filename: &str, raw_sql: impl Into<String>) -> MigrateResult<Self> {
        let raw_sql = raw_sql.into();
        let (timestamp, id, name) = parse_filename(filename)?;

        if timestamp.len() != 14 || !timestamp.bytes().all(|b| b.is_ascii_digit()) {
            warn!(
                file = %filename,
                "Migration timestamp is not yyyyMMddHHmmss; ordering may be surprising"
            );
        }

        let UpDown { up, down } = extract_up_down(&raw_sql, filename)?;
        let checksum = compute_checksum(&up, &down);
        let header = MigrationHeader::parse(&raw_sql);

        Ok(Self {
            version: format!("{timestamp}_{id}"),
            id,
            timestamp,
            name,
            filename: filename.to_string(),
            path: PathBuf::from(filename),
            raw_sql,
            up_sql: up,
            down_sql: down,
            checksum,
            header,
        })
    }

    /// Read and parse a migration file.
    pub async fn load_from_file(path: impl AsRef<Path>) -> MigrateResult<Self> {
        let path = path.as_ref();
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| MigrationError::format(path.display().to_string(), "invalid path"))?;

        let raw_sql = tokio::fs::read_to_string(path).await?;
        let mut migration = Self::parse(filename, raw_sql)?;
        migration.path = path.to_path_buf();
        Ok(migration)
    }

    /// Whether the migration has a non-empty DOWN body.
    pub fn is_reversible(&self) -> bool {
        !self.down_sql.is_empty()
    }

    /// Check the header fields required before the migration may be applied.
    ///
    /// Returns the non-fatal warnings.
    pub fn validate_header(&self) -> MigrateResult<Vec<String>> {
        if self.header.author.is_none() {
            return Err(MigrationError::metadata(&self.version, "Author"));
        }

        let mut warnings = Vec::new();
        if self.header.branch.is_none() {
            warnings.push(format!(
                "Migration {} ({}) has no Branch header",
                self.version, self.filename
            ));
        }
        Ok(warnings)
    }
}

/// Split `TIMESTAMP_ID_NAME.sql` into its three segments.
pub fn parse_filename(filename: &str) -> MigrateResult<(String, String, String)> {
    let parts: Vec<&str> = filename.splitn(3, '_').collect();
    let [timestamp, id, rest] = parts.as_slice() else {
        return Err(MigrationError::format(
            filename,
            "expected TIMESTAMP_ID_NAME.sql",
        ));
    };

    let name = Path::new(rest)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(rest);

    Ok((timestamp.to_string(), id.to_string(), name.to_string()))
}

/// Locate the `-- UP` and `-- DOWN` sections of a migration body.
pub fn extract_up_down(sql: &str, filename: &str) -> MigrateResult<UpDown> {
    let mut up_start = None;
    let mut down_range = None;
    let mut offset = 0;

    for line in sql.split_inclusive('\n') {
        let end = offset + line.len();
        if up_start.is_none() {
            if is_marker(line, "UP") {
                up_start = Some(end);
            }
        } else if is_marker(line, "DOWN") {
            down_range = Some((offset, end));
            break;
        }
        offset = end;
    }

    let up_start = up_start.ok_or_else(|| MigrationError::MissingUpSection(filename.to_string()))?;

    let (up, down) = match down_range {
        Some((down_marker, down_start)) => (&sql[up_start..down_marker], &sql[down_start..]),
        None => (&sql[up_start..], ""),
    };

    Ok(UpDown {
        up: strip_transaction_control(up),
        down: strip_transaction_control(down),
    })
}

/// Whether a line is a `-- UP` / `-- DOWN` section marker.
///
/// `-- UPDATE ...` is not a marker: the keyword must not be followed by
/// another identifier character.
fn is_marker(line: &str, keyword: &str) -> bool {
    let Some(rest) = line.trim().strip_prefix("--") else {
        return false;
    };
    let rest = rest.trim_start();
    if !rest
        .get(..keyword.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(keyword))
    {
        return false;
    }
    !rest[keyword.len()..]
        .chars()
        .next()
        .is_some_and(|c| c.is_alphanumeric() || c == '_')
}

/// Remove explicit `BEGIN` / `COMMIT` statements; the runner owns transactions.
pub fn strip_transaction_control(sql: &str) -> String {
    let sql = TRANSACTION_STATEMENT.replace_all(sql, "");
    let sql = TRANSACTION_LINE.replace_all(&sql, "");
    sql.trim().to_string()
}

/// SHA-256 hex of `up + "\n" + down`.
pub fn compute_checksum(up: &str, down: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(up.as_bytes());
    hasher.update(b"\n");
    hasher.update(down.as_bytes());
    hex::encode(hasher.finalize())
}
