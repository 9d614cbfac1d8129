//! In-memory PostgreSQL stand-in for end-to-end engine tests.
//!
//! Understands exactly the bookkeeping SQL the engine sends for the
//! PostgreSQL dialect. Every other statement is treated as a schema change
//! and journaled. Transactions buffer writes until commit; session-scoped
//! advisory locks are released when the session is dropped.

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use migrator::engine::{Param, Value};
use migrator::{
    Driver, MigrateResult, MigrationConfig, MigrationEngine, MigrationError, Provider, Session,
};
use parking_lot::Mutex;

pub const TABLE: &str = "migrator_versions";

/// One row of the version table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRow {
    pub version: String,
    pub filename: String,
    pub checksum: Option<String>,
    pub author: Option<String>,
    pub branch: Option<String>,
    pub down_script: Option<Vec<u8>>,
    pub use_transaction: bool,
}

#[derive(Debug)]
enum Write {
    Statement(String),
    Insert(VersionRow),
    Delete(String),
    UpdateChecksum { version: String, checksum: String },
}

#[derive(Debug, Default)]
struct State {
    table_exists: bool,
    rows: Vec<VersionRow>,
    statements: Vec<String>,
    writes: usize,
    lock_holder: Option<u64>,
    lock_attempts: usize,
    next_session: u64,
    fail_on: Option<String>,
    checksum_updates: usize,
}

impl State {
    fn commit(&mut self, writes: Vec<Write>) {
        for write in writes {
            self.writes += 1;
            match write {
                Write::Statement(sql) => self.statements.push(sql),
                Write::Insert(row) => self.rows.push(row),
                Write::Delete(version) => self.rows.retain(|r| r.version != version),
                Write::UpdateChecksum { version, checksum } => {
                    self.checksum_updates += 1;
                    if let Some(row) = self.rows.iter_mut().find(|r| r.version == version) {
                        row.checksum = Some(checksum);
                    }
                }
            }
        }
    }

    fn row(&self, version: &str) -> Option<&VersionRow> {
        self.rows.iter().find(|r| r.version == version)
    }
}

/// Shared database state.
#[derive(Clone, Default)]
pub struct FakeDatabase {
    state: Arc<Mutex<State>>,
}

/// Session id used for a lock held by "another process".
const FOREIGN_SESSION: u64 = u64::MAX;

impl FakeDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn driver(&self) -> Arc<dyn Driver> {
        Arc::new(FakeDriver { db: self.clone() })
    }

    /// Engine over this database reading migrations from `dir`.
    pub fn engine(&self, dir: &Path) -> MigrationEngine {
        self.engine_with_timeout(dir, Duration::from_secs(5))
    }

    pub fn engine_with_timeout(&self, dir: &Path, lock_timeout: Duration) -> MigrationEngine {
        let config = MigrationConfig::new(Provider::Postgresql, "postgres://fake/db")
            .migrations_dir(dir)
            .lock_timeout(lock_timeout);
        MigrationEngine::new(config, self.driver()).unwrap()
    }

    /// Applied versions in apply order.
    pub fn applied(&self) -> Vec<String> {
        self.state.lock().rows.iter().map(|r| r.version.clone()).collect()
    }

    pub fn row(&self, version: &str) -> Option<VersionRow> {
        self.state.lock().row(version).cloned()
    }

    /// Committed schema statements.
    pub fn statements(&self) -> Vec<String> {
        self.state.lock().statements.clone()
    }

    /// Committed writes of any kind.
    pub fn writes(&self) -> usize {
        self.state.lock().writes
    }

    pub fn lock_attempts(&self) -> usize {
        self.state.lock().lock_attempts
    }

    pub fn lock_is_free(&self) -> bool {
        self.state.lock().lock_holder.is_none()
    }

    /// Overwrite a stored checksum behind the engine's back.
    pub fn set_checksum(&self, version: &str, checksum: Option<&str>) {
        let mut state = self.state.lock();
        if let Some(row) = state.rows.iter_mut().find(|r| r.version == version) {
            row.checksum = checksum.map(str::to_string);
        }
    }

    /// Checksum updates committed since the database was created.
    pub fn checksum_updates(&self) -> usize {
        self.state.lock().checksum_updates
    }

    /// Make every statement containing `needle` fail.
    pub fn fail_on(&self, needle: &str) {
        self.state.lock().fail_on = Some(needle.to_string());
    }

    pub fn hold_lock_elsewhere(&self) {
        self.state.lock().lock_holder = Some(FOREIGN_SESSION);
    }

    pub fn release_foreign_lock(&self) {
        let mut state = self.state.lock();
        if state.lock_holder == Some(FOREIGN_SESSION) {
            state.lock_holder = None;
        }
    }
}

struct FakeDriver {
    db: FakeDatabase,
}

#[async_trait::async_trait]
impl Driver for FakeDriver {
    fn provider(&self) -> Provider {
        Provider::Postgresql
    }

    async fn connect(&self) -> MigrateResult<Box<dyn Session>> {
        let id = {
            let mut state = self.db.state.lock();
            state.next_session += 1;
            state.next_session
        };
        Ok(Box::new(FakeSession {
            id,
            db: self.db.clone(),
            pending: None,
        }))
    }
}

struct FakeSession {
    id: u64,
    db: FakeDatabase,
    pending: Option<Vec<Write>>,
}

impl FakeSession {
    fn record(&mut self, write: Write) {
        match &mut self.pending {
            Some(pending) => pending.push(write),
            None => self.db.state.lock().commit(vec![write]),
        }
    }
}

impl Drop for FakeSession {
    fn drop(&mut self) {
        let mut state = self.db.state.lock();
        if state.lock_holder == Some(self.id) {
            state.lock_holder = None;
        }
    }
}

fn text(params: &[Param], name: &str) -> Option<String> {
    params.iter().find(|p| p.name == name).and_then(|p| match &p.value {
        Value::Text(s) => Some(s.clone()),
        _ => None,
    })
}

fn version_row(params: &[Param]) -> MigrateResult<VersionRow> {
    let find = |name: &str| {
        params
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.value.clone())
            .ok_or_else(|| MigrationError::database(format!("missing parameter {name}")))
    };

    Ok(VersionRow {
        version: text(params, "version").unwrap_or_default(),
        filename: text(params, "filename").unwrap_or_default(),
        checksum: text(params, "checksum"),
        author: text(params, "author"),
        branch: text(params, "branch"),
        down_script: match find("down_script")? {
            Value::Bytes(b) => Some(b),
            _ => None,
        },
        use_transaction: matches!(find("use_transaction")?, Value::Bool(true)),
    })
}

fn one(value: Value) -> Vec<Vec<Value>> {
    vec![vec![value]]
}

#[async_trait::async_trait]
impl Session for FakeSession {
    async fn begin(&mut self) -> MigrateResult<()> {
        self.pending = Some(Vec::new());
        Ok(())
    }

    async fn commit(&mut self) -> MigrateResult<()> {
        if let Some(pending) = self.pending.take() {
            self.db.state.lock().commit(pending);
        }
        Ok(())
    }

    async fn rollback(&mut self) -> MigrateResult<()> {
        self.pending = None;
        Ok(())
    }

    async fn execute(&mut self, sql: &str, params: &[Param]) -> MigrateResult<u64> {
        let sql = sql.trim();
        if sql.starts_with(&format!("CREATE TABLE IF NOT EXISTS {TABLE}")) {
            self.db.state.lock().table_exists = true;
            return Ok(0);
        }

        let write = if sql.starts_with(&format!("INSERT INTO {TABLE}")) {
            Write::Insert(version_row(params)?)
        } else if sql.starts_with(&format!("DELETE FROM {TABLE}")) {
            Write::Delete(text(params, "version").unwrap_or_default())
        } else if sql.starts_with(&format!("UPDATE {TABLE} SET checksum")) {
            Write::UpdateChecksum {
                version: text(params, "version").unwrap_or_default(),
                checksum: text(params, "checksum").unwrap_or_default(),
            }
        } else {
            let fail = self
                .db
                .state
                .lock()
                .fail_on
                .as_deref()
                .is_some_and(|needle| sql.contains(needle));
            if fail {
                return Err(MigrationError::database("ERROR: relation does not exist"));
            }
            Write::Statement(sql.to_string())
        };

        self.record(write);
        Ok(1)
    }

    async fn query(&mut self, sql: &str, params: &[Param]) -> MigrateResult<Vec<Vec<Value>>> {
        let sql = sql.trim();
        let mut state = self.db.state.lock();

        if sql.starts_with("SELECT pg_try_advisory_lock") {
            state.lock_attempts += 1;
            let acquired = match state.lock_holder {
                None => {
                    state.lock_holder = Some(self.id);
                    true
                }
                Some(holder) => holder == self.id,
            };
            return Ok(one(Value::Bool(acquired)));
        }
        if sql.starts_with("SELECT pg_advisory_unlock") {
            let released = state.lock_holder == Some(self.id);
            if released {
                state.lock_holder = None;
            }
            return Ok(one(Value::Bool(released)));
        }

        if !state.table_exists {
            return Err(MigrationError::database(format!(
                "ERROR: relation \"{TABLE}\" does not exist"
            )));
        }

        let version = text(params, "version");
        let by_version = |column: fn(&VersionRow) -> Value| -> Vec<Vec<Value>> {
            version
                .as_deref()
                .and_then(|v| state.row(v))
                .map(|row| one(column(row)))
                .unwrap_or_default()
        };

        if sql.starts_with("SELECT STRING_AGG") {
            let csv = state
                .rows
                .iter()
                .map(|r| r.version.as_str())
                .collect::<Vec<_>>()
                .join(",");
            return Ok(one(if csv.is_empty() {
                Value::Null
            } else {
                Value::Text(csv)
            }));
        }
        if sql.starts_with(&format!("SELECT COUNT(*) FROM {TABLE} WHERE version")) {
            let n = version
                .as_deref()
                .map_or(0, |v| state.rows.iter().filter(|r| r.version == v).count());
            return Ok(one(Value::Int(n as i64)));
        }
        if sql.starts_with(&format!("SELECT COUNT(*) FROM {TABLE}")) {
            return Ok(one(Value::Int(state.rows.len() as i64)));
        }
        if sql.starts_with(&format!("SELECT version FROM {TABLE} ORDER BY id DESC")) {
            return Ok(state
                .rows
                .last()
                .map(|r| one(Value::Text(r.version.clone())))
                .unwrap_or_default());
        }
        if sql.starts_with(&format!("SELECT version FROM {TABLE} ORDER BY id")) {
            return Ok(state
                .rows
                .iter()
                .map(|r| vec![Value::Text(r.version.clone())])
                .collect());
        }
        if sql.starts_with("SELECT checksum") {
            return Ok(by_version(|r| r.checksum.clone().map_or(Value::Null, Value::Text)));
        }
        if sql.starts_with("SELECT down_script") {
            return Ok(by_version(|r| {
                r.down_script.clone().map_or(Value::Null, Value::Bytes)
            }));
        }
        if sql.starts_with("SELECT use_transaction") {
            return Ok(by_version(|r| Value::Bool(r.use_transaction)));
        }

        Err(MigrationError::database(format!("unexpected query: {sql}")))
    }
}

/// Write a migration file with an Author and Branch header.
pub fn write_migration(dir: &Path, filename: &str, up: &str, down: &str) {
    write_with_header(dir, filename, "-- Author: dana\n-- Branch: main\n", up, down);
}

/// Write a migration file with an explicit header block.
pub fn write_with_header(dir: &Path, filename: &str, header: &str, up: &str, down: &str) {
    let mut body = format!("{header}-- UP\n{up}\n");
    if !down.is_empty() {
        body.push_str(&format!("-- DOWN\n{down}\n"));
    }
    std::fs::write(dir.join(filename), body).unwrap();
}
