//! Statement execution and locking on top of a [`Driver`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::dialect::{Dialect, LockStatements, dialect_for};
use crate::driver::{Driver, FromValue, Param, Session, Value};
use crate::error::{MigrateResult, MigrationError};
use crate::provider::Provider;

/// Interval between `pg_try_advisory_lock` style attempts.
const LOCK_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// A session plus the transaction opened on it, if any.
///
/// Returned by [`SqlRunner::execute_script`]; the holder decides whether to
/// commit or roll back.
pub struct UnitOfWork {
    session: Box<dyn Session>,
    in_transaction: bool,
}

impl UnitOfWork {
    /// Wrap a session with no open transaction.
    pub fn new(session: Box<dyn Session>) -> Self {
        Self {
            session,
            in_transaction: false,
        }
    }

    /// Whether a transaction is open.
    pub fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    /// The underlying session.
    pub fn session(&mut self) -> &mut dyn Session {
        self.session.as_mut()
    }

    /// Open a transaction unless one is already open.
    pub async fn begin(&mut self) -> MigrateResult<()> {
        if !self.in_transaction {
            self.session.begin().await?;
            self.in_transaction = true;
        }
        Ok(())
    }

    /// Commit the open transaction, if any.
    pub async fn commit(mut self) -> MigrateResult<()> {
        if self.in_transaction {
            self.in_transaction = false;
            self.session.commit().await?;
        }
        Ok(())
    }

    /// Roll back the open transaction, if any.
    pub async fn rollback(mut self) -> MigrateResult<()> {
        self.abort().await
    }

    async fn abort(&mut self) -> MigrateResult<()> {
        if self.in_transaction {
            self.in_transaction = false;
            self.session.rollback().await?;
        }
        Ok(())
    }
}

/// A held named lock. Pass it back to [`SqlRunner::release_lock`].
pub struct LockGuard {
    name: String,
    held: Option<(Box<dyn Session>, LockStatements)>,
}

impl LockGuard {
    /// Lock name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the lock is backed by a database primitive.
    pub fn is_native(&self) -> bool {
        self.held.is_some()
    }
}

/// Executes statements and manages locks for one provider.
#[derive(Clone)]
pub struct SqlRunner {
    driver: Arc<dyn Driver>,
    dialect: &'static dyn Dialect,
}

impl SqlRunner {
    /// Create a runner for a driver.
    pub fn new(driver: Arc<dyn Driver>) -> Self {
        let dialect = dialect_for(driver.provider());
        Self { driver, dialect }
    }

    /// Provider of the underlying driver.
    pub fn provider(&self) -> Provider {
        self.dialect.provider()
    }

    /// SQL dialect of the underlying driver.
    pub fn dialect(&self) -> &'static dyn Dialect {
        self.dialect
    }

    /// Open a fresh unit of work.
    pub async fn open(&self) -> MigrateResult<UnitOfWork> {
        Ok(UnitOfWork::new(self.driver.connect().await?))
    }

    /// Run statements in order on `unit` (or a new session).
    ///
    /// With `use_transaction` a transaction is opened if none is open yet and
    /// left uncommitted in the returned unit. On failure any open transaction
    /// is rolled back before the error is returned.
    pub async fn execute_script(
        &self,
        statements: &[String],
        use_transaction: bool,
        unit: Option<UnitOfWork>,
    ) -> MigrateResult<UnitOfWork> {
        let mut unit = match unit {
            Some(unit) => unit,
            None => self.open().await?,
        };

        if use_transaction {
            unit.begin().await?;
        }

        let total = statements.len();
        for (index, statement) in statements.iter().enumerate() {
            debug!(statement = %statement, "Executing statement");

            if let Err(err) = unit.session().execute(statement, &[]).await {
                if let Err(rollback_err) = unit.abort().await {
                    warn!(error = %rollback_err, "Rollback after failed statement also failed");
                }
                return Err(annotate(err, index, total, statement, use_transaction));
            }
        }

        Ok(unit)
    }

    /// Execute one parameterized statement.
    pub async fn execute_non_query(
        &self,
        sql: &str,
        params: &[Param],
        unit: Option<&mut UnitOfWork>,
    ) -> MigrateResult<u64> {
        debug!(statement = %sql, "Executing statement");
        match unit {
            Some(unit) => unit.session().execute(sql, params).await,
            None => self.driver.connect().await?.execute(sql, params).await,
        }
    }

    /// First column of every row.
    pub async fn query_column(&self, sql: &str, params: &[Param]) -> MigrateResult<Vec<Value>> {
        debug!(statement = %sql, "Executing query");
        let rows = self.driver.connect().await?.query(sql, params).await?;
        Ok(rows
            .into_iter()
            .map(|row| row.into_iter().next().unwrap_or(Value::Null))
            .collect())
    }

    /// First column of the first row, `None` for no rows or NULL.
    pub async fn query_scalar<T: FromValue>(
        &self,
        sql: &str,
        params: &[Param],
    ) -> MigrateResult<Option<T>> {
        let value = self
            .query_column(sql, params)
            .await?
            .into_iter()
            .next()
            .unwrap_or(Value::Null);
        Option::<T>::from_value(value)
    }

    /// Binary scalar, e.g. a stored down-script.
    pub async fn query_scalar_bytes(
        &self,
        sql: &str,
        params: &[Param],
    ) -> MigrateResult<Option<Vec<u8>>> {
        self.query_scalar::<Vec<u8>>(sql, params).await
    }

    /// Try to take the named lock within `timeout`.
    ///
    /// Returns `Ok(None)` when the lock is held elsewhere. A failing acquire
    /// query also counts as "not acquired". Providers without a native lock
    /// always succeed, with a warning.
    pub async fn acquire_lock(
        &self,
        name: &str,
        timeout: Duration,
    ) -> MigrateResult<Option<LockGuard>> {
        let Some(statements) = self.dialect.lock_statements(name, timeout) else {
            warn!(
                provider = %self.provider(),
                lock = %name,
                "No native advisory lock for this provider; concurrent runs are not prevented"
            );
            return Ok(Some(LockGuard {
                name: name.to_string(),
                held: None,
            }));
        };

        let mut session = self.driver.connect().await?;
        let deadline = Instant::now() + timeout;

        loop {
            let acquired = match session
                .query(&statements.acquire, &statements.acquire_params)
                .await
            {
                Ok(rows) => {
                    let value = rows
                        .into_iter()
                        .next()
                        .and_then(|row| row.into_iter().next())
                        .unwrap_or(Value::Null);
                    self.dialect.is_lock_acquired(&value)
                }
                Err(err) => {
                    warn!(lock = %name, error = %err, "Lock acquisition query failed");
                    return Ok(None);
                }
            };

            if acquired {
                debug!(lock = %name, "Lock acquired");
                return Ok(Some(LockGuard {
                    name: name.to_string(),
                    held: Some((session, statements)),
                }));
            }

            let now = Instant::now();
            if !statements.poll || now >= deadline {
                return Ok(None);
            }
            tokio::time::sleep(LOCK_POLL_INTERVAL.min(deadline - now)).await;
        }
    }

    /// Release a lock on the session that took it.
    pub async fn release_lock(&self, mut guard: LockGuard) -> MigrateResult<()> {
        let Some((mut session, statements)) = guard.held.take() else {
            return Ok(());
        };

        session
            .query(&statements.release, &statements.release_params)
            .await?;
        debug!(lock = %guard.name, "Lock released");
        Ok(())
    }
}

fn annotate(
    err: MigrationError,
    index: usize,
    total: usize,
    statement: &str,
    transactional: bool,
) -> MigrationError {
    let MigrationError::Database(message) = err else {
        return err;
    };

    let mut detail = format!("{message}\n  at statement {} of {total}: {statement}", index + 1);
    if !transactional && index > 0 {
        detail.push_str(&format!(
            "\n  {index} earlier statement(s) ran outside a transaction and were not rolled back"
        ));
    }
    MigrationError::Database(detail)
}
