//! Migration orchestration: apply, rollback, redo and status.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::conflict::{ConflictSet, detect_conflicts};
use crate::dialect::VERSION_TABLE;
use crate::driver::{Driver, DriverRegistry, FromValue, Param};
use crate::error::{MigrateResult, MigrationError};
use crate::history::{VersionRecord, decompress_script};
use crate::migration::{Migration, compute_checksum};
use crate::provider::Provider;
use crate::runner::{LockGuard, SqlRunner, UnitOfWork};
use crate::safety::{assert_safe, assert_safe_outside_transaction};
use crate::split::split_statements;

/// Default name of the global migration lock.
pub const LOCK_NAME: &str = "migrator_lock";

/// Default lock acquisition timeout.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for the migration engine.
#[derive(Debug, Clone)]
pub struct MigrationConfig {
    /// Target database provider.
    pub provider: Provider,
    /// Driver connection string.
    pub connection_string: String,
    /// Directory holding the `.sql` migration files.
    pub migrations_dir: PathBuf,
    /// Version-tracking table.
    pub version_table: String,
    /// Name of the global lock.
    pub lock_name: String,
    /// How long to wait for the lock.
    pub lock_timeout: Duration,
}

impl MigrationConfig {
    /// Create a configuration with default directory, table and lock settings.
    pub fn new(provider: Provider, connection_string: impl Into<String>) -> Self {
        Self {
            provider,
            connection_string: connection_string.into(),
            migrations_dir: PathBuf::from("migrations"),
            version_table: VERSION_TABLE.to_string(),
            lock_name: LOCK_NAME.to_string(),
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }

    /// Set the migrations directory.
    pub fn migrations_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.migrations_dir = dir.into();
        self
    }

    /// Set the version table name.
    pub fn version_table(mut self, table: impl Into<String>) -> Self {
        self.version_table = table.into();
        self
    }

    /// Set the lock name.
    pub fn lock_name(mut self, name: impl Into<String>) -> Self {
        self.lock_name = name.into();
        self
    }

    /// Set the lock timeout.
    pub fn lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    /// Check the configuration before any database work.
    pub fn validate(&self) -> MigrateResult<()> {
        if self.connection_string.trim().is_empty() {
            return Err(MigrationError::configuration("connection string is required"));
        }

        let valid_table = !self.version_table.is_empty()
            && self
                .version_table
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.');
        if !valid_table {
            return Err(MigrationError::configuration(format!(
                "invalid version table name '{}'",
                self.version_table
            )));
        }

        if self.lock_name.is_empty() {
            return Err(MigrationError::configuration("lock name must not be empty"));
        }
        if self.lock_timeout.is_zero() {
            return Err(MigrationError::configuration("lock timeout must be positive"));
        }
        Ok(())
    }
}

/// Asked before a forced apply proceeds past detected conflicts.
pub trait ConflictConfirmation: Send + Sync {
    /// Return `true` to proceed.
    fn confirm(&self, conflicts: &ConflictSet) -> bool;
}

impl<F> ConflictConfirmation for F
where
    F: Fn(&ConflictSet) -> bool + Send + Sync,
{
    fn confirm(&self, conflicts: &ConflictSet) -> bool {
        self(conflicts)
    }
}

/// Refuses every forced apply. Used when nobody can be asked.
#[derive(Debug, Clone, Copy, Default)]
pub struct DenyConflicts;

impl ConflictConfirmation for DenyConflicts {
    fn confirm(&self, _conflicts: &ConflictSet) -> bool {
        false
    }
}

/// Which migrations `apply` considers.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ApplyTarget {
    /// Every pending migration.
    #[default]
    All,
    /// Pending migrations with a version less than or equal to this one.
    UpTo(String),
    /// Exactly this migration.
    Only(String),
}

/// Flags for `apply`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApplyOptions {
    /// Proceed past conflicts after confirmation.
    pub force: bool,
    /// Validate and report without executing.
    pub dry_run: bool,
}

/// Which migrations `rollback` reverts.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RollbackTarget {
    /// The most recently applied migration.
    #[default]
    Last,
    /// Every applied migration.
    All,
    /// Every applied migration newer than this version.
    To(String),
    /// Exactly this migration.
    Only(String),
}

/// Outcome of `apply`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ApplyReport {
    /// Versions applied, in order.
    pub applied: Vec<String>,
    /// Versions that would be applied in a dry run.
    pub planned: Vec<String>,
    /// Whether nothing was executed.
    pub dry_run: bool,
    /// Non-fatal findings (missing branch, risky statements).
    pub warnings: Vec<String>,
    /// Conflicts that were confirmed with `force`.
    pub conflicts: ConflictSet,
}

impl fmt::Display for ApplyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.dry_run {
            if self.planned.is_empty() {
                return writeln!(f, "Dry run: nothing to apply.");
            }
            writeln!(f, "Dry run: {} migration(s) would be applied:", self.planned.len())?;
            for version in &self.planned {
                writeln!(f, "  - {version}")?;
            }
            return Ok(());
        }

        if self.applied.is_empty() {
            return writeln!(f, "No pending migrations.");
        }
        writeln!(f, "Applied {} migration(s):", self.applied.len())?;
        for version in &self.applied {
            writeln!(f, "  - {version}")?;
        }
        Ok(())
    }
}

/// A migration in a range rollback that was skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RollbackFailure {
    /// Migration version.
    pub version: String,
    /// Why it was skipped.
    pub reason: String,
}

/// Outcome of `rollback`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RollbackReport {
    /// Versions rolled back, newest first.
    pub rolled_back: Vec<String>,
    /// Versions refused in a range rollback.
    pub failures: Vec<RollbackFailure>,
}

impl RollbackReport {
    /// Whether every targeted migration was rolled back.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

impl fmt::Display for RollbackReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.rolled_back.is_empty() && self.failures.is_empty() {
            return writeln!(f, "Nothing to roll back.");
        }
        if !self.rolled_back.is_empty() {
            writeln!(f, "Rolled back {} migration(s):", self.rolled_back.len())?;
            for version in &self.rolled_back {
                writeln!(f, "  - {version}")?;
            }
        }
        if !self.failures.is_empty() {
            writeln!(f, "Skipped {} migration(s):", self.failures.len())?;
            for failure in &self.failures {
                writeln!(f, "  - {}: {}", failure.version, failure.reason)?;
            }
        }
        Ok(())
    }
}

/// One line of the status report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusEntry {
    /// Migration version.
    pub version: String,
    /// Migration name, absent when the file is missing.
    pub name: Option<String>,
    /// File name, absent when the file is missing.
    pub filename: Option<String>,
    /// Whether the version is recorded as applied.
    pub applied: bool,
}

/// Applied and pending migrations plus conflicts among the pending ones.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StatusReport {
    /// All known migrations in version order.
    pub migrations: Vec<StatusEntry>,
    /// Number of pending migrations.
    pub pending: usize,
    /// Conflicts among pending migrations.
    pub conflicts: ConflictSet,
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "MIGRATIONS STATUS:")?;
        for entry in &self.migrations {
            let marker = if entry.applied { "[X]" } else { "[ ]" };
            match (&entry.name, &entry.filename) {
                (Some(name), Some(filename)) => {
                    writeln!(f, "{marker} {}  {name}  ({filename})", entry.version)?
                }
                _ => writeln!(f, "{marker} {}  (file missing)", entry.version)?,
            }
        }
        writeln!(f)?;
        writeln!(f, "Pending: {}", self.pending)?;
        if !self.conflicts.is_empty() {
            writeln!(f)?;
            write!(f, "{}", self.conflicts)?;
        }
        Ok(())
    }
}

/// Applies and reverts migrations against one database.
pub struct MigrationEngine {
    config: MigrationConfig,
    runner: SqlRunner,
    confirmation: Arc<dyn ConflictConfirmation>,
}

impl MigrationEngine {
    /// Create an engine over an existing driver.
    pub fn new(config: MigrationConfig, driver: Arc<dyn Driver>) -> MigrateResult<Self> {
        config.validate()?;
        if driver.provider() != config.provider {
            return Err(MigrationError::configuration(format!(
                "driver serves {} but the configuration targets {}",
                driver.provider(),
                config.provider
            )));
        }

        Ok(Self {
            config,
            runner: SqlRunner::new(driver),
            confirmation: Arc::new(DenyConflicts),
        })
    }

    /// Create an engine with a driver built from the registry.
    pub fn from_registry(config: MigrationConfig, registry: &DriverRegistry) -> MigrateResult<Self> {
        config.validate()?;
        let driver = registry.create(config.provider, &config.connection_string)?;
        Self::new(config, driver)
    }

    /// Set the confirmation used by forced applies.
    pub fn with_confirmation(mut self, confirmation: impl ConflictConfirmation + 'static) -> Self {
        self.confirmation = Arc::new(confirmation);
        self
    }

    /// The engine configuration.
    pub fn config(&self) -> &MigrationConfig {
        &self.config
    }

    fn table(&self) -> &str {
        &self.config.version_table
    }

    fn provider(&self) -> Provider {
        self.config.provider
    }

    /// Load every parseable migration file, sorted by file name.
    ///
    /// Files with a malformed name or no UP section are skipped with a warning.
    pub async fn load_migrations(&self) -> MigrateResult<Vec<Migration>> {
        load_migrations(&self.config.migrations_dir).await
    }

    /// Create the version table if needed. Failures are only logged.
    pub async fn ensure_version_table(&self) {
        let sql = self.runner.dialect().create_version_table(self.table());
        if let Err(err) = self.runner.execute_non_query(&sql, &[], None).await {
            warn!(
                table = %self.table(),
                error = %err,
                "Could not create the version table; it may need to be created manually"
            );
        }
    }

    /// Applied versions in apply order.
    pub async fn applied_versions(&self) -> MigrateResult<Vec<String>> {
        let dialect = self.runner.dialect();
        let aggregate = self
            .runner
            .query_scalar::<String>(&dialect.applied_versions(self.table()), &[])
            .await;
        let count = self
            .runner
            .query_scalar::<i64>(&dialect.count_versions(self.table()), &[])
            .await?
            .unwrap_or(0);

        match aggregate {
            Ok(csv) => {
                let versions: Vec<String> = csv
                    .as_deref()
                    .unwrap_or_default()
                    .split(',')
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .map(String::from)
                    .collect();
                if i64::try_from(versions.len()).is_ok_and(|n| n == count) {
                    return Ok(versions);
                }
                debug!(
                    expected = count,
                    got = versions.len(),
                    "Aggregated version list is incomplete; reading rows"
                );
            }
            Err(err) => debug!(error = %err, "Version aggregate failed; reading rows"),
        }

        self.runner
            .query_column(&dialect.applied_versions_rows(self.table()), &[])
            .await?
            .into_iter()
            .filter(|v| !v.is_null())
            .map(String::from_value)
            .collect()
    }

    /// Most recently applied version.
    pub async fn latest_version(&self) -> MigrateResult<Option<String>> {
        let sql = self.runner.dialect().latest_version(self.table());
        self.runner.query_scalar::<String>(&sql, &[]).await
    }

    /// Report applied and pending migrations.
    pub async fn status(&self) -> MigrateResult<StatusReport> {
        self.ensure_version_table().await;
        let migrations = self.load_migrations().await?;
        let applied: HashSet<String> = self.applied_versions().await?.into_iter().collect();

        let mut entries: Vec<StatusEntry> = migrations
            .iter()
            .map(|m| StatusEntry {
                version: m.version.clone(),
                name: Some(m.name.clone()),
                filename: Some(m.filename.clone()),
                applied: applied.contains(&m.version),
            })
            .collect();

        let known: HashSet<&str> = migrations.iter().map(|m| m.version.as_str()).collect();
        entries.extend(
            applied
                .iter()
                .filter(|v| !known.contains(v.as_str()))
                .map(|v| StatusEntry {
                    version: v.clone(),
                    name: None,
                    filename: None,
                    applied: true,
                }),
        );
        entries.sort_by(|a, b| a.version.cmp(&b.version));

        let pending: Vec<&Migration> = migrations
            .iter()
            .filter(|m| !applied.contains(&m.version))
            .collect();

        Ok(StatusReport {
            migrations: entries,
            pending: pending.len(),
            conflicts: detect_conflicts(pending),
        })
    }

    /// Apply pending migrations.
    ///
    /// Each migration runs in its own unit of work together with its version
    /// row. The first failure stops the batch; earlier migrations stay applied.
    pub async fn apply(
        &self,
        target: ApplyTarget,
        options: ApplyOptions,
    ) -> MigrateResult<ApplyReport> {
        self.ensure_version_table().await;
        let migrations = self.load_migrations().await?;

        if let ApplyTarget::Only(version) = &target {
            if !migrations.iter().any(|m| &m.version == version) {
                return Err(MigrationError::NotFound(version.clone()));
            }
        }

        let applied: HashSet<String> = self.applied_versions().await?.into_iter().collect();
        let pending = select_pending(&migrations, &applied, &target);

        let mut report = ApplyReport {
            dry_run: options.dry_run,
            ..ApplyReport::default()
        };

        for migration in &pending {
            report.warnings.extend(self.validate_migration(migration)?);
        }

        let conflicts = detect_conflicts(pending.iter().copied());
        if !conflicts.is_empty() {
            if !options.force {
                return Err(MigrationError::Conflict(conflicts.to_string()));
            }
            // Dry runs never prompt.
            if !options.dry_run {
                if !self.confirmation.confirm(&conflicts) {
                    return Err(MigrationError::Cancelled);
                }
                warn!(tables = conflicts.len(), "Applying despite conflicts");
            }
            report.conflicts = conflicts;
        }

        if options.dry_run {
            report.planned = pending.iter().map(|m| m.version.clone()).collect();
            return Ok(report);
        }

        if pending.is_empty() {
            info!("No pending migrations");
            return Ok(report);
        }

        let guard = self.lock().await?;
        let result = self.apply_locked(&pending, &mut report).await;
        self.unlock(guard).await;
        result.map(|()| report)
    }

    async fn apply_locked(
        &self,
        pending: &[&Migration],
        report: &mut ApplyReport,
    ) -> MigrateResult<()> {
        // Another process may have applied some of them while we waited.
        let applied: HashSet<String> = self.applied_versions().await?.into_iter().collect();

        for migration in pending {
            if applied.contains(&migration.version) {
                debug!(version = %migration.version, "Already applied by another run");
                continue;
            }
            self.apply_one(migration, false).await?;
            report.applied.push(migration.version.clone());
        }
        Ok(())
    }

    /// Run the UP body and record the version in one unit of work. With
    /// `refresh_checksum` the stored checksum is rewritten in the same unit.
    async fn apply_one(
        &self,
        migration: &Migration,
        refresh_checksum: bool,
    ) -> MigrateResult<()> {
        let version = migration.version.as_str();
        let statements = split_statements(&migration.up_sql);
        let record = VersionRecord::from_migration(migration)?;

        let mut unit = self
            .runner
            .execute_script(&statements, migration.header.use_transaction, None)
            .await
            .map_err(|e| e.in_migration(version))?;

        let insert = self.runner.dialect().insert_version(self.table());
        if let Err(err) = self
            .runner
            .execute_non_query(&insert, &record.insert_params(), Some(&mut unit))
            .await
        {
            discard(unit).await;
            return Err(err.in_migration(version));
        }

        if refresh_checksum {
            let update = self.runner.dialect().update_checksum(self.table());
            let params = [
                Param::text("checksum", compute_checksum(&migration.up_sql, &migration.down_sql)),
                Param::text("version", version),
            ];
            if let Err(err) = self
                .runner
                .execute_non_query(&update, &params, Some(&mut unit))
                .await
            {
                discard(unit).await;
                return Err(err.in_migration(version));
            }
        }

        unit.commit().await.map_err(|e| e.in_migration(version))?;
        info!(version = %version, name = %migration.name, "Applied migration");
        Ok(())
    }

    /// Roll back applied migrations.
    ///
    /// In a range rollback, an irreversible migration, a checksum mismatch or
    /// a missing file skips that migration and the range continues. Execution
    /// errors always stop.
    pub async fn rollback(&self, target: RollbackTarget) -> MigrateResult<RollbackReport> {
        self.ensure_version_table().await;
        let migrations = self.load_migrations().await?;

        let guard = self.lock().await?;
        let result = self.rollback_locked(&migrations, target).await;
        self.unlock(guard).await;
        result
    }

    async fn rollback_locked(
        &self,
        migrations: &[Migration],
        target: RollbackTarget,
    ) -> MigrateResult<RollbackReport> {
        let mut report = RollbackReport::default();

        let (targets, single) = match target {
            RollbackTarget::Last => match self.latest_version().await? {
                Some(version) => (vec![version], true),
                None => {
                    info!("No applied migrations to roll back");
                    return Ok(report);
                }
            },
            RollbackTarget::Only(version) => {
                if !self.is_applied(&version).await? {
                    return Err(MigrationError::NotApplied(version));
                }
                (vec![version], true)
            }
            RollbackTarget::All => (newest_first(self.applied_versions().await?, None), false),
            RollbackTarget::To(version) => (
                newest_first(self.applied_versions().await?, Some(version.as_str())),
                false,
            ),
        };

        for version in targets {
            match self.rollback_one(migrations, &version, true).await {
                Ok(()) => report.rolled_back.push(version),
                Err(err) if !single && err.is_recoverable() => {
                    warn!(version = %version, error = %err, "Skipping migration in rollback range");
                    report.failures.push(RollbackFailure {
                        version,
                        reason: err.to_string(),
                    });
                }
                Err(err) => return Err(err),
            }
        }

        Ok(report)
    }

    async fn rollback_one(
        &self,
        migrations: &[Migration],
        version: &str,
        verify_checksum: bool,
    ) -> MigrateResult<()> {
        let migration = migrations
            .iter()
            .find(|m| m.version == version)
            .ok_or_else(|| MigrationError::NotFound(version.to_string()))?;

        if !migration.is_reversible() {
            return Err(MigrationError::Irreversible(version.to_string()));
        }

        let dialect = self.runner.dialect();
        let by_version = [Param::text("version", version)];

        if verify_checksum {
            let stored = self
                .runner
                .query_scalar::<String>(&dialect.checksum_by_version(self.table()), &by_version)
                .await?;
            // A missing stored checksum never matches.
            let expected = stored
                .as_deref()
                .map(str::trim)
                .filter(|c| !c.is_empty());
            if !expected.is_some_and(|c| c.eq_ignore_ascii_case(&migration.checksum)) {
                return Err(MigrationError::ChecksumMismatch {
                    version: version.to_string(),
                    expected: expected.unwrap_or("<none>").to_string(),
                    actual: migration.checksum.clone(),
                });
            }
        }

        let down_sql = match self
            .runner
            .query_scalar_bytes(&dialect.down_script_by_version(self.table()), &by_version)
            .await?
        {
            Some(bytes) => decompress_script(&bytes)?,
            None => return Err(MigrationError::Irreversible(version.to_string())),
        };
        let use_transaction = self
            .runner
            .query_scalar::<bool>(&dialect.use_transaction_by_version(self.table()), &by_version)
            .await?
            .unwrap_or(true);

        let statements = split_statements(&down_sql);
        if use_transaction {
            assert_safe(version, &statements, self.provider())?;
        } else {
            assert_safe_outside_transaction(version, &statements, self.provider());
        }

        let mut unit = self
            .runner
            .execute_script(&statements, use_transaction, None)
            .await
            .map_err(|e| e.in_migration(version))?;

        let delete = dialect.delete_version(self.table());
        if let Err(err) = self
            .runner
            .execute_non_query(&delete, &by_version, Some(&mut unit))
            .await
        {
            discard(unit).await;
            return Err(err.in_migration(version));
        }

        unit.commit().await.map_err(|e| e.in_migration(version))?;
        info!(version = %version, name = %migration.name, "Rolled back migration");
        Ok(())
    }

    /// Roll back one migration without checking its checksum, re-apply it
    /// from the current file and store the fresh checksum.
    pub async fn redo(&self, version: &str) -> MigrateResult<()> {
        self.ensure_version_table().await;
        let migrations = self.load_migrations().await?;
        let migration = migrations
            .iter()
            .find(|m| m.version == version)
            .ok_or_else(|| MigrationError::NotFound(version.to_string()))?;

        self.validate_migration(migration)?;

        let guard = self.lock().await?;
        let result = self.redo_locked(&migrations, migration).await;
        self.unlock(guard).await;
        result
    }

    async fn redo_locked(&self, migrations: &[Migration], migration: &Migration) -> MigrateResult<()> {
        let version = migration.version.as_str();
        if !self.is_applied(version).await? {
            return Err(MigrationError::NotApplied(version.to_string()));
        }

        self.rollback_one(migrations, version, false).await?;
        self.apply_one(migration, true).await?;

        info!(version = %version, "Redo complete");
        Ok(())
    }

    async fn is_applied(&self, version: &str) -> MigrateResult<bool> {
        let sql = self.runner.dialect().version_exists(self.table());
        let count = self
            .runner
            .query_scalar::<i64>(&sql, &[Param::text("version", version)])
            .await?
            .unwrap_or(0);
        Ok(count > 0)
    }

    /// Header and safety checks; returns non-fatal warnings.
    fn validate_migration(&self, migration: &Migration) -> MigrateResult<Vec<String>> {
        let mut warnings = migration.validate_header()?;
        for warning in &warnings {
            warn!(version = %migration.version, "{warning}");
        }

        let statements = split_statements(&migration.up_sql);
        let risks = if migration.header.use_transaction {
            assert_safe(&migration.version, &statements, self.provider())?
        } else {
            assert_safe_outside_transaction(&migration.version, &statements, self.provider())
        };
        warnings.extend(risks.iter().map(|r| format!("{}: {r}", migration.version)));
        Ok(warnings)
    }

    async fn lock(&self) -> MigrateResult<LockGuard> {
        self.runner
            .acquire_lock(&self.config.lock_name, self.config.lock_timeout)
            .await?
            .ok_or_else(|| MigrationError::LockUnavailable {
                name: self.config.lock_name.clone(),
                timeout_secs: self.config.lock_timeout.as_secs(),
            })
    }

    async fn unlock(&self, guard: LockGuard) {
        let name = guard.name().to_string();
        if let Err(err) = self.runner.release_lock(guard).await {
            warn!(lock = %name, error = %err, "Failed to release migration lock");
        }
    }
}

async fn discard(unit: UnitOfWork) {
    if let Err(err) = unit.rollback().await {
        warn!(error = %err, "Rollback failed");
    }
}

/// Read and parse every `*.sql` file in `dir`, sorted case-insensitively.
pub async fn load_migrations(dir: &Path) -> MigrateResult<Vec<Migration>> {
    let mut entries = tokio::fs::read_dir(dir).await.map_err(|e| {
        MigrationError::configuration(format!(
            "cannot read migrations directory '{}': {e}",
            dir.display()
        ))
    })?;

    let mut paths = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let is_sql = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("sql"));
        if is_sql && entry.file_type().await?.is_file() {
            paths.push(path);
        }
    }
    paths.sort_by_key(|p| {
        p.file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default()
    });

    let mut migrations = Vec::with_capacity(paths.len());
    let mut seen: HashMap<String, String> = HashMap::new();
    for path in paths {
        let migration = match Migration::load_from_file(&path).await {
            Ok(migration) => migration,
            Err(err) if err.is_format_error() => {
                warn!(file = %path.display(), error = %err, "Skipping migration file");
                continue;
            }
            Err(err) => return Err(err),
        };

        if let Some(first) = seen.get(&migration.version) {
            return Err(MigrationError::format(
                migration.filename.clone(),
                format!("version '{}' is already used by '{first}'", migration.version),
            ));
        }
        seen.insert(migration.version.clone(), migration.filename.clone());
        migrations.push(migration);
    }
    Ok(migrations)
}

fn select_pending<'a>(
    migrations: &'a [Migration],
    applied: &HashSet<String>,
    target: &ApplyTarget,
) -> Vec<&'a Migration> {
    migrations
        .iter()
        .filter(|m| match target {
            ApplyTarget::All => true,
            ApplyTarget::UpTo(ceiling) => m.version.as_str() <= ceiling.as_str(),
            ApplyTarget::Only(version) => &m.version == version,
        })
        .filter(|m| !applied.contains(&m.version))
        .collect()
}

/// Applied versions newer than `floor` (all when `None`), newest first.
fn newest_first(mut applied: Vec<String>, floor: Option<&str>) -> Vec<String> {
    if let Some(floor) = floor {
        applied.retain(|v| v.as_str() > floor);
    }
    applied.sort_by(|a, b| b.cmp(a));
    applied
}
