//! CLI configuration handling.
//!
//! Lowest to highest precedence: built-in defaults, `migrator.toml`, `.env`,
//! `MIGRATOR_*` environment variables, command-line flags. The last three
//! reach [`GlobalArgs`] through clap's `env` fallbacks.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use migrator_engine::{DEFAULT_LOCK_TIMEOUT, MigrationConfig, Provider};

use crate::cli::GlobalArgs;
use crate::error::{CliError, CliResult};

/// Config file name, searched upward from the working directory.
pub const CONFIG_FILE_NAME: &str = "migrator.toml";

/// Default migrations directory, relative to the working directory.
pub const MIGRATIONS_DIR: &str = "migrations";

/// Contents of `migrator.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Database provider (postgresql, mssql, mysql, oracle)
    pub provider: Option<String>,

    /// Connection string
    pub connection: Option<String>,

    /// Migrations directory, relative to the config file
    pub migrations_dir: Option<PathBuf>,

    /// Seconds to wait for the migration lock
    pub lock_timeout_secs: Option<u64>,

    /// Defaults for `create`
    pub author: AuthorConfig,
}

/// `[author]` table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuthorConfig {
    /// Author header
    pub name: Option<String>,

    /// Branch header
    pub branch: Option<String>,
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Walk up from `start` looking for `migrator.toml`.
    pub fn find(start: &Path) -> Option<PathBuf> {
        start
            .ancestors()
            .map(|dir| dir.join(CONFIG_FILE_NAME))
            .find(|candidate| candidate.is_file())
    }
}

/// Settings after every layer has been applied.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Provider name as given; parsed when a command needs the database.
    pub provider: Option<String>,
    /// Connection string.
    pub connection: Option<String>,
    /// Migrations directory.
    pub migrations_dir: PathBuf,
    /// Lock acquisition timeout.
    pub lock_timeout: Duration,
    /// Default author for `create`.
    pub author: Option<String>,
    /// Default branch for `create`.
    pub branch: Option<String>,
    /// The config file that was read, if any.
    pub config_file: Option<PathBuf>,
}

impl Settings {
    /// Merge `migrator.toml` (explicit or discovered from `cwd`) under the flags.
    pub fn resolve(args: &GlobalArgs, cwd: &Path) -> CliResult<Self> {
        let config_file = match &args.config {
            Some(path) => {
                let path = cwd.join(path);
                if !path.is_file() {
                    return Err(CliError::config(format!(
                        "config file {} does not exist",
                        path.display()
                    )));
                }
                Some(path)
            }
            None => Config::find(cwd),
        };

        let file = match &config_file {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };
        let base = config_file
            .as_deref()
            .and_then(Path::parent)
            .unwrap_or(cwd)
            .to_path_buf();

        Ok(Self::merge(file, &base, args, cwd, config_file))
    }

    fn merge(
        file: Config,
        base: &Path,
        args: &GlobalArgs,
        cwd: &Path,
        config_file: Option<PathBuf>,
    ) -> Self {
        let migrations_dir = match (&args.migrations_dir, file.migrations_dir) {
            (Some(dir), _) => cwd.join(dir),
            (None, Some(dir)) => base.join(dir),
            (None, None) => cwd.join(MIGRATIONS_DIR),
        };

        Self {
            provider: non_empty(args.provider.clone()).or(non_empty(file.provider)),
            connection: non_empty(args.conn.clone()).or(non_empty(file.connection)),
            migrations_dir,
            lock_timeout: file
                .lock_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_LOCK_TIMEOUT),
            author: non_empty(file.author.name),
            branch: non_empty(file.author.branch),
            config_file,
        }
    }

    /// The parsed provider. Missing or unknown providers are configuration errors.
    pub fn provider(&self) -> CliResult<Provider> {
        let name = self
            .provider
            .as_deref()
            .ok_or_else(|| CliError::config("no database provider configured"))?;
        Ok(name.parse::<Provider>()?)
    }

    /// Engine configuration for commands that touch the database.
    pub fn migration_config(&self) -> CliResult<MigrationConfig> {
        let provider = self.provider()?;
        let connection = self
            .connection
            .as_deref()
            .ok_or_else(|| CliError::config("no connection string configured"))?;

        let config = MigrationConfig::new(provider, connection)
            .migrations_dir(self.migrations_dir.clone())
            .lock_timeout(self.lock_timeout);
        config.validate()?;
        Ok(config)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Mask the password in a URL or `key=value;` connection string for display.
pub fn redact_connection(connection: &str) -> String {
    if let Ok(mut url) = url::Url::parse(connection) {
        if url.password().is_some() && url.set_password(Some("****")).is_ok() {
            return url.to_string();
        }
        if url.has_host() {
            return url.to_string();
        }
    }

    connection
        .split(';')
        .map(|pair| match pair.split_once('=') {
            Some((key, _))
                if matches!(
                    key.trim().to_ascii_lowercase().as_str(),
                    "password" | "pwd"
                ) =>
            {
                format!("{key}=****")
            }
            _ => pair.to_string(),
        })
        .collect::<Vec<_>>()
        .join(";")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_parse_config_file() {
        let config: Config = toml::from_str(
            r#"
            provider = "postgresql"
            connection = "postgres://localhost/app"
            migrations_dir = "db/migrations"
            lock_timeout_secs = 10

            [author]
            name = "Dana"
            branch = "main"
            "#,
        )
        .unwrap();

        assert_eq!(config.provider.as_deref(), Some("postgresql"));
        assert_eq!(config.lock_timeout_secs, Some(10));
        assert_eq!(config.author.name.as_deref(), Some("Dana"));
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = toml::from_str::<Config>("providr = \"pg\"").unwrap_err();
        assert!(err.to_string().contains("providr"));
    }

    #[test]
    fn test_defaults_without_file() {
        let dir = TempDir::new().unwrap();
        let settings = Settings::resolve(&GlobalArgs::default(), dir.path()).unwrap();

        assert_eq!(settings.provider, None);
        assert_eq!(settings.migrations_dir, dir.path().join(MIGRATIONS_DIR));
        assert_eq!(settings.lock_timeout, DEFAULT_LOCK_TIMEOUT);
        assert_eq!(settings.config_file, None);
    }

    #[test]
    fn test_file_found_upward_and_dir_relative_to_it() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "provider = \"mysql\"\nmigrations_dir = \"sql\"\n",
        )
        .unwrap();
        let nested = dir.path().join("services/api");
        std::fs::create_dir_all(&nested).unwrap();

        let settings = Settings::resolve(&GlobalArgs::default(), &nested).unwrap();
        assert_eq!(settings.provider.as_deref(), Some("mysql"));
        assert_eq!(settings.migrations_dir, dir.path().join("sql"));
    }

    #[test]
    fn test_flags_override_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "provider = \"mysql\"\nconnection = \"mysql://localhost/app\"\n",
        )
        .unwrap();

        let args = GlobalArgs {
            provider: Some("pg".into()),
            migrations_dir: Some("other".into()),
            ..GlobalArgs::default()
        };
        let settings = Settings::resolve(&args, dir.path()).unwrap();

        assert_eq!(settings.provider().unwrap(), Provider::Postgresql);
        assert_eq!(settings.connection.as_deref(), Some("mysql://localhost/app"));
        assert_eq!(settings.migrations_dir, dir.path().join("other"));
    }

    #[test]
    fn test_missing_explicit_config() {
        let dir = TempDir::new().unwrap();
        let args = GlobalArgs {
            config: Some("nope.toml".into()),
            ..GlobalArgs::default()
        };
        assert!(matches!(
            Settings::resolve(&args, dir.path()),
            Err(CliError::Config(_))
        ));
    }

    #[test]
    fn test_migration_config_requires_provider_and_connection() {
        let dir = TempDir::new().unwrap();
        let mut settings = Settings::resolve(&GlobalArgs::default(), dir.path()).unwrap();
        assert!(matches!(settings.migration_config(), Err(CliError::Config(_))));

        settings.provider = Some("oracle".into());
        assert!(matches!(settings.migration_config(), Err(CliError::Config(_))));

        settings.connection = Some("oracle://db/orcl".into());
        let config = settings.migration_config().unwrap();
        assert_eq!(config.provider, Provider::Oracle);
    }

    #[test]
    fn test_unknown_provider() {
        let dir = TempDir::new().unwrap();
        let mut settings = Settings::resolve(&GlobalArgs::default(), dir.path()).unwrap();
        settings.provider = Some("sqlite".into());
        assert!(matches!(settings.provider(), Err(CliError::Migration(_))));
    }

    #[test]
    fn test_redact_connection() {
        assert_eq!(
            redact_connection("postgres://app:secret@db:5432/orders"),
            "postgres://app:****@db:5432/orders"
        );
        assert_eq!(
            redact_connection("Server=db;User Id=sa;Password=secret"),
            "Server=db;User Id=sa;Password=****"
        );
        assert_eq!(
            redact_connection("host=db user=app"),
            "host=db user=app"
        );
    }
}
