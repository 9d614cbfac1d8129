//! Supported database providers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::MigrationError;

/// A relational database backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// PostgreSQL.
    #[serde(alias = "postgres", alias = "pg")]
    Postgresql,
    /// Microsoft SQL Server.
    #[serde(alias = "sqlserver")]
    Mssql,
    /// MySQL and MariaDB.
    #[serde(alias = "mariadb")]
    Mysql,
    /// Oracle Database.
    Oracle,
}

impl Provider {
    /// All providers, in display order.
    pub const ALL: [Provider; 4] = [
        Provider::Postgresql,
        Provider::Mssql,
        Provider::Mysql,
        Provider::Oracle,
    ];

    /// Canonical lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Postgresql => "postgresql",
            Self::Mssql => "mssql",
            Self::Mysql => "mysql",
            Self::Oracle => "oracle",
        }
    }

    /// Human-readable product name, used in rule reasons.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Postgresql => "PostgreSQL",
            Self::Mssql => "SQL Server",
            Self::Mysql => "MySQL",
            Self::Oracle => "Oracle",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = MigrationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgresql" | "postgres" | "pg" => Ok(Self::Postgresql),
            "mssql" | "sqlserver" => Ok(Self::Mssql),
            "mysql" | "mariadb" => Ok(Self::Mysql),
            "oracle" => Ok(Self::Oracle),
            other => Err(MigrationError::configuration(format!(
                "unknown provider '{other}' (expected one of: postgresql, mssql, mysql, oracle)"
            ))),
        }
    }
}
