//! Provider-specific unsafe SQL detection.
//!
//! Every provider has a table of rules. A rule pairs a case-insensitive
//! pattern with a reason and a [`RiskLevel`]. Rules are matched against each
//! statement of a script separately.
//!
//! | Risk | Inside a transaction | Outside a transaction |
//! |---|---|---|
//! | [`RiskLevel::ForbiddenInTransaction`] | fatal | not checked |
//! | [`RiskLevel::ImplicitCommit`] | fatal | not checked |
//! | [`RiskLevel::OperationalRisk`] | warning | warning |

use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

use regex_lite::Regex;
use serde::Serialize;
use tracing::warn;

use crate::error::{MigrateResult, MigrationError};
use crate::provider::Provider;
use crate::split::{split_statements, strip_comments};

/// How dangerous a matched construct is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RiskLevel {
    /// The database rejects the statement inside a transaction block.
    ForbiddenInTransaction,
    /// The database silently commits the open transaction.
    ImplicitCommit,
    /// Valid but potentially slow or lock-heavy.
    OperationalRisk,
}

impl RiskLevel {
    /// Whether a match blocks a transactional migration.
    pub fn is_fatal_in_transaction(&self) -> bool {
        !matches!(self, Self::OperationalRisk)
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ForbiddenInTransaction => "forbidden in transaction",
            Self::ImplicitCommit => "implicit commit",
            Self::OperationalRisk => "operational risk",
        })
    }
}

/// A single detection rule.
#[derive(Debug, Clone)]
pub struct UnsafeSqlRule {
    pattern: Regex,
    unless: Option<Regex>,
    /// Human readable explanation.
    pub reason: String,
    /// Risk classification.
    pub risk: RiskLevel,
}

impl UnsafeSqlRule {
    /// Create a rule. The pattern is compiled case-insensitive and multi-line.
    ///
    /// # Panics
    ///
    /// Panics if `pattern` is not a valid regular expression.
    pub fn new(pattern: &str, reason: impl Into<String>, risk: RiskLevel) -> Self {
        Self {
            pattern: compile(pattern),
            unless: None,
            reason: reason.into(),
            risk,
        }
    }

    /// Suppress the rule for statements that also match `pattern`.
    pub fn unless(mut self, pattern: &str) -> Self {
        self.unless = Some(compile(pattern));
        self
    }

    /// Whether the rule fires for a single statement.
    pub fn matches(&self, statement: &str) -> bool {
        self.pattern.is_match(statement)
            && !self.unless.as_ref().is_some_and(|u| u.is_match(statement))
    }
}

fn compile(pattern: &str) -> Regex {
    Regex::new(&format!("(?im){pattern}")).expect("built-in rule pattern is valid")
}

/// A rule that fired for a statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleMatch {
    /// Rule reason.
    pub reason: String,
    /// Rule risk.
    pub risk: RiskLevel,
    /// The statement, shortened for display.
    pub statement: String,
}

impl fmt::Display for RuleMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]: {}", self.reason, self.risk, self.statement)
    }
}

static RULES: LazyLock<HashMap<Provider, Vec<UnsafeSqlRule>>> = LazyLock::new(|| {
    Provider::ALL
        .into_iter()
        .map(|provider| {
            let mut rules = provider_rules(provider);
            rules.extend(common_rules(provider));
            (provider, rules)
        })
        .collect()
});

fn provider_rules(provider: Provider) -> Vec<UnsafeSqlRule> {
    use RiskLevel::*;

    let forbidden = |pattern: &str, what: &str| {
        UnsafeSqlRule::new(
            pattern,
            format!(
                "{}: {what} cannot run inside a transaction",
                provider.display_name()
            ),
            ForbiddenInTransaction,
        )
    };

    match provider {
        Provider::Postgresql => vec![
            forbidden(r"create\s+(unique\s+)?index\s+concurrently", "CREATE INDEX CONCURRENTLY"),
            forbidden(r"drop\s+index\s+concurrently", "DROP INDEX CONCURRENTLY"),
            forbidden(r"\bvacuum\b", "VACUUM"),
            forbidden(r"reindex\s+(\w+\s+)?concurrently", "REINDEX CONCURRENTLY"),
            forbidden(
                r"refresh\s+materialized\s+view\s+concurrently",
                "REFRESH MATERIALIZED VIEW CONCURRENTLY",
            ),
            forbidden(r"\b(create|drop)\s+database\b", "CREATE/DROP DATABASE"),
            UnsafeSqlRule::new(
                r"\bupdate\s+\w+",
                "PostgreSQL: Large UPDATE may hold row locks for a long time",
                OperationalRisk,
            ),
            UnsafeSqlRule::new(
                r"\binsert\s+into\b",
                "PostgreSQL: Large INSERT may be long-running",
                OperationalRisk,
            ),
        ],
        Provider::Mssql => vec![
            forbidden(r"\bcreate\s+database\b", "CREATE DATABASE"),
            forbidden(r"\balter\s+database\b", "ALTER DATABASE"),
            forbidden(r"\bdrop\s+database\b", "DROP DATABASE"),
            forbidden(r"\bbackup\b", "BACKUP"),
            forbidden(r"\brestore\b", "RESTORE"),
            forbidden(r"\breconfigure\b", "RECONFIGURE"),
            forbidden(r"\bcreate\s+fulltext\s+catalog\b", "CREATE FULLTEXT CATALOG"),
        ],
        Provider::Mysql => {
            let implicit = |pattern: &str, what: &str| {
                UnsafeSqlRule::new(
                    pattern,
                    format!("MySQL: {what} causes implicit commit"),
                    ImplicitCommit,
                )
            };
            vec![
                implicit(r"\bcreate\s+database\b", "CREATE DATABASE"),
                implicit(r"\balter\s+database\b", "ALTER DATABASE"),
                implicit(r"\bdrop\s+database\b", "DROP DATABASE"),
                forbidden(r"\block\s+tables\b", "LOCK TABLES"),
                forbidden(r"\bunlock\s+tables\b", "UNLOCK TABLES"),
            ]
        }
        Provider::Oracle => vec![
            forbidden(r"\balter\s+system\b", "ALTER SYSTEM"),
            forbidden(r"\balter\s+database\b", "ALTER DATABASE"),
            forbidden(r"\bcreate\s+database\b", "CREATE DATABASE"),
            forbidden(r"\bshutdown\b", "SHUTDOWN"),
            forbidden(r"\bstartup\b", "STARTUP"),
        ],
    }
}

/// Operational risks shared by every provider.
fn common_rules(provider: Provider) -> Vec<UnsafeSqlRule> {
    let name = provider.display_name();
    let risk = |pattern: &str, what: &str| {
        UnsafeSqlRule::new(pattern, format!("{name}: {what}"), RiskLevel::OperationalRisk)
    };

    vec![
        risk(r"^\s*update\s", "UPDATE without WHERE rewrites every row").unless(r"\bwhere\b"),
        risk(r"^\s*delete\s", "DELETE without WHERE removes every row").unless(r"\bwhere\b"),
        risk(r"^\s*truncate\s", "TRUNCATE removes every row"),
        risk(r"\bdrop\s+table\b", "DROP TABLE destroys data"),
        risk(r"\bdrop\s+column\b", "DROP COLUMN destroys data"),
    ]
}

/// The rule table for a provider.
pub fn rules_for(provider: Provider) -> &'static [UnsafeSqlRule] {
    RULES.get(&provider).map(Vec::as_slice).unwrap_or_default()
}

/// Match every rule of `provider` against each statement of `sql`.
pub fn scan(sql: &str, provider: Provider) -> Vec<RuleMatch> {
    scan_statements(&split_statements(sql), provider)
}

/// Match every rule of `provider` against already split statements.
pub fn scan_statements(statements: &[String], provider: Provider) -> Vec<RuleMatch> {
    let rules = rules_for(provider);
    statements
        .iter()
        .flat_map(|statement| {
            let code = strip_comments(statement);
            rules
                .iter()
                .filter(|rule| rule.matches(&code))
                .map(|rule| RuleMatch {
                    reason: rule.reason.clone(),
                    risk: rule.risk,
                    statement: excerpt(&code),
                })
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Check a script that will run inside a transaction.
///
/// Fails on the first forbidden-in-transaction or implicit-commit match and
/// returns the operational-risk warnings otherwise.
pub fn assert_safe(version: &str, statements: &[String], provider: Provider) -> MigrateResult<Vec<RuleMatch>> {
    let matches = scan_statements(statements, provider);

    if let Some(fatal) = matches.iter().find(|m| m.risk.is_fatal_in_transaction()) {
        return Err(MigrationError::UnsafeSql {
            version: version.to_string(),
            reason: fatal.reason.clone(),
            statement: fatal.statement.clone(),
        });
    }

    log_warnings(version, &matches);
    Ok(matches)
}

/// Check a script that will run without a wrapping transaction.
///
/// Only operational risks are evaluated; they never block.
pub fn assert_safe_outside_transaction(
    version: &str,
    statements: &[String],
    provider: Provider,
) -> Vec<RuleMatch> {
    let matches: Vec<_> = scan_statements(statements, provider)
        .into_iter()
        .filter(|m| m.risk == RiskLevel::OperationalRisk)
        .collect();

    log_warnings(version, &matches);
    matches
}

fn log_warnings(version: &str, matches: &[RuleMatch]) {
    for m in matches {
        warn!(version = %version, statement = %m.statement, "{}", m.reason);
    }
}

fn excerpt(statement: &str) -> String {
    const MAX: usize = 120;
    let flat = statement.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= MAX {
        flat
    } else {
        let cut: String = flat.chars().take(MAX).collect();
        format!("{cut}...")
    }
}
