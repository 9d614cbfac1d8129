//! Scaffolding for new migration files.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::error::{MigrateResult, MigrationError};

/// A new migration file about to be written.
#[derive(Debug, Clone)]
pub struct MigrationTemplate {
    /// Human description, slugged into the file name.
    pub description: String,
    /// Author header.
    pub author: Option<String>,
    /// Branch header.
    pub branch: Option<String>,
    /// Value of the `Transaction` header.
    pub use_transaction: bool,
    /// Creation time, the timestamp segment.
    pub created_at: DateTime<Utc>,
    /// Random id segment, six hex digits.
    pub id: String,
}

impl MigrationTemplate {
    /// A transactional template stamped with the current time and a random id.
    pub fn new(description: impl Into<String>) -> Self {
        let id = uuid::Uuid::new_v4().simple().to_string()[..6].to_string();
        Self {
            description: description.into(),
            author: None,
            branch: None,
            use_transaction: true,
            created_at: Utc::now(),
            id,
        }
    }

    /// Set the author.
    pub fn author(mut self, author: Option<String>) -> Self {
        self.author = author;
        self
    }

    /// Set the branch.
    pub fn branch(mut self, branch: Option<String>) -> Self {
        self.branch = branch;
        self
    }

    /// Set the transaction flag.
    pub fn use_transaction(mut self, use_transaction: bool) -> Self {
        self.use_transaction = use_transaction;
        self
    }

    /// `yyyyMMddHHmmss`.
    pub fn timestamp(&self) -> String {
        self.created_at.format("%Y%m%d%H%M%S").to_string()
    }

    /// `timestamp_id`.
    pub fn version(&self) -> String {
        format!("{}_{}", self.timestamp(), self.id)
    }

    /// `timestamp_id_slug.sql`.
    pub fn filename(&self) -> MigrateResult<String> {
        let slug = slugify(&self.description);
        if slug.is_empty() {
            return Err(MigrationError::configuration(format!(
                "migration description '{}' has no usable characters",
                self.description
            )));
        }
        Ok(format!("{}_{slug}.sql", self.version()))
    }

    /// File contents.
    pub fn render(&self) -> String {
        format!(
            "-- Migration: {}\n\
             -- Version: {}\n\
             -- Author: {}\n\
             -- Branch: {}\n\
             -- Transaction: {}\n\
             \n\
             -- UP\n\
             -- Write the forward change here.\n\
             \n\
             -- DOWN\n\
             -- Write the statements that revert it here.\n",
            self.description,
            self.version(),
            self.author.as_deref().unwrap_or(""),
            self.branch.as_deref().unwrap_or(""),
            if self.use_transaction { "on" } else { "off" },
        )
    }

    /// Write the file into `dir`, creating the directory if needed.
    pub async fn write_to(&self, dir: &Path) -> MigrateResult<PathBuf> {
        let path = dir.join(self.filename()?);
        tokio::fs::create_dir_all(dir).await?;
        if tokio::fs::try_exists(&path).await? {
            return Err(MigrationError::configuration(format!(
                "'{}' already exists",
                path.display()
            )));
        }
        tokio::fs::write(&path, self.render()).await?;
        Ok(path)
    }
}

/// Lowercase, replace anything outside `[a-z0-9_-]` with `-`, trim `-`.
pub fn slugify(description: &str) -> String {
    description
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-' {
                c
            } else {
                '-'
            }
        })
        .collect::<String>()
        .trim_matches('-')
        .to_string()
}
