//! Detection of pending migrations that touch the same table.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::migration::Migration;
use crate::tables::{extract_table_names, table_key};

/// A pending migration involved in a conflict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConflictEntry {
    /// Migration version.
    pub version: String,
    /// Migration name.
    pub name: String,
    /// File name.
    pub filename: String,
}

/// A table referenced by more than one pending migration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableConflict {
    /// Table name as first written.
    pub table: String,
    /// Migrations touching it, in version order.
    pub migrations: Vec<ConflictEntry>,
}

/// All conflicts among a set of pending migrations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConflictSet {
    /// Conflicting tables, ordered by name.
    pub conflicts: Vec<TableConflict>,
}

impl ConflictSet {
    /// Whether no conflicts were found.
    pub fn is_empty(&self) -> bool {
        self.conflicts.is_empty()
    }

    /// Number of conflicting tables.
    pub fn len(&self) -> usize {
        self.conflicts.len()
    }

    /// Whether the given table is part of a conflict.
    pub fn involves(&self, table: &str) -> bool {
        let key = table_key(table);
        self.conflicts.iter().any(|c| table_key(&c.table) == key)
    }
}

impl fmt::Display for ConflictSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "POTENTIAL CONFLICTS (multiple unapplied migrations touch the same table):"
        )?;
        for conflict in &self.conflicts {
            writeln!(f, "  Table: {}", conflict.table)?;
            for m in &conflict.migrations {
                writeln!(f, "    - {}  {}  ({})", m.version, m.name, m.filename)?;
            }
        }
        Ok(())
    }
}

/// Group pending migrations by the tables they reference and keep the
/// tables referenced by more than one of them.
pub fn detect_conflicts<'a>(pending: impl IntoIterator<Item = &'a Migration>) -> ConflictSet {
    let mut by_table: BTreeMap<String, (String, Vec<ConflictEntry>)> = BTreeMap::new();

    for migration in pending {
        let tables = extract_table_names(&migration.raw_sql);
        for (key, display) in tables.iter() {
            let entry = by_table
                .entry(key.to_string())
                .or_insert_with(|| (display.to_string(), Vec::new()));
            entry.1.push(ConflictEntry {
                version: migration.version.clone(),
                name: migration.name.clone(),
                filename: migration.filename.clone(),
            });
        }
    }

    let conflicts = by_table
        .into_values()
        .filter(|(_, migrations)| migrations.len() > 1)
        .map(|(table, migrations)| TableConflict { table, migrations })
        .collect();

    ConflictSet { conflicts }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn migration(file: &str, up: &str) -> Migration {
        Migration::parse(file, format!("-- Author: a\n-- UP\n{up}\n")).unwrap()
    }

    #[test]
    fn test_conflict_on_shared_table() {
        let a = migration(
            "20240101000000_aaaaaa_create_orders.sql",
            "CREATE TABLE IF NOT EXISTS public.orders (id INT);",
        );
        let b = migration(
            "20240102000000_bbbbbb_seed_orders.sql",
            "INSERT INTO PUBLIC.Orders VALUES (1);",
        );
        let c = migration(
            "20240103000000_cccccc_users.sql",
            "CREATE TABLE users (id INT);",
        );

        let conflicts = detect_conflicts([&a, &b, &c]);
        assert_eq!(conflicts.len(), 1);
        assert!(conflicts.involves("public.orders"));
        assert_eq!(conflicts.conflicts[0].table, "public.orders");
        assert_eq!(
            conflicts.conflicts[0]
                .migrations
                .iter()
                .map(|m| m.version.as_str())
                .collect::<Vec<_>>(),
            vec!["20240101000000_aaaaaa", "20240102000000_bbbbbb"]
        );
    }

    #[test]
    fn test_same_name_in_other_schema_does_not_conflict() {
        let a = migration("1_a_x.sql", "ALTER TABLE audit.orders ADD note TEXT;");
        let b = migration("2_b_y.sql", "ALTER TABLE public.orders ADD note TEXT;");
        assert!(detect_conflicts([&a, &b]).is_empty());
    }

    #[test]
    fn test_no_conflicts() {
        let a = migration("1_a_x.sql", "CREATE TABLE a (id INT);");
        let b = migration("2_b_y.sql", "ALTER TABLE b ADD c INT;");
        assert!(detect_conflicts([&a, &b]).is_empty());
    }

    #[test]
    fn test_same_migration_counts_once() {
        let a = migration("1_a_x.sql", "CREATE TABLE a (id INT); INSERT INTO a VALUES (1);");
        assert!(detect_conflicts([&a]).is_empty());
    }

    #[test]
    fn test_display() {
        let a = migration("1_a_x.sql", "UPDATE t SET c = 1 WHERE id = 1;");
        let b = migration("2_b_y.sql", "DELETE FROM t WHERE id = 2;");
        let text = detect_conflicts([&a, &b]).to_string();
        assert!(text.starts_with("POTENTIAL CONFLICTS"));
        assert!(text.contains("  Table: t\n"));
        assert!(text.contains("    - 1_a  x  (1_a_x.sql)\n"));
    }
}
