//! Heuristic extraction of the tables a script touches.
//!
//! This is not a SQL parser. It recognizes the common places a table name
//! appears in DDL and DML and is used only to warn about pending migrations
//! that touch the same table.

use std::collections::BTreeMap;

use crate::lexer::{Token, tokenize};

/// Words skipped between a table-introducing keyword and the table name.
const NOISE: &[&str] = &["ONLY", "IF", "NOT", "EXISTS", "INTO"];

/// Words that end a table reference instead of naming one.
const NOT_A_TABLE: &[&str] = &[
    "SELECT",
    "WITH",
    "VALUES",
    "SET",
    "WHERE",
    "LATERAL",
    "UNNEST",
    "DEFAULT",
    // `ON UPDATE CASCADE` and friends in foreign key clauses.
    "CASCADE",
    "RESTRICT",
    "NO",
    "CURRENT_TIMESTAMP",
];

/// Modifiers allowed between `CREATE` / `ALTER` / `DROP` and the object kind.
const OBJECT_MODIFIERS: &[&str] = &[
    "OR",
    "REPLACE",
    "GLOBAL",
    "LOCAL",
    "TEMP",
    "TEMPORARY",
    "UNLOGGED",
    "UNIQUE",
    "CLUSTERED",
    "NONCLUSTERED",
    "FULLTEXT",
    "SPATIAL",
    "BITMAP",
];

/// A case-insensitive set of table names.
///
/// Tables are keyed by their full dotted path, lowercased, so `Orders` and
/// `ORDERS` are the same entry while `audit.orders` and `public.orders` are
/// not. The first spelling seen is kept for display.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableSet {
    tables: BTreeMap<String, String>,
}

impl TableSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a (possibly schema-qualified) table name.
    pub fn insert(&mut self, name: impl Into<String>) {
        let name = name.into();
        let key = table_key(&name);
        if !key.is_empty() {
            self.tables.entry(key).or_insert(name);
        }
    }

    /// Whether the set contains the table, ignoring case.
    pub fn contains(&self, name: &str) -> bool {
        self.tables.contains_key(&table_key(name))
    }

    /// Number of distinct tables.
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Iterate `(key, display name)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.tables.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Display names in key order.
    pub fn names(&self) -> Vec<&str> {
        self.tables.values().map(String::as_str).collect()
    }
}

/// Normalized key of a table name: the dotted path, lowercased.
pub fn table_key(name: &str) -> String {
    name.to_lowercase()
}

/// Extract the set of tables referenced by a script.
pub fn extract_table_names(sql: &str) -> TableSet {
    let tokens = tokenize(sql);
    let mut tables = TableSet::new();
    let mut awaiting_index_on = false;
    let mut i = 0;

    while i < tokens.len() {
        let Token::Word(word) = &tokens[i] else {
            if tokens[i].is_punct(';') {
                awaiting_index_on = false;
            }
            i += 1;
            continue;
        };

        match word.to_ascii_uppercase().as_str() {
            "FROM" | "JOIN" | "INTO" | "UPDATE" | "MERGE" => {
                i = read_table(&tokens, i + 1, &mut tables);
                continue;
            }
            "TRUNCATE" => {
                let mut j = i + 1;
                if tokens.get(j).is_some_and(|t| t.is_keyword("TABLE")) {
                    j += 1;
                }
                i = read_table(&tokens, j, &mut tables);
                continue;
            }
            "CREATE" | "ALTER" | "DROP" => {
                let mut j = i + 1;
                while tokens
                    .get(j)
                    .is_some_and(|t| OBJECT_MODIFIERS.iter().any(|m| t.is_keyword(m)))
                {
                    j += 1;
                }
                match tokens.get(j) {
                    Some(t) if t.is_keyword("TABLE") => {
                        i = read_table(&tokens, j + 1, &mut tables);
                        continue;
                    }
                    Some(t) if t.is_keyword("INDEX") => awaiting_index_on = true,
                    _ => {}
                }
            }
            "ON" if awaiting_index_on => {
                awaiting_index_on = false;
                i = read_table(&tokens, i + 1, &mut tables);
                continue;
            }
            _ => {}
        }

        i += 1;
    }

    tables
}

/// Read a compound identifier starting at `i`, skipping noise words.
/// Returns the index after the last token consumed.
fn read_table(tokens: &[Token], mut i: usize, tables: &mut TableSet) -> usize {
    while tokens
        .get(i)
        .is_some_and(|t| t.is_punct('(') || NOISE.iter().any(|n| t.is_keyword(n)))
    {
        i += 1;
    }

    let mut parts: Vec<&str> = Vec::new();
    while let Some(token) = tokens.get(i) {
        let Some(ident) = token.ident() else { break };
        if parts.is_empty() && NOT_A_TABLE.iter().any(|k| token.is_keyword(k)) {
            break;
        }
        parts.push(ident);
        i += 1;

        if tokens.get(i).is_some_and(|t| t.is_punct('.')) {
            i += 1;
        } else {
            break;
        }
    }

    if !parts.is_empty() {
        tables.insert(parts.join("."));
    }
    i
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_create_table_if_not_exists() {
        let tables = extract_table_names("CREATE TABLE IF NOT EXISTS public.orders (id INT);");
        assert_eq!(tables.names(), vec!["public.orders"]);
        assert!(tables.contains("PUBLIC.Orders"));
        assert!(!tables.contains("orders"));
    }

    #[test]
    fn test_schemas_are_distinct_tables() {
        let tables = extract_table_names(
            "INSERT INTO audit.orders SELECT * FROM public.orders; UPDATE Audit.Orders SET n = 1;",
        );
        assert_eq!(tables.len(), 2);
        assert_eq!(tables.names(), vec!["audit.orders", "public.orders"]);
    }

    #[test]
    fn test_insert_quoted() {
        let tables = extract_table_names(r#"INSERT INTO "Orders" VALUES (1);"#);
        assert_eq!(tables.names(), vec!["Orders"]);
        assert!(tables.contains("orders"));
    }

    #[test]
    fn test_dml_keywords() {
        let tables = extract_table_names(
            "UPDATE accounts SET x = 1 FROM ledger l JOIN [dbo].[Users] u ON u.id = l.uid;\n\
             DELETE FROM sessions WHERE expired;\n\
             MERGE INTO stock USING incoming ON 1 = 1;",
        );
        for table in ["accounts", "ledger", "dbo.users", "sessions", "stock"] {
            assert!(tables.contains(table), "missing {table}");
        }
        assert!(!tables.contains("u"));
    }

    #[test]
    fn test_alter_drop_truncate() {
        let tables = extract_table_names(
            "ALTER TABLE ONLY a ADD COLUMN c INT; DROP TABLE IF EXISTS b; TRUNCATE TABLE c; TRUNCATE d;",
        );
        assert_eq!(tables.len(), 4);
    }

    #[test]
    fn test_create_index_on() {
        let tables = extract_table_names(
            "CREATE UNIQUE INDEX CONCURRENTLY idx_orders_ref ON orders (reference);",
        );
        assert_eq!(tables.names(), vec!["orders"]);
    }

    #[test]
    fn test_on_without_index_is_ignored() {
        let tables = extract_table_names("SELECT * FROM a JOIN b ON a.id = b.id;");
        assert_eq!(tables.len(), 2);
        assert!(!tables.contains("id"));
    }

    #[test]
    fn test_foreign_key_actions() {
        let tables = extract_table_names(
            "CREATE TABLE items (order_id INT REFERENCES orders (id) ON UPDATE CASCADE);",
        );
        assert_eq!(tables.names(), vec!["items"]);
    }

    #[test]
    fn test_subquery_is_not_a_table() {
        let tables = extract_table_names("SELECT * FROM (SELECT 1) AS s;");
        assert!(tables.is_empty());
    }

    #[test]
    fn test_duplicates_collapse() {
        let tables = extract_table_names(
            "CREATE TABLE orders (id INT); INSERT INTO Orders VALUES (1); UPDATE ORDERS SET id = 2;",
        );
        assert_eq!(tables.len(), 1);
        assert_eq!(tables.names(), vec!["orders"]);
    }

    #[test]
    fn test_comments_and_literals_do_not_leak() {
        let tables = extract_table_names(
            "-- DROP TABLE secret\nINSERT INTO log (msg) VALUES ('FROM nowhere');",
        );
        assert_eq!(tables.names(), vec!["log"]);
    }
}
