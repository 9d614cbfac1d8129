//! Statement splitting.
//!
//! Scripts are split on `;` outside of string literals, quoted identifiers,
//! comments and PostgreSQL dollar-quoted bodies. Comments stay attached to the
//! statement that follows them; segments holding nothing but comments are
//! dropped.

/// Scanner state while walking a script.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ScanState {
    Normal,
    InSingleQuote,
    InDoubleQuote,
    InLineComment,
    InBlockComment,
    /// Inside `$tag$ ... $tag$`; holds the full delimiter.
    InDollarQuote(String),
}

/// Split a script into individual statements without their terminators.
pub fn split_statements(sql: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut has_code = false;
    let mut state = ScanState::Normal;
    let mut chars = sql.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        let next = chars.peek().map(|&(_, n)| n);

        match &state {
            ScanState::Normal => match c {
                ';' => {
                    flush(&mut statements, &mut current, &mut has_code);
                    continue;
                }
                '\'' => {
                    state = ScanState::InSingleQuote;
                    has_code = true;
                }
                '"' => {
                    state = ScanState::InDoubleQuote;
                    has_code = true;
                }
                '-' if next == Some('-') => {
                    state = ScanState::InLineComment;
                    current.push_str("--");
                    chars.next();
                    continue;
                }
                '/' if next == Some('*') => {
                    state = ScanState::InBlockComment;
                    current.push_str("/*");
                    chars.next();
                    continue;
                }
                '$' => {
                    has_code = true;
                    if let Some(tag) = dollar_tag(&sql[i..]) {
                        current.push_str(&tag);
                        for _ in 1..tag.len() {
                            chars.next();
                        }
                        state = ScanState::InDollarQuote(tag);
                        continue;
                    }
                }
                c if !c.is_whitespace() => has_code = true,
                _ => {}
            },
            ScanState::InSingleQuote => {
                if c == '\'' {
                    state = ScanState::Normal;
                }
            }
            ScanState::InDoubleQuote => {
                if c == '"' {
                    state = ScanState::Normal;
                }
            }
            ScanState::InLineComment => {
                if c == '\n' {
                    state = ScanState::Normal;
                }
            }
            ScanState::InBlockComment => {
                if c == '*' && next == Some('/') {
                    current.push_str("*/");
                    chars.next();
                    state = ScanState::Normal;
                    continue;
                }
            }
            ScanState::InDollarQuote(tag) => {
                if c == '$' && sql[i..].starts_with(tag.as_str()) {
                    let len = tag.len();
                    current.push_str(&sql[i..i + len]);
                    for _ in 1..len {
                        chars.next();
                    }
                    state = ScanState::Normal;
                    continue;
                }
            }
        }

        current.push(c);
    }

    flush(&mut statements, &mut current, &mut has_code);
    statements
}

/// Remove `--` and `/* */` comments, leaving literals and quoted bodies intact.
pub fn strip_comments(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len());
    let mut state = ScanState::Normal;
    let mut chars = sql.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        let next = chars.peek().map(|&(_, n)| n);

        match &state {
            ScanState::Normal => match c {
                '\'' => state = ScanState::InSingleQuote,
                '"' => state = ScanState::InDoubleQuote,
                '-' if next == Some('-') => {
                    state = ScanState::InLineComment;
                    continue;
                }
                '/' if next == Some('*') => {
                    chars.next();
                    state = ScanState::InBlockComment;
                    continue;
                }
                '$' => {
                    if let Some(tag) = dollar_tag(&sql[i..]) {
                        out.push_str(&tag);
                        for _ in 1..tag.len() {
                            chars.next();
                        }
                        state = ScanState::InDollarQuote(tag);
                        continue;
                    }
                }
                _ => {}
            },
            ScanState::InSingleQuote if c == '\'' => state = ScanState::Normal,
            ScanState::InDoubleQuote if c == '"' => state = ScanState::Normal,
            ScanState::InLineComment => {
                if c == '\n' {
                    state = ScanState::Normal;
                    out.push('\n');
                }
                continue;
            }
            ScanState::InBlockComment => {
                if c == '*' && next == Some('/') {
                    chars.next();
                    state = ScanState::Normal;
                    out.push(' ');
                }
                continue;
            }
            ScanState::InDollarQuote(tag) if c == '$' && sql[i..].starts_with(tag.as_str()) => {
                let len = tag.len();
                out.push_str(&sql[i..i + len]);
                for _ in 1..len {
                    chars.next();
                }
                state = ScanState::Normal;
                continue;
            }
            _ => {}
        }

        out.push(c);
    }

    out
}

fn flush(statements: &mut Vec<String>, current: &mut String, has_code: &mut bool) {
    let trimmed = current.trim();
    if *has_code && !trimmed.is_empty() {
        statements.push(trimmed.to_string());
    }
    current.clear();
    *has_code = false;
}

/// Returns the `$tag$` delimiter starting at `s`, if any.
fn dollar_tag(s: &str) -> Option<String> {
    let rest = s.strip_prefix('$')?;
    let end = rest.find('$')?;
    let tag = &rest[..end];

    let valid = tag
        .chars()
        .next()
        .is_none_or(|c| c.is_ascii_alphabetic() || c == '_')
        && tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');

    valid.then(|| format!("${tag}$"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_simple_split() {
        assert_eq!(
            split_statements("CREATE TABLE a (id INT);\nCREATE TABLE b (id INT);"),
            vec!["CREATE TABLE a (id INT)", "CREATE TABLE b (id INT)"]
        );
    }

    #[test]
    fn test_semicolons_inside_literals_and_comments() {
        let statements = split_statements("\"a;b\" ; 'c;d'; -- e;f\nreal;");
        assert_eq!(statements, vec!["\"a;b\"", "'c;d'", "-- e;f\nreal"]);
    }

    #[test]
    fn test_block_comment() {
        let statements = split_statements("/* x; y */ SELECT 1; SELECT 2");
        assert_eq!(statements, vec!["/* x; y */ SELECT 1", "SELECT 2"]);
    }

    #[test]
    fn test_comment_only_segments_are_dropped() {
        let statements = split_statements("SELECT 1;\n-- trailing note\n");
        assert_eq!(statements, vec!["SELECT 1"]);
        assert!(split_statements(" ;; /* nothing */ ;").is_empty());
    }

    #[test]
    fn test_escaped_quote() {
        let statements = split_statements("INSERT INTO t VALUES ('it''s; fine'); SELECT 1");
        assert_eq!(
            statements,
            vec!["INSERT INTO t VALUES ('it''s; fine')", "SELECT 1"]
        );
    }

    #[test]
    fn test_dollar_quoted_body() {
        let sql = "CREATE FUNCTION f() RETURNS int AS $$ BEGIN RETURN 1; END; $$ LANGUAGE plpgsql;\n\
                   CREATE FUNCTION g() RETURNS int AS $body$ SELECT 2; $body$ LANGUAGE sql;";
        let statements = split_statements(sql);
        assert_eq!(statements.len(), 2);
        assert!(statements[0].ends_with("$$ LANGUAGE plpgsql"));
        assert!(statements[1].contains("$body$ SELECT 2; $body$"));
    }

    #[test]
    fn test_strip_comments() {
        assert_eq!(
            strip_comments("-- VACUUM;\nSELECT '--x' /* y */ FROM t"),
            "\nSELECT '--x'   FROM t"
        );
    }

    #[test]
    fn test_positional_parameter_is_not_a_dollar_quote() {
        let statements = split_statements("SELECT $1; SELECT 2");
        assert_eq!(statements, vec!["SELECT $1", "SELECT 2"]);
    }
}
