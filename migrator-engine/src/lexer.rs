//! A small SQL lexer.
//!
//! Produces just enough structure for table extraction: words, quoted
//! identifiers, string literals and punctuation. Comments and whitespace are
//! skipped.

/// A lexical token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Bare identifier, keyword or number.
    Word(String),
    /// `"x"`, `[x]` or `` `x` `` with the delimiters removed.
    QuotedIdent(String),
    /// `'x'` with the delimiters removed and `''` unescaped.
    Str(String),
    /// Any other single character.
    Punct(char),
}

impl Token {
    /// Whether this is a bare word equal to `keyword` (ASCII case-insensitive).
    pub fn is_keyword(&self, keyword: &str) -> bool {
        matches!(self, Token::Word(w) if w.eq_ignore_ascii_case(keyword))
    }

    /// Whether this is the given punctuation character.
    pub fn is_punct(&self, c: char) -> bool {
        matches!(self, Token::Punct(p) if *p == c)
    }

    /// Identifier text, for words and quoted identifiers.
    pub fn ident(&self) -> Option<&str> {
        match self {
            Token::Word(w) | Token::QuotedIdent(w) => Some(w),
            _ => None,
        }
    }
}

/// Tokenize a SQL script.
pub fn tokenize(sql: &str) -> Vec<Token> {
    let chars: Vec<char> = sql.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();

        if c.is_whitespace() {
            i += 1;
        } else if c == '-' && next == Some('-') {
            while i < chars.len() && chars[i] != '\n' {
                i += 1;
            }
        } else if c == '/' && next == Some('*') {
            i += 2;
            while i < chars.len() && !(chars[i] == '*' && chars.get(i + 1) == Some(&'/')) {
                i += 1;
            }
            i += 2;
        } else if c == '\'' {
            let (text, end) = read_delimited(&chars, i + 1, '\'');
            tokens.push(Token::Str(text));
            i = end;
        } else if c == '"' || c == '`' {
            let (text, end) = read_delimited(&chars, i + 1, c);
            tokens.push(Token::QuotedIdent(text));
            i = end;
        } else if c == '[' {
            let (text, end) = read_delimited(&chars, i + 1, ']');
            tokens.push(Token::QuotedIdent(text));
            i = end;
        } else if is_word_char(c) {
            let start = i;
            while i < chars.len() && is_word_char(chars[i]) {
                i += 1;
            }
            tokens.push(Token::Word(chars[start..i].iter().collect()));
        } else {
            tokens.push(Token::Punct(c));
            i += 1;
        }
    }

    tokens
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$' || c == '#' || c == '@'
}

/// Read up to the closing delimiter; a doubled delimiter is an escape.
/// Returns the text and the index just past the closing delimiter.
fn read_delimited(chars: &[char], mut i: usize, close: char) -> (String, usize) {
    let mut text = String::new();
    while i < chars.len() {
        if chars[i] == close {
            if chars.get(i + 1) == Some(&close) {
                text.push(close);
                i += 2;
                continue;
            }
            return (text, i + 1);
        }
        text.push(chars[i]);
        i += 1;
    }
    (text, i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn word(s: &str) -> Token {
        Token::Word(s.to_string())
    }

    #[test]
    fn test_tokenize_basic() {
        assert_eq!(
            tokenize("SELECT a.b FROM t;"),
            vec![
                word("SELECT"),
                word("a"),
                Token::Punct('.'),
                word("b"),
                word("FROM"),
                word("t"),
                Token::Punct(';'),
            ]
        );
    }

    #[test]
    fn test_quoted_identifiers() {
        assert_eq!(
            tokenize(r#""Orders" [dbo] `my table`"#),
            vec![
                Token::QuotedIdent("Orders".into()),
                Token::QuotedIdent("dbo".into()),
                Token::QuotedIdent("my table".into()),
            ]
        );
    }

    #[test]
    fn test_string_literal_escape() {
        assert_eq!(tokenize("'it''s'"), vec![Token::Str("it's".into())]);
    }

    #[test]
    fn test_comments_are_skipped() {
        assert_eq!(
            tokenize("-- FROM hidden\n/* JOIN other */ x"),
            vec![word("x")]
        );
    }

    #[test]
    fn test_unterminated_input() {
        assert_eq!(tokenize("'open"), vec![Token::Str("open".into())]);
        assert_eq!(tokenize("/* open"), Vec::<Token>::new());
    }

    #[test]
    fn test_keyword_helpers() {
        assert!(word("from").is_keyword("FROM"));
        assert!(!Token::QuotedIdent("from".into()).is_keyword("FROM"));
        assert_eq!(Token::QuotedIdent("x".into()).ident(), Some("x"));
        assert_eq!(Token::Str("x".into()).ident(), None);
    }
}
