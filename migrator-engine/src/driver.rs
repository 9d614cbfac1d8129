//! Database driver abstraction.
//!
//! The engine talks to databases only through [`Driver`] and [`Session`].
//! Driver crates implement them for a concrete client library and register a
//! factory in a [`DriverRegistry`], which the caller builds once and hands to
//! the engine.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{MigrateResult, MigrationError};
use crate::provider::Provider;

/// A value read from or bound to a statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// SQL NULL.
    Null,
    /// Boolean / bit.
    Bool(bool),
    /// Any integer column.
    Int(i64),
    /// Character data.
    Text(String),
    /// Binary data.
    Bytes(Vec<u8>),
}

impl Value {
    /// Whether the value is NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

/// Declared type of a parameter, so NULLs can be bound with the right type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// Character data.
    Text,
    /// 64-bit integer.
    Int,
    /// Boolean.
    Bool,
    /// Binary blob.
    Binary,
}

/// A named statement parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    /// Name without the placeholder prefix.
    pub name: String,
    /// Bound value.
    pub value: Value,
    /// Declared type.
    pub kind: ParamKind,
}

impl Param {
    /// A text parameter.
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Value::Text(value.into()),
            kind: ParamKind::Text,
        }
    }

    /// A nullable text parameter.
    pub fn opt_text(name: impl Into<String>, value: Option<&str>) -> Self {
        Self {
            name: name.into(),
            value: value.map_or(Value::Null, |v| Value::Text(v.to_string())),
            kind: ParamKind::Text,
        }
    }

    /// An integer parameter.
    pub fn int(name: impl Into<String>, value: i64) -> Self {
        Self {
            name: name.into(),
            value: Value::Int(value),
            kind: ParamKind::Int,
        }
    }

    /// A boolean parameter.
    pub fn bool(name: impl Into<String>, value: bool) -> Self {
        Self {
            name: name.into(),
            value: Value::Bool(value),
            kind: ParamKind::Bool,
        }
    }

    /// A nullable binary parameter.
    pub fn binary(name: impl Into<String>, value: Option<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            value: value.map_or(Value::Null, Value::Bytes),
            kind: ParamKind::Binary,
        }
    }
}

/// Conversion from a driver [`Value`].
pub trait FromValue: Sized {
    /// Convert, failing on NULL or incompatible values.
    fn from_value(value: Value) -> MigrateResult<Self>;
}

fn mismatch(expected: &str, value: &Value) -> MigrationError {
    MigrationError::database(format!("expected {expected}, got {value:?}"))
}

impl FromValue for Value {
    fn from_value(value: Value) -> MigrateResult<Self> {
        Ok(value)
    }
}

impl FromValue for i64 {
    fn from_value(value: Value) -> MigrateResult<Self> {
        match value {
            Value::Int(n) => Ok(n),
            Value::Bool(b) => Ok(i64::from(b)),
            Value::Text(ref s) => s.trim().parse().map_err(|_| mismatch("integer", &value)),
            other => Err(mismatch("integer", &other)),
        }
    }
}

impl FromValue for bool {
    fn from_value(value: Value) -> MigrateResult<Self> {
        match value {
            Value::Bool(b) => Ok(b),
            Value::Int(n) => Ok(n != 0),
            Value::Text(ref s) => match s.trim().to_ascii_lowercase().as_str() {
                "1" | "t" | "true" | "y" | "yes" => Ok(true),
                "0" | "f" | "false" | "n" | "no" => Ok(false),
                _ => Err(mismatch("boolean", &value)),
            },
            other => Err(mismatch("boolean", &other)),
        }
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> MigrateResult<Self> {
        match value {
            Value::Text(s) => Ok(s),
            Value::Int(n) => Ok(n.to_string()),
            Value::Bool(b) => Ok(b.to_string()),
            Value::Bytes(bytes) => {
                String::from_utf8(bytes).map_err(|e| MigrationError::database(e.to_string()))
            }
            Value::Null => Err(mismatch("text", &Value::Null)),
        }
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: Value) -> MigrateResult<Self> {
        match value {
            Value::Bytes(bytes) => Ok(bytes),
            Value::Text(s) => Ok(s.into_bytes()),
            other => Err(mismatch("binary", &other)),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> MigrateResult<Self> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

/// One database connection.
///
/// A session stays on the same physical connection for its whole lifetime,
/// so transactions and session-scoped locks behave as expected.
#[async_trait::async_trait]
pub trait Session: Send {
    /// Open a transaction.
    async fn begin(&mut self) -> MigrateResult<()>;

    /// Commit the open transaction.
    async fn commit(&mut self) -> MigrateResult<()>;

    /// Roll back the open transaction.
    async fn rollback(&mut self) -> MigrateResult<()>;

    /// Execute a statement and return the number of affected rows.
    ///
    /// With no parameters the statement is sent as-is, so batches and
    /// procedural blocks work.
    async fn execute(&mut self, sql: &str, params: &[Param]) -> MigrateResult<u64>;

    /// Run a query and return all rows.
    async fn query(&mut self, sql: &str, params: &[Param]) -> MigrateResult<Vec<Vec<Value>>>;
}

/// A connection source for one provider.
#[async_trait::async_trait]
pub trait Driver: Send + Sync {
    /// Provider served by this driver.
    fn provider(&self) -> Provider;

    /// Open a session.
    async fn connect(&self) -> MigrateResult<Box<dyn Session>>;
}

/// Builds a driver from a connection string.
pub type DriverFactory = Arc<dyn Fn(&str) -> MigrateResult<Arc<dyn Driver>> + Send + Sync>;

/// Provider to driver-factory mapping.
#[derive(Clone, Default)]
pub struct DriverRegistry {
    factories: HashMap<Provider, DriverFactory>,
}

impl DriverRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the factory for a provider.
    pub fn register<F>(&mut self, provider: Provider, factory: F) -> &mut Self
    where
        F: Fn(&str) -> MigrateResult<Arc<dyn Driver>> + Send + Sync + 'static,
    {
        self.factories.insert(provider, Arc::new(factory));
        self
    }

    /// Whether a factory is registered for the provider.
    pub fn supports(&self, provider: Provider) -> bool {
        self.factories.contains_key(&provider)
    }

    /// Registered providers, sorted.
    pub fn providers(&self) -> Vec<Provider> {
        let mut providers: Vec<_> = self.factories.keys().copied().collect();
        providers.sort();
        providers
    }

    /// Build a driver for the provider.
    pub fn create(&self, provider: Provider, connection: &str) -> MigrateResult<Arc<dyn Driver>> {
        let factory = self.factories.get(&provider).ok_or_else(|| {
            MigrationError::configuration(format!("no driver registered for provider '{provider}'"))
        })?;
        factory(connection)
    }
}

impl fmt::Debug for DriverRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriverRegistry")
            .field("providers", &self.providers())
            .finish()
    }
}

/// Native positional placeholder syntax of a client library.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderStyle {
    /// `$1`, `$2`, ... (tokio-postgres). Repeated names reuse their index.
    Dollar,
    /// `?` (mysql_async). Repeated names are bound again.
    Question,
    /// `@P1`, `@P2`, ... (tiberius). Repeated names reuse their index.
    AtP,
}

/// Rewrite named placeholders (`@name` / `:name`) to positional ones.
///
/// Only names present in `params` are rewritten; string literals, quoted
/// identifiers and comments are left untouched. Returns the rewritten SQL and
/// the parameters in binding order.
pub fn bind_named<'p>(
    sql: &str,
    prefix: char,
    params: &'p [Param],
    style: PlaceholderStyle,
) -> (String, Vec<&'p Param>) {
    let mut out = String::with_capacity(sql.len());
    let mut order: Vec<&Param> = Vec::new();
    let chars: Vec<char> = sql.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c == '\'' || c == '"' {
            let start = i;
            i += 1;
            while i < chars.len() && chars[i] != c {
                i += 1;
            }
            i = (i + 1).min(chars.len());
            out.extend(&chars[start..i]);
            continue;
        }

        if c == '-' && chars.get(i + 1) == Some(&'-') {
            let start = i;
            while i < chars.len() && chars[i] != '\n' {
                i += 1;
            }
            out.extend(&chars[start..i]);
            continue;
        }

        let boundary = i == 0 || (!is_ident_char(chars[i - 1]) && chars[i - 1] != prefix);
        if c == prefix && boundary {
            let start = i + 1;
            let mut end = start;
            while end < chars.len() && is_ident_char(chars[end]) {
                end += 1;
            }
            let name: String = chars[start..end].iter().collect();

            if let Some(param) = params.iter().find(|p| p.name == name) {
                let position = match style {
                    PlaceholderStyle::Question => None,
                    _ => order.iter().position(|p| p.name == name),
                };
                let index = match position {
                    Some(index) => index + 1,
                    None => {
                        order.push(param);
                        order.len()
                    }
                };
                match style {
                    PlaceholderStyle::Dollar => out.push_str(&format!("${index}")),
                    PlaceholderStyle::Question => out.push('?'),
                    PlaceholderStyle::AtP => out.push_str(&format!("@P{index}")),
                }
                i = end;
                continue;
            }
        }

        out.push(c);
        i += 1;
    }

    (out, order)
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}
