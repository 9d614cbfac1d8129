//! Conversions between engine values and MySQL values.

use migrator_engine::{Param, Value};
use mysql_async::{Params, Row};

/// Character set id MySQL reports for binary columns.
const BINARY_CHARSET: u16 = 63;

/// Convert a parameter to a MySQL value.
pub fn to_mysql(param: &Param) -> mysql_async::Value {
    match &param.value {
        Value::Null => mysql_async::Value::NULL,
        Value::Bool(b) => mysql_async::Value::Int(i64::from(*b)),
        Value::Int(n) => mysql_async::Value::Int(*n),
        Value::Text(s) => mysql_async::Value::Bytes(s.clone().into_bytes()),
        Value::Bytes(b) => mysql_async::Value::Bytes(b.clone()),
    }
}

/// Positional parameters in binding order.
pub fn to_params(params: &[&Param]) -> Params {
    if params.is_empty() {
        Params::Empty
    } else {
        Params::Positional(params.iter().map(|p| to_mysql(p)).collect())
    }
}

/// Read every column of a row.
pub fn row_values(mut row: Row) -> Vec<Value> {
    let binary: Vec<bool> = row
        .columns_ref()
        .iter()
        .map(|c| c.character_set() == BINARY_CHARSET)
        .collect();

    binary
        .into_iter()
        .enumerate()
        .map(|(idx, is_binary)| {
            let value = row.take::<mysql_async::Value, _>(idx).unwrap_or(mysql_async::Value::NULL);
            from_mysql(value, is_binary)
        })
        .collect()
}

/// Convert a MySQL value. Text-protocol results arrive as bytes; only columns
/// with the binary character set stay binary.
pub fn from_mysql(value: mysql_async::Value, is_binary: bool) -> Value {
    match value {
        mysql_async::Value::NULL => Value::Null,
        mysql_async::Value::Int(n) => Value::Int(n),
        mysql_async::Value::UInt(n) => match i64::try_from(n) {
            Ok(n) => Value::Int(n),
            Err(_) => Value::Text(n.to_string()),
        },
        mysql_async::Value::Bytes(bytes) if is_binary => Value::Bytes(bytes),
        mysql_async::Value::Bytes(bytes) => match String::from_utf8(bytes) {
            Ok(text) => Value::Text(text),
            Err(e) => Value::Bytes(e.into_bytes()),
        },
        other => Value::Text(other.as_sql(true).trim_matches('\'').to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_params() {
        let a = Param::text("name", "migrator_lock");
        let b = Param::int("timeout", 30);
        let c = Param::bool("use_transaction", true);
        let d = Param::binary("down_script", None);

        match to_params(&[&a, &b, &c, &d]) {
            Params::Positional(values) => assert_eq!(
                values,
                vec![
                    mysql_async::Value::Bytes(b"migrator_lock".to_vec()),
                    mysql_async::Value::Int(30),
                    mysql_async::Value::Int(1),
                    mysql_async::Value::NULL,
                ]
            ),
            other => panic!("unexpected params {other:?}"),
        }
        assert_eq!(to_params(&[]), Params::Empty);
    }

    #[test]
    fn test_from_mysql() {
        assert_eq!(
            from_mysql(mysql_async::Value::Bytes(b"3".to_vec()), false),
            Value::Text("3".into())
        );
        assert_eq!(
            from_mysql(mysql_async::Value::Bytes(vec![0x28, 0xb5]), true),
            Value::Bytes(vec![0x28, 0xb5])
        );
        assert_eq!(from_mysql(mysql_async::Value::UInt(1), false), Value::Int(1));
        assert_eq!(from_mysql(mysql_async::Value::NULL, false), Value::Null);
    }
}
