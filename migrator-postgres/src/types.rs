//! Conversions between engine values and PostgreSQL types.

use migrator_engine::{Param, ParamKind, Value};
use tokio_postgres::Row;
use tokio_postgres::types::{ToSql, Type};

use crate::error::{PgError, PgResult};

/// A boxed bindable parameter.
pub type PgParam = Box<dyn ToSql + Sync + Send>;

/// Convert a parameter to a typed PostgreSQL value. NULLs keep their type.
pub fn to_sql(param: &Param) -> PgResult<PgParam> {
    let boxed: PgParam = match (&param.value, param.kind) {
        (Value::Null, ParamKind::Text) => Box::new(Option::<String>::None),
        (Value::Null, ParamKind::Int) => Box::new(Option::<i64>::None),
        (Value::Null, ParamKind::Bool) => Box::new(Option::<bool>::None),
        (Value::Null, ParamKind::Binary) => Box::new(Option::<Vec<u8>>::None),
        (Value::Text(s), _) => Box::new(s.clone()),
        (Value::Int(n), _) => Box::new(*n),
        (Value::Bool(b), _) => Box::new(*b),
        (Value::Bytes(b), _) => Box::new(b.clone()),
    };
    Ok(boxed)
}

/// Convert parameters in binding order.
pub fn to_sql_params(params: &[&Param]) -> PgResult<Vec<PgParam>> {
    params.iter().map(|p| to_sql(p)).collect()
}

/// Read every column of a row.
pub fn row_values(row: &Row) -> PgResult<Vec<Value>> {
    (0..row.len())
        .map(|idx| column_value(row, idx))
        .collect()
}

fn column_value(row: &Row, idx: usize) -> PgResult<Value> {
    let ty = row.columns()[idx].type_();

    let value = if *ty == Type::BOOL {
        row.try_get::<_, Option<bool>>(idx)?.map(Value::Bool)
    } else if *ty == Type::INT2 {
        row.try_get::<_, Option<i16>>(idx)?.map(|n| Value::Int(n.into()))
    } else if *ty == Type::INT4 {
        row.try_get::<_, Option<i32>>(idx)?.map(|n| Value::Int(n.into()))
    } else if *ty == Type::INT8 {
        row.try_get::<_, Option<i64>>(idx)?.map(Value::Int)
    } else if *ty == Type::BYTEA {
        row.try_get::<_, Option<Vec<u8>>>(idx)?.map(Value::Bytes)
    } else if [Type::TEXT, Type::VARCHAR, Type::BPCHAR, Type::NAME].contains(ty) {
        row.try_get::<_, Option<String>>(idx)?.map(Value::Text)
    } else {
        return Err(PgError::type_conversion(format!(
            "unsupported column type {ty} in column {}",
            row.columns()[idx].name()
        )));
    };

    Ok(value.unwrap_or(Value::Null))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_keeps_declared_type() {
        let param = Param::binary("down_script", None);
        let boxed = to_sql(&param).unwrap();
        assert!(format!("{boxed:?}").contains("None"));
    }

    #[test]
    fn test_params_in_order() {
        let a = Param::text("version", "1_a");
        let b = Param::int("key", 7);
        let converted = to_sql_params(&[&a, &b]).unwrap();
        assert_eq!(converted.len(), 2);
        assert_eq!(format!("{:?}", converted[1]), "7");
    }
}
