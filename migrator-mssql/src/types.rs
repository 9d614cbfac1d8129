//! Conversions between engine values and SQL Server types.

use migrator_engine::{Param, ParamKind, Value};
use tiberius::{ColumnData, Row, ToSql};

/// Convert a parameter to a SQL Server parameter. NULLs keep their type.
pub fn to_sql(param: &Param) -> Box<dyn ToSql> {
    match (&param.value, param.kind) {
        (Value::Null, ParamKind::Text) => Box::new(Option::<String>::None),
        (Value::Null, ParamKind::Int) => Box::new(Option::<i64>::None),
        (Value::Null, ParamKind::Bool) => Box::new(Option::<bool>::None),
        (Value::Null, ParamKind::Binary) => Box::new(Option::<Vec<u8>>::None),
        (Value::Text(s), _) => Box::new(s.clone()),
        (Value::Int(n), _) => Box::new(*n),
        (Value::Bool(b), _) => Box::new(*b),
        (Value::Bytes(b), _) => Box::new(b.clone()),
    }
}

/// Convert parameters in binding order.
pub fn to_sql_params(params: &[&Param]) -> Vec<Box<dyn ToSql>> {
    params.iter().map(|p| to_sql(p)).collect()
}

/// Read every column of a row.
pub fn row_values(row: Row) -> Vec<Value> {
    row.into_iter().map(from_column).collect()
}

/// Convert one cell.
pub fn from_column(data: ColumnData<'static>) -> Value {
    match data {
        ColumnData::Bit(v) => v.map_or(Value::Null, Value::Bool),
        ColumnData::U8(v) => v.map_or(Value::Null, |n| Value::Int(n.into())),
        ColumnData::I16(v) => v.map_or(Value::Null, |n| Value::Int(n.into())),
        ColumnData::I32(v) => v.map_or(Value::Null, |n| Value::Int(n.into())),
        ColumnData::I64(v) => v.map_or(Value::Null, Value::Int),
        ColumnData::String(v) => v.map_or(Value::Null, |s| Value::Text(s.into_owned())),
        ColumnData::Binary(v) => v.map_or(Value::Null, |b| Value::Bytes(b.into_owned())),
        other => Value::Text(format!("{other:?}")),
    }
}
