use rusqlite::types::Value;

use crate::connection::quote;
use crate::params::ParamValue;
use crate::types::RowValues;

/// Convert a single `RowValues` to a rusqlite `Value`.
///
/// Booleans are stored as 0/1 and timestamps as ISO-8601 text, which is how
/// `SQLite`'s date functions read them back.
#[must_use]
pub fn row_value_to_sqlite_value(value: &RowValues) -> Value {
    match value {
        RowValues::Int(i) => Value::Integer(*i),
        RowValues::Float(f) => Value::Real(*f),
        RowValues::Text(s) => Value::Text(s.clone()),
        RowValues::Bool(b) => Value::Integer(i64::from(*b)),
        RowValues::Timestamp(dt) => Value::Text(dt.format("%F %T%.f").to_string()),
        RowValues::Null => Value::Null,
        RowValues::JSON(jval) => Value::Text(jval.to_string()),
        RowValues::Blob(bytes) => Value::Blob(bytes.clone()),
    }
}

#[must_use]
pub fn convert_params(params: &[RowValues]) -> Vec<Value> {
    params.iter().map(row_value_to_sqlite_value).collect()
}

/// Value of a passthrough session option as a pragma argument literal.
#[must_use]
pub fn param_value_to_pragma(value: &ParamValue) -> String {
    match value {
        ParamValue::Flag(flag) => i64::from(*flag).to_string(),
        ParamValue::Int(i) => i.to_string(),
        ParamValue::Text(s) => quote(s),
    }
}
