//! Row and value conversion helpers.
//!
//! Records are keyed by attribute name and hold `serde_json::Value`s; libSQL
//! speaks column names and `libsql::Value`. These helpers translate between
//! the two using each attribute's declared `ColumnType`.

use rev_core::Record;
use rev_core::enums::ColumnType;
use rev_core::predicate::{Clause, Predicate};
use rev_core::schema::{AttributeDef, EntitySchema};
use serde_json::Value;

use crate::error::TrackingError;

/// Quote an identifier for SQL. Embedded quotes are doubled.
#[must_use]
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Convert a record value into a bindable libSQL value for a column of `ty`.
///
/// Scalars are coerced the way the column's SQLite affinity would store
/// them: numbers bind as `REAL` in real columns, integral floats as
/// `INTEGER` in integer and boolean columns, and numbers or booleans as
/// text in text columns.
///
/// # Errors
///
/// Returns `TrackingError::Json` if a structured value cannot be encoded.
pub fn to_sql_value(value: &Value, ty: ColumnType) -> Result<libsql::Value, TrackingError> {
    if value.is_null() {
        return Ok(libsql::Value::Null);
    }
    if ty == ColumnType::Json {
        return Ok(libsql::Value::Text(serde_json::to_string(value)?));
    }
    Ok(match (value, ty) {
        (Value::Bool(b), ColumnType::Text) => libsql::Value::Text(i64::from(*b).to_string()),
        (Value::Bool(b), _) => libsql::Value::Integer(i64::from(*b)),
        (Value::Number(n), ColumnType::Real) => {
            libsql::Value::Real(n.as_f64().unwrap_or(f64::NAN))
        }
        (Value::Number(n), ColumnType::Text) => libsql::Value::Text(n.to_string()),
        (Value::Number(n), _) => integral(n).map_or_else(
            || libsql::Value::Real(n.as_f64().unwrap_or(f64::NAN)),
            libsql::Value::Integer,
        ),
        (Value::String(s), _) => libsql::Value::Text(s.clone()),
        (Value::Array(_) | Value::Object(_), _) => {
            libsql::Value::Text(serde_json::to_string(value)?)
        }
        (Value::Null, _) => libsql::Value::Null,
    })
}

/// `n` as an `i64` when it has no fractional part and fits.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::float_cmp
)]
fn integral(n: &serde_json::Number) -> Option<i64> {
    n.as_i64().or_else(|| {
        n.as_f64()
            .filter(|f| f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64)
            .map(|f| f as i64)
    })
}

/// Convert a stored libSQL value back into a record value.
///
/// # Errors
///
/// Returns `TrackingError::Json` if a JSON column holds invalid JSON.
pub fn from_sql_value(value: libsql::Value, ty: ColumnType) -> Result<Value, TrackingError> {
    Ok(match (value, ty) {
        (libsql::Value::Null, _) => Value::Null,
        (libsql::Value::Integer(i), ColumnType::Boolean) => Value::Bool(i != 0),
        (libsql::Value::Integer(i), _) => Value::from(i),
        (libsql::Value::Real(f), _) => {
            serde_json::Number::from_f64(f).map_or(Value::Null, Value::Number)
        }
        (libsql::Value::Text(s), ColumnType::Json) => serde_json::from_str(&s)?,
        (libsql::Value::Text(s), _) => Value::String(s),
        (libsql::Value::Blob(bytes), _) => bytes.into_iter().map(Value::from).collect(),
    })
}

/// The value a column of `ty` reads back after storing `value`.
///
/// Used to compare incoming writes against stored state without reporting
/// storage-class differences such as `2` vs `2.0` as changes.
///
/// # Errors
///
/// Returns `TrackingError::Json` if a structured value cannot be encoded.
pub fn normalize(value: &Value, ty: ColumnType) -> Result<Value, TrackingError> {
    from_sql_value(to_sql_value(value, ty)?, ty)
}

/// Read a row selected with `attributes` in order into a record.
///
/// # Errors
///
/// Returns `TrackingError` if a column cannot be read or decoded.
pub fn row_to_record(
    row: &libsql::Row,
    attributes: &[&AttributeDef],
) -> Result<Record, TrackingError> {
    let mut record = Record::new();
    for (idx, attr) in (0_i32..).zip(attributes) {
        let value = from_sql_value(row.get_value(idx)?, attr.column_type)?;
        record.insert(attr.name.clone(), value);
    }
    Ok(record)
}

/// Resolve attribute names to definitions, in the order given.
///
/// An empty list selects every attribute of the schema.
///
/// # Errors
///
/// Returns `TrackingError::Configuration` for a name the schema lacks.
pub fn resolve_attributes<'a>(
    schema: &'a EntitySchema,
    names: &[String],
) -> Result<Vec<&'a AttributeDef>, TrackingError> {
    if names.is_empty() {
        return Ok(schema.attributes.iter().collect());
    }
    names.iter().map(|n| attribute(schema, n)).collect()
}

/// Look up one attribute definition.
///
/// # Errors
///
/// Returns `TrackingError::Configuration` if `schema` has no such attribute.
pub fn attribute<'a>(schema: &'a EntitySchema, name: &str) -> Result<&'a AttributeDef, TrackingError> {
    schema.get(name).ok_or_else(|| {
        TrackingError::Configuration(format!("{} has no attribute '{name}'", schema.name))
    })
}

/// Render `predicate` as a `WHERE` clause, appending bound values to `params`.
///
/// Placeholders are numbered after the values already in `params`. Returns
/// an empty string for an empty predicate.
///
/// # Errors
///
/// Returns `TrackingError` for unknown attributes or unencodable values.
pub fn where_clause(
    schema: &EntitySchema,
    predicate: &Predicate,
    params: &mut Vec<libsql::Value>,
) -> Result<String, TrackingError> {
    if predicate.is_empty() {
        return Ok(String::new());
    }

    let mut conditions = Vec::with_capacity(predicate.clauses.len());
    for clause in &predicate.clauses {
        let attr = attribute(schema, clause.attribute())?;
        let column = quote_ident(&attr.field);
        match clause {
            Clause::Eq(_, value) if value.is_null() => {
                conditions.push(format!("{column} IS NULL"));
            }
            Clause::Eq(_, value) => {
                params.push(to_sql_value(value, attr.column_type)?);
                conditions.push(format!("{column} = ?{}", params.len()));
            }
            Clause::In(_, values) if values.is_empty() => conditions.push("0".to_string()),
            Clause::In(_, values) => {
                let mut slots = Vec::with_capacity(values.len());
                for value in values {
                    params.push(to_sql_value(value, attr.column_type)?);
                    slots.push(format!("?{}", params.len()));
                }
                conditions.push(format!("{column} IN ({})", slots.join(", ")));
            }
            Clause::IsNull(_) => conditions.push(format!("{column} IS NULL")),
        }
    }
    Ok(format!("WHERE {}", conditions.join(" AND ")))
}
