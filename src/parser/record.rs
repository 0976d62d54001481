use anyhow::{bail, Result};
use serde_json::Value;

use super::jsonpaths::JsonPath;
use crate::schema::{Column, ColumnType, TableSchema};

/// How source fields are located for each staging column
#[derive(Debug, Clone)]
pub enum FieldMapping {
    /// One path per column, in column order
    Paths(Vec<JsonPath>),
    /// Top-level field with the same name as the column
    Auto,
}

impl FieldMapping {
    /// Check the mapping covers the table's columns exactly
    pub fn validate(&self, schema: &TableSchema) -> Result<()> {
        if let FieldMapping::Paths(paths) = self {
            if paths.len() != schema.columns.len() {
                bail!(
                    "JSONPaths document has {} paths but {} has {} columns",
                    paths.len(),
                    schema.name,
                    schema.columns.len()
                );
            }
        }
        Ok(())
    }
}

/// A parsed row ready for insertion, values in column order
#[derive(Debug, Clone)]
pub struct ParsedRow {
    pub values: Vec<SqlValue>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl SqlValue {
    pub fn bind_to(&self, idx: usize, stmt: &mut rusqlite::Statement) -> rusqlite::Result<()> {
        match self {
            SqlValue::Null => stmt.raw_bind_parameter(idx, rusqlite::types::Null)?,
            SqlValue::Integer(i) => stmt.raw_bind_parameter(idx, i)?,
            SqlValue::Real(f) => stmt.raw_bind_parameter(idx, f)?,
            SqlValue::Text(s) => stmt.raw_bind_parameter(idx, s.as_str())?,
        }
        Ok(())
    }
}

/// Map one JSON record onto the staging table's columns
pub fn parse_record(
    record: &Value,
    schema: &TableSchema,
    mapping: &FieldMapping,
) -> Result<ParsedRow> {
    if !record.is_object() {
        bail!("expected a JSON object, found {}", kind(record));
    }

    let mut values = Vec::with_capacity(schema.columns.len());

    for (idx, col) in schema.columns.iter().enumerate() {
        let field = match mapping {
            FieldMapping::Paths(paths) => paths.get(idx).and_then(|p| p.select(record)),
            FieldMapping::Auto => record.get(col.name),
        };

        let value = match field {
            None | Some(Value::Null) => SqlValue::Null,
            Some(v) => coerce(v, col)?,
        };
        values.push(value);
    }

    Ok(ParsedRow { values })
}

/// Convert a JSON value to the column's declared type; anything else is a malformed record
fn coerce(value: &Value, col: &Column) -> Result<SqlValue> {
    let converted = match col.col_type {
        ColumnType::SmallInt | ColumnType::Integer | ColumnType::BigInt => {
            let int = match value {
                Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(whole_i64)),
                Value::String(s) => s.trim().parse::<i64>().ok(),
                Value::Bool(b) => Some(i64::from(*b)),
                _ => None,
            };
            int.filter(|i| fits(*i, col.col_type)).map(SqlValue::Integer)
        }
        ColumnType::Float => match value {
            Value::Number(n) => n.as_f64().map(SqlValue::Real),
            Value::String(s) => s.trim().parse::<f64>().ok().map(SqlValue::Real),
            _ => None,
        },
        ColumnType::Text | ColumnType::Timestamp => match value {
            Value::String(s) => Some(SqlValue::Text(s.clone())),
            other => Some(SqlValue::Text(other.to_string())),
        },
    };

    match converted {
        Some(v) => Ok(v),
        None => bail!(
            "column {}: cannot load {} {} as {:?}",
            col.name,
            kind(value),
            value,
            col.col_type
        ),
    }
}

/// `f` as an i64 when it is a whole number inside the i64 range
fn whole_i64(f: f64) -> Option<i64> {
    // i64::MAX as f64 rounds up to 2^63, which is already out of range
    let in_range = f >= i64::MIN as f64 && f < i64::MAX as f64;
    (in_range && f.fract() == 0.0).then_some(f as i64)
}

fn fits(value: i64, col_type: ColumnType) -> bool {
    match col_type {
        ColumnType::SmallInt => i16::try_from(value).is_ok(),
        ColumnType::Integer => i32::try_from(value).is_ok(),
        _ => true,
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
