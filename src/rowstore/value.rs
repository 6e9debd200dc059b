use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::schema::{ColumnCodec, FixedCodec};
use crate::error::LsearchError;
use crate::Result;

/// A single cell value
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Bool(bool),
    Int32(i32),
    UInt32(u32),
    Int64(i64),
    UInt64(u64),
    Float32(f32),
    Float64(f64),
    Str(String),
}

/// A row keyed by column name
pub type Row = BTreeMap<String, Value>;

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Convert a plain JSON scalar into the value a column codec expects
    pub fn from_json(codec: ColumnCodec, json: &serde_json::Value) -> Result<Self> {
        let mismatch = || {
            LsearchError::SchemaViolation(format!(
                "JSON value {} does not fit column codec '{}'",
                json, codec
            ))
        };

        let value = match codec {
            ColumnCodec::Utf8 => Value::Str(json.as_str().ok_or_else(mismatch)?.to_string()),
            ColumnCodec::Fixed(FixedCodec::Bool) => Value::Bool(json.as_bool().ok_or_else(mismatch)?),
            ColumnCodec::Fixed(FixedCodec::Int32) => Value::Int32(
                json.as_i64()
                    .and_then(|v| i32::try_from(v).ok())
                    .ok_or_else(mismatch)?,
            ),
            ColumnCodec::Fixed(FixedCodec::UInt32) => Value::UInt32(
                json.as_u64()
                    .and_then(|v| u32::try_from(v).ok())
                    .ok_or_else(mismatch)?,
            ),
            ColumnCodec::Fixed(FixedCodec::Int64) => Value::Int64(json.as_i64().ok_or_else(mismatch)?),
            ColumnCodec::Fixed(FixedCodec::UInt64) => Value::UInt64(json.as_u64().ok_or_else(mismatch)?),
            ColumnCodec::Fixed(FixedCodec::Float32) => {
                Value::Float32(json.as_f64().ok_or_else(mismatch)? as f32)
            }
            ColumnCodec::Fixed(FixedCodec::Float64) => Value::Float64(json.as_f64().ok_or_else(mismatch)?),
        };
        Ok(value)
    }

    /// Plain JSON scalar for display output
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Bool(v) => serde_json::Value::from(*v),
            Value::Int32(v) => serde_json::Value::from(*v),
            Value::UInt32(v) => serde_json::Value::from(*v),
            Value::Int64(v) => serde_json::Value::from(*v),
            Value::UInt64(v) => serde_json::Value::from(*v),
            Value::Float32(v) => serde_json::Value::from(*v),
            Value::Float64(v) => serde_json::Value::from(*v),
            Value::Str(v) => serde_json::Value::from(v.as_str()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(v) => write!(f, "{}", v),
            Value::Int32(v) => write!(f, "{}", v),
            Value::UInt32(v) => write!(f, "{}", v),
            Value::Int64(v) => write!(f, "{}", v),
            Value::UInt64(v) => write!(f, "{}", v),
            Value::Float32(v) => write!(f, "{}", v),
            Value::Float64(v) => write!(f, "{}", v),
            Value::Str(v) => f.write_str(v),
        }
    }
}

/// Convert a JSON object into a row, taking only the schema's columns
pub fn row_from_json(
    schema: &super::schema::RowSchema,
    object: &serde_json::Map<String, serde_json::Value>,
) -> Result<Row> {
    let mut row = Row::new();
    for column in schema.columns() {
        if let Some(json) = object.get(&column.name) {
            row.insert(column.name.clone(), Value::from_json(column.codec, json)?);
        }
    }
    Ok(row)
}

/// Plain JSON object for a row
pub fn row_to_json(row: &Row) -> serde_json::Value {
    serde_json::Value::Object(
        row.iter()
            .map(|(name, value)| (name.clone(), value.to_json()))
            .collect(),
    )
}
