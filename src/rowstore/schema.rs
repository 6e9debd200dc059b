//! Row schema: ordered column declarations compiled into a record layout
//!
//! Fixed-width columns are packed first, in declaration order, into a block
//! whose size is known once the schema is compiled. Variable-length string
//! columns follow, each length-prefixed, also in declaration order.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::value::Value;
use crate::error::LsearchError;
use crate::Result;

/// Tag declaring a variable-length UTF-8 column
pub const STRING_MARKER: &str = "str";

/// Fixed-width scalar codecs, tagged with their struct-format letters
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FixedCodec {
    Bool,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Float32,
    Float64,
}

impl FixedCodec {
    pub fn tag(self) -> &'static str {
        match self {
            FixedCodec::Bool => "?",
            FixedCodec::Int32 => "i",
            FixedCodec::UInt32 => "I",
            FixedCodec::Int64 => "q",
            FixedCodec::UInt64 => "Q",
            FixedCodec::Float32 => "f",
            FixedCodec::Float64 => "d",
        }
    }

    /// Encoded width in bytes
    pub fn size(self) -> usize {
        match self {
            FixedCodec::Bool => 1,
            FixedCodec::Int32 | FixedCodec::UInt32 | FixedCodec::Float32 => 4,
            FixedCodec::Int64 | FixedCodec::UInt64 | FixedCodec::Float64 => 8,
        }
    }

    /// Whether `value` can be stored under this codec
    pub fn accepts(self, value: &Value) -> bool {
        matches!(
            (self, value),
            (FixedCodec::Bool, Value::Bool(_))
                | (FixedCodec::Int32, Value::Int32(_))
                | (FixedCodec::UInt32, Value::UInt32(_))
                | (FixedCodec::Int64, Value::Int64(_))
                | (FixedCodec::UInt64, Value::UInt64(_))
                | (FixedCodec::Float32, Value::Float32(_))
                | (FixedCodec::Float64, Value::Float64(_))
        )
    }
}

/// Codec of one column: a fixed scalar or the variable-length string marker
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ColumnCodec {
    Fixed(FixedCodec),
    Utf8,
}

impl ColumnCodec {
    pub fn tag(self) -> &'static str {
        match self {
            ColumnCodec::Fixed(codec) => codec.tag(),
            ColumnCodec::Utf8 => STRING_MARKER,
        }
    }

    pub fn is_variable(self) -> bool {
        matches!(self, ColumnCodec::Utf8)
    }

    pub fn accepts(self, value: &Value) -> bool {
        match self {
            ColumnCodec::Fixed(codec) => codec.accepts(value),
            ColumnCodec::Utf8 => matches!(value, Value::Str(_)),
        }
    }
}

impl FromStr for ColumnCodec {
    type Err = LsearchError;

    fn from_str(tag: &str) -> Result<Self> {
        let codec = match tag {
            "?" => ColumnCodec::Fixed(FixedCodec::Bool),
            "i" => ColumnCodec::Fixed(FixedCodec::Int32),
            "I" => ColumnCodec::Fixed(FixedCodec::UInt32),
            "q" => ColumnCodec::Fixed(FixedCodec::Int64),
            "Q" => ColumnCodec::Fixed(FixedCodec::UInt64),
            "f" => ColumnCodec::Fixed(FixedCodec::Float32),
            "d" => ColumnCodec::Fixed(FixedCodec::Float64),
            STRING_MARKER => ColumnCodec::Utf8,
            other => {
                return Err(LsearchError::SchemaViolation(format!(
                    "unknown column codec '{}'",
                    other
                )))
            }
        };
        Ok(codec)
    }
}

impl TryFrom<String> for ColumnCodec {
    type Error = LsearchError;

    fn try_from(tag: String) -> Result<Self> {
        tag.parse()
    }
}

impl From<ColumnCodec> for String {
    fn from(codec: ColumnCodec) -> Self {
        codec.tag().to_string()
    }
}

impl fmt::Display for ColumnCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// One declared column
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub codec: ColumnCodec,
}

/// Compiled row schema
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Column>", into = "Vec<Column>")]
pub struct RowSchema {
    columns: Vec<Column>,
    fixed: Vec<usize>,
    variable: Vec<usize>,
    fixed_size: usize,
}

impl RowSchema {
    pub fn builder() -> RowSchemaBuilder {
        RowSchemaBuilder::default()
    }

    /// Compile a schema from declared columns
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        let mut names = HashSet::new();
        for column in &columns {
            if !names.insert(column.name.as_str()) {
                return Err(LsearchError::SchemaViolation(format!(
                    "duplicate column '{}'",
                    column.name
                )));
            }
        }

        let mut fixed = Vec::new();
        let mut variable = Vec::new();
        let mut fixed_size = 0;
        for (idx, column) in columns.iter().enumerate() {
            match column.codec {
                ColumnCodec::Fixed(codec) => {
                    fixed.push(idx);
                    fixed_size += codec.size();
                }
                ColumnCodec::Utf8 => variable.push(idx),
            }
        }

        Ok(Self {
            columns,
            fixed,
            variable,
            fixed_size,
        })
    }

    /// Compile a schema from textual codec tags plus the list of
    /// variable-length columns. Each column must agree with that list:
    /// variable columns use the string marker, fixed columns never do.
    pub fn compile<N, T, V>(declarations: &[(N, T)], variable_columns: &[V]) -> Result<Self>
    where
        N: AsRef<str>,
        T: AsRef<str>,
        V: AsRef<str>,
    {
        let variable: HashSet<&str> = variable_columns.iter().map(AsRef::as_ref).collect();
        let mut columns = Vec::with_capacity(declarations.len());

        for (name, tag) in declarations {
            let (name, tag) = (name.as_ref(), tag.as_ref());
            let is_marker = tag == STRING_MARKER;
            if variable.contains(name) && !is_marker {
                return Err(LsearchError::SchemaViolation(format!(
                    "variable-length column '{}' must use the string marker",
                    name
                )));
            }
            if !variable.contains(name) && is_marker {
                return Err(LsearchError::SchemaViolation(format!(
                    "fixed-length column '{}' must not use the string marker",
                    name
                )));
            }
            columns.push(Column {
                name: name.to_string(),
                codec: tag.parse()?,
            });
        }

        Self::new(columns)
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Fixed columns in packing order
    pub fn fixed_columns(&self) -> impl Iterator<Item = &Column> {
        self.fixed.iter().map(|&idx| &self.columns[idx])
    }

    /// Variable columns in encoding order
    pub fn variable_columns(&self) -> impl Iterator<Item = &Column> {
        self.variable.iter().map(|&idx| &self.columns[idx])
    }

    /// Size of the packed fixed block
    pub fn fixed_size(&self) -> usize {
        self.fixed_size
    }

    /// Concatenated codec tags of the fixed block, e.g. `"if"`
    pub fn fixed_format(&self) -> String {
        self.fixed_columns().map(|c| c.codec.tag()).collect()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl TryFrom<Vec<Column>> for RowSchema {
    type Error = LsearchError;

    fn try_from(columns: Vec<Column>) -> Result<Self> {
        Self::new(columns)
    }
}

impl From<RowSchema> for Vec<Column> {
    fn from(schema: RowSchema) -> Self {
        schema.columns
    }
}

/// Builder for row schemas
#[derive(Default)]
pub struct RowSchemaBuilder {
    columns: Vec<Column>,
}

impl RowSchemaBuilder {
    pub fn fixed(mut self, name: &str, codec: FixedCodec) -> Self {
        self.columns.push(Column {
            name: name.to_string(),
            codec: ColumnCodec::Fixed(codec),
        });
        self
    }

    pub fn variable(mut self, name: &str) -> Self {
        self.columns.push(Column {
            name: name.to_string(),
            codec: ColumnCodec::Utf8,
        });
        self
    }

    pub fn build(self) -> Result<RowSchema> {
        RowSchema::new(self.columns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RowSchema {
        RowSchema::builder()
            .fixed("id", FixedCodec::Int32)
            .variable("title")
            .fixed("value", FixedCodec::Float32)
            .variable("description")
            .build()
            .unwrap()
    }

    #[test]
    fn test_layout() {
        let schema = sample();
        assert_eq!(schema.fixed_size(), 8);
        assert_eq!(schema.fixed_format(), "if");
        let vars: Vec<_> = schema.variable_columns().map(|c| c.name.as_str()).collect();
        assert_eq!(vars, vec!["title", "description"]);
    }

    #[test]
    fn test_compile_from_tags() {
        let schema = RowSchema::compile(
            &[("id", "i"), ("value", "f"), ("title", "str"), ("description", "str")],
            &["title", "description"],
        )
        .unwrap();
        assert_eq!(schema.len(), 4);
        assert_eq!(schema.fixed_size(), 8);
    }

    #[test]
    fn test_fixed_column_with_marker_fails() {
        let err = RowSchema::compile(
            &[("id", "str"), ("value", "f"), ("title", "str")],
            &["title"],
        )
        .unwrap_err();
        assert!(matches!(err, LsearchError::SchemaViolation(_)));
        assert!(err
            .to_string()
            .contains("fixed-length column 'id' must not use the string marker"));
    }

    #[test]
    fn test_variable_column_without_marker_fails() {
        let err = RowSchema::compile(
            &[("id", "i"), ("title", "i"), ("description", "str")],
            &["title", "description"],
        )
        .unwrap_err();
        assert!(err
            .to_string()
            .contains("variable-length column 'title' must use the string marker"));
    }

    #[test]
    fn test_unknown_tag_and_duplicates() {
        assert!(RowSchema::compile(&[("id", "z")], &[] as &[&str]).is_err());
        let dup = RowSchema::builder()
            .fixed("id", FixedCodec::Int32)
            .variable("id")
            .build();
        assert!(matches!(dup, Err(LsearchError::SchemaViolation(_))));
    }

    #[test]
    fn test_json_roundtrip() {
        let schema = sample();
        let json = serde_json::to_string(&schema).unwrap();
        assert!(json.contains("\"codec\":\"str\""));
        let back: RowSchema = serde_json::from_str(&json).unwrap();
        assert_eq!(back, schema);
    }
}
