//! Generic row/cell model exchanged with mapping strategies.
//!
//! A [`Row`] is addressed by an opaque identifier and carries a set of
//! [`Cell`]s, each addressed by `(family, qualifier)`. Rows are built fresh
//! per message, merged with the endpoint's row model via [`Row::apply`],
//! consumed by exactly one store operation and then dropped.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::convert::ConversionError;

/// Declared type of a row identifier or a cell value.
///
/// Drives the conversion of raw store bytes back into a [`CellValue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    /// Raw bytes, passed through untouched.
    Bytes,
    /// UTF-8 string.
    #[default]
    Utf8,
    /// 32-bit signed integer, big-endian on the wire.
    Int32,
    /// 64-bit signed integer, big-endian on the wire.
    Int64,
    /// 64-bit float, IEEE-754 bits big-endian on the wire.
    Float64,
    /// Boolean, one byte on the wire.
    Bool,
}

impl ValueType {
    /// Canonical lowercase name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Bytes => "bytes",
            Self::Utf8 => "utf8",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::Float64 => "float64",
            Self::Bool => "bool",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ValueType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "bytes" | "binary" | "byte[]" => Ok(Self::Bytes),
            "utf8" | "string" | "java.lang.string" => Ok(Self::Utf8),
            "int32" | "int" | "integer" | "java.lang.integer" => Ok(Self::Int32),
            "int64" | "long" | "java.lang.long" => Ok(Self::Int64),
            "float64" | "double" | "java.lang.double" => Ok(Self::Float64),
            "bool" | "boolean" | "java.lang.boolean" => Ok(Self::Bool),
            other => Err(ConversionError::UnknownType(other.to_string())),
        }
    }
}

/// A typed cell value or row identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum CellValue {
    /// Raw bytes
    Bytes(Vec<u8>),
    /// UTF-8 string
    Utf8(String),
    /// 32-bit signed integer
    Int32(i32),
    /// 64-bit signed integer
    Int64(i64),
    /// 64-bit float
    Float64(f64),
    /// Boolean
    Bool(bool),
}

impl CellValue {
    /// Returns the [`ValueType`] of this value.
    #[must_use]
    pub const fn value_type(&self) -> ValueType {
        match self {
            Self::Bytes(_) => ValueType::Bytes,
            Self::Utf8(_) => ValueType::Utf8,
            Self::Int32(_) => ValueType::Int32,
            Self::Int64(_) => ValueType::Int64,
            Self::Float64(_) => ValueType::Float64,
            Self::Bool(_) => ValueType::Bool,
        }
    }

    /// Returns the string slice if this is a `Utf8` value.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Utf8(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bytes(v) => {
                for b in v {
                    write!(f, "{b:02x}")?;
                }
                Ok(())
            }
            Self::Utf8(v) => f.write_str(v),
            Self::Int32(v) => write!(f, "{v}"),
            Self::Int64(v) => write!(f, "{v}"),
            Self::Float64(v) => write!(f, "{v}"),
            Self::Bool(v) => write!(f, "{v}"),
        }
    }
}

impl From<&str> for CellValue {
    fn from(v: &str) -> Self {
        Self::Utf8(v.to_string())
    }
}

impl From<String> for CellValue {
    fn from(v: String) -> Self {
        Self::Utf8(v)
    }
}

impl From<i32> for CellValue {
    fn from(v: i32) -> Self {
        Self::Int32(v)
    }
}

impl From<i64> for CellValue {
    fn from(v: i64) -> Self {
        Self::Int64(v)
    }
}

impl From<f64> for CellValue {
    fn from(v: f64) -> Self {
        Self::Float64(v)
    }
}

impl From<bool> for CellValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<Vec<u8>> for CellValue {
    fn from(v: Vec<u8>) -> Self {
        Self::Bytes(v)
    }
}

/// A single cell addressed by `(family, qualifier)`.
///
/// Every field is optional so a cell can act as a template (family and
/// qualifier only), a write (with value) or a result (with timestamp).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    /// Column family.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family: Option<String>,
    /// Column qualifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qualifier: Option<String>,
    /// Cell value; `None` is a null value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<CellValue>,
    /// Declared value type used when reading the cell back.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_type: Option<ValueType>,
    /// Version timestamp (milliseconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

impl Cell {
    /// Creates a cell template for `family:qualifier`.
    #[must_use]
    pub fn new(family: impl Into<String>, qualifier: impl Into<String>) -> Self {
        Self {
            family: Some(family.into()),
            qualifier: Some(qualifier.into()),
            ..Self::default()
        }
    }

    /// Sets the value.
    #[must_use]
    pub fn with_value(mut self, value: impl Into<CellValue>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Sets the declared value type.
    #[must_use]
    pub fn with_value_type(mut self, value_type: ValueType) -> Self {
        self.value_type = Some(value_type);
        self
    }

    /// Declared value type, defaulting to [`ValueType::Utf8`].
    #[must_use]
    pub fn value_type(&self) -> ValueType {
        self.value_type.unwrap_or_default()
    }

    /// Whether both cells address the same `(family, qualifier)`.
    #[must_use]
    pub fn same_column(&self, other: &Cell) -> bool {
        self.family == other.family && self.qualifier == other.qualifier
    }

    /// Fills gaps in this cell from a model cell of the same column.
    pub fn apply(&mut self, model: &Cell) {
        if self.value_type.is_none() {
            self.value_type = model.value_type;
        }
    }
}

/// A row: identifier plus a set of cells unique by `(family, qualifier)`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Row {
    /// Row identifier; converted to the row key bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<CellValue>,
    /// Expected type of the identifier when reading keys back.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_type: Option<ValueType>,
    /// Row timestamp (milliseconds), set on results.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    #[serde(default)]
    cells: Vec<Cell>,
}

impl Row {
    /// Creates an empty row.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the identifier.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<CellValue>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Sets the expected identifier type.
    #[must_use]
    pub fn with_row_type(mut self, row_type: ValueType) -> Self {
        self.row_type = Some(row_type);
        self
    }

    /// Adds a cell, keeping set semantics.
    #[must_use]
    pub fn with_cell(mut self, cell: Cell) -> Self {
        self.add_cell(cell);
        self
    }

    /// Adds `cell` unless a cell for the same column is already present.
    ///
    /// Returns `true` if the cell was inserted.
    pub fn add_cell(&mut self, cell: Cell) -> bool {
        if self.cells.iter().any(|c| c.same_column(&cell)) {
            return false;
        }
        self.cells.push(cell);
        true
    }

    /// Cells in insertion order.
    #[must_use]
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Looks up a cell by column.
    #[must_use]
    pub fn cell(&self, family: &str, qualifier: &str) -> Option<&Cell> {
        self.cells.iter().find(|c| {
            c.family.as_deref() == Some(family) && c.qualifier.as_deref() == Some(qualifier)
        })
    }

    /// Expected identifier type, defaulting to [`ValueType::Utf8`].
    #[must_use]
    pub fn row_type(&self) -> ValueType {
        self.row_type.unwrap_or_default()
    }

    /// Merges an endpoint-level row model into this row.
    ///
    /// Missing identifier type and value types are taken from the model,
    /// and model cells for columns this row lacks are appended.
    pub fn apply(&mut self, model: &Row) {
        if self.row_type.is_none() {
            self.row_type = model.row_type;
        }
        for model_cell in &model.cells {
            match self.cells.iter_mut().find(|c| c.same_column(model_cell)) {
                Some(cell) => cell.apply(model_cell),
                None => self.cells.push(model_cell.clone()),
            }
        }
    }
}

/// Ordered collection of rows, the unit exchanged with mapping strategies.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RowBatch {
    /// Rows in order.
    pub rows: Vec<Row>,
}

impl RowBatch {
    /// Creates an empty batch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a row.
    pub fn push(&mut self, row: Row) {
        self.rows.push(row);
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the batch holds no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl From<Vec<Row>> for RowBatch {
    fn from(rows: Vec<Row>) -> Self {
        Self { rows }
    }
}

impl FromIterator<Row> for RowBatch {
    fn from_iter<I: IntoIterator<Item = Row>>(iter: I) -> Self {
        Self {
            rows: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for RowBatch {
    type Item = Row;
    type IntoIter = std::vec::IntoIter<Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}
