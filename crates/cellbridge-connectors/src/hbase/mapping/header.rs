use cellbridge_core::convert::parse_str;
use cellbridge_core::{Cell, CellValue, ConversionError, Row, RowBatch, ValueType};
use serde_json::Value;

use super::CellMappingStrategy;
use crate::error::ConnectorError;
use crate::hbase::{indexed_header, FAMILY, QUALIFIER, ROW_ID, ROW_TYPE, VALUE, VALUE_TYPE};
use crate::message::Message;

/// Maps rows to and from numbered headers.
///
/// Row `n` is read from `CamelHBaseRowId<n>`, `CamelHBaseRowType<n>`,
/// `CamelHBaseFamily<n>`, `CamelHBaseQualifier<n>`, `CamelHBaseValue<n>` and
/// `CamelHBaseValueType<n>`, with no suffix for the first row. Reading stops
/// at the first index carrying none of id, family and qualifier. Entries
/// sharing an id are merged into one row, so a multi-cell row is written as
/// several numbered entries with the same id.
///
/// Results are written back under the same names, one index per cell.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeaderMappingStrategy;

impl HeaderMappingStrategy {
    fn resolve_row(message: &Message, index: usize) -> Result<Option<Row>, ConnectorError> {
        let id = message.header(&indexed_header(ROW_ID, index));
        let family = message.header_string(&indexed_header(FAMILY, index));
        let qualifier = message.header_string(&indexed_header(QUALIFIER, index));
        if id.is_none() && family.is_none() && qualifier.is_none() {
            return Ok(None);
        }

        let mut row = Row::new();
        row.row_type = parse_type(message, &indexed_header(ROW_TYPE, index))?;
        row.id = id
            .map(|v| json_to_cell_value(v, row.row_type))
            .transpose()?
            .flatten();

        if let (Some(family), Some(qualifier)) = (family, qualifier) {
            let mut cell = Cell::new(family, qualifier);
            cell.value_type = parse_type(message, &indexed_header(VALUE_TYPE, index))?;
            cell.value = message
                .header(&indexed_header(VALUE, index))
                .map(|v| json_to_cell_value(v, cell.value_type))
                .transpose()?
                .flatten();
            row.add_cell(cell);
        }
        Ok(Some(row))
    }

    fn write_results(out: &mut Message, data: &RowBatch) {
        let mut index = 1;
        for row in &data.rows {
            let id = cell_value_to_json(row.id.as_ref());
            for cell in row.cells() {
                out.set_header(indexed_header(ROW_ID, index), id.clone());
                out.set_header(indexed_header(FAMILY, index), cell.family.clone());
                out.set_header(indexed_header(QUALIFIER, index), cell.qualifier.clone());
                out.set_header(
                    indexed_header(VALUE, index),
                    cell_value_to_json(cell.value.as_ref()),
                );
                index += 1;
            }
        }
    }
}

impl CellMappingStrategy for HeaderMappingStrategy {
    fn resolve_model(&self, message: &Message) -> Result<RowBatch, ConnectorError> {
        let mut rows: Vec<Row> = Vec::new();
        for index in 1.. {
            let Some(row) = Self::resolve_row(message, index)? else {
                break;
            };
            match rows.iter_mut().find(|r| r.id == row.id) {
                Some(existing) => {
                    for cell in row.cells() {
                        existing.add_cell(cell.clone());
                    }
                }
                None => rows.push(row),
            }
        }
        Ok(rows.into())
    }

    fn apply_get_results(&self, out: &mut Message, data: RowBatch) -> Result<(), ConnectorError> {
        Self::write_results(out, &data);
        Ok(())
    }

    fn apply_scan_results(&self, out: &mut Message, data: RowBatch) -> Result<(), ConnectorError> {
        Self::write_results(out, &data);
        Ok(())
    }
}

fn parse_type(message: &Message, header: &str) -> Result<Option<ValueType>, ConversionError> {
    message
        .header_string(header)
        .filter(|s| !s.trim().is_empty())
        .map(|s| s.parse())
        .transpose()
}

/// Converts a header value into a cell value.
///
/// With a declared type the value's text form is parsed into that type
/// (byte arrays are taken as-is for `Bytes`). Without one, byte arrays stay
/// bytes and every other value is stored as UTF-8 text, so an untyped read
/// returns what was written.
fn json_to_cell_value(
    value: &Value,
    declared: Option<ValueType>,
) -> Result<Option<CellValue>, ConversionError> {
    if value.is_null() {
        return Ok(None);
    }
    if let (None | Some(ValueType::Bytes), Some(bytes)) = (declared, byte_array(value)) {
        return Ok(Some(CellValue::Bytes(bytes)));
    }
    let text = match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    parse_str(&text, declared.unwrap_or(ValueType::Utf8)).map(Some)
}

fn byte_array(value: &Value) -> Option<Vec<u8>> {
    value.as_array()?.iter().map(|v| v.as_u64().and_then(|b| u8::try_from(b).ok())).collect()
}

fn cell_value_to_json(value: Option<&CellValue>) -> Value {
    match value {
        None => Value::Null,
        Some(CellValue::Bytes(v)) => Value::from(v.clone()),
        Some(CellValue::Utf8(v)) => Value::from(v.as_str()),
        Some(CellValue::Int32(v)) => Value::from(*v),
        Some(CellValue::Int64(v)) => Value::from(*v),
        Some(CellValue::Float64(v)) => Value::from(*v),
        Some(CellValue::Bool(v)) => Value::from(*v),
    }
}
