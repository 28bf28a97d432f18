use cellbridge_core::RowBatch;
use serde::Deserialize;

use super::CellMappingStrategy;
use crate::error::ConnectorError;
use crate::message::Message;

/// Maps rows to and from a JSON-encoded [`RowBatch`] message body.
#[derive(Debug, Clone, Copy, Default)]
pub struct BodyMappingStrategy;

impl BodyMappingStrategy {
    fn write_body(out: &mut Message, data: &RowBatch) -> Result<(), ConnectorError> {
        out.set_body(serde_json::to_value(data)?);
        Ok(())
    }
}

impl CellMappingStrategy for BodyMappingStrategy {
    fn resolve_model(&self, message: &Message) -> Result<RowBatch, ConnectorError> {
        let body = message
            .body()
            .ok_or(ConnectorError::MissingField("HBase data body"))?;
        Ok(RowBatch::deserialize(body)?)
    }

    fn apply_get_results(&self, out: &mut Message, data: RowBatch) -> Result<(), ConnectorError> {
        Self::write_body(out, &data)
    }

    fn apply_scan_results(&self, out: &mut Message, data: RowBatch) -> Result<(), ConnectorError> {
        Self::write_body(out, &data)
    }
}
