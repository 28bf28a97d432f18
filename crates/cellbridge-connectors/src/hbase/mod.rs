//! HBase-style column-store producer.
//!
//! Translates a [`Message`](crate::message::Message) into one of four store
//! operations (PUT, GET, DELETE, SCAN) through a pluggable
//! [`CellMappingStrategy`](mapping::CellMappingStrategy) and a pooled table
//! handle, and maps GET/SCAN results back onto the outbound message.
//!
//! ## Headers
//!
//! | header | meaning |
//! |--------|---------|
//! | `CamelHBaseOperation` | `CamelHBasePut`, `CamelHBaseGet`, `CamelHBaseDelete` or `CamelHBaseScan` |
//! | `CamelHBaseMaxScanResults` | upper bound on rows returned by a scan |
//! | `CamelHBaseStartRow` | inclusive start row of a scan |
//! | `CamelMappingStrategy` | `header` or `body` |
//! | `CamelMappingStrategyClassName` | name of a registered custom strategy |
//!
//! Missing headers are filled from the endpoint configuration before the
//! operation runs; the operation falls back to PUT.

use serde::{Deserialize, Serialize};

pub mod config;
pub mod endpoint;
pub mod mapping;
pub mod metrics;
pub mod producer;

pub use config::HBaseEndpointConfig;
pub use endpoint::HBaseEndpoint;
pub use mapping::{CellMappingStrategy, CellMappingStrategyFactory, MappingStrategyName};
pub use metrics::HBaseProducerMetrics;
pub use producer::HBaseProducer;

/// Operation selector header.
pub const OPERATION: &str = "CamelHBaseOperation";
/// Maximum number of rows a scan returns.
pub const MAX_SCAN_RESULTS: &str = "CamelHBaseMaxScanResults";
/// Inclusive scan start row.
pub const FROM_ROW: &str = "CamelHBaseStartRow";
/// Mapping strategy name (`header` or `body`).
pub const STRATEGY: &str = "CamelMappingStrategy";
/// Registered custom mapping strategy name.
pub const STRATEGY_CLASS_NAME: &str = "CamelMappingStrategyClassName";

/// Row identifier header of the header mapping strategy.
pub const ROW_ID: &str = "CamelHBaseRowId";
/// Row identifier type header.
pub const ROW_TYPE: &str = "CamelHBaseRowType";
/// Column family header.
pub const FAMILY: &str = "CamelHBaseFamily";
/// Column qualifier header.
pub const QUALIFIER: &str = "CamelHBaseQualifier";
/// Cell value header.
pub const VALUE: &str = "CamelHBaseValue";
/// Cell value type header.
pub const VALUE_TYPE: &str = "CamelHBaseValueType";

/// The store operation a message requests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    /// Write cells.
    #[default]
    #[serde(rename = "CamelHBasePut")]
    Put,
    /// Read the latest version of cells of one row.
    #[serde(rename = "CamelHBaseGet")]
    Get,
    /// Remove whole rows.
    #[serde(rename = "CamelHBaseDelete")]
    Delete,
    /// Read a range of rows.
    #[serde(rename = "CamelHBaseScan")]
    Scan,
}

impl Operation {
    /// Value of the operation header selecting this operation.
    #[must_use]
    pub const fn header_value(self) -> &'static str {
        match self {
            Self::Put => "CamelHBasePut",
            Self::Get => "CamelHBaseGet",
            Self::Delete => "CamelHBaseDelete",
            Self::Scan => "CamelHBaseScan",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.header_value())
    }
}

str_enum!(fromstr Operation, lowercase, "unknown HBase operation",
    Put => "camelhbaseput", "put";
    Get => "camelhbaseget", "get";
    Delete => "camelhbasedelete", "delete";
    Scan => "camelhbasescan", "scan"
);

/// Header name for the `index`-th row (1-based): no suffix for the first row.
#[must_use]
pub fn indexed_header(name: &str, index: usize) -> String {
    if index <= 1 {
        name.to_string()
    } else {
        format!("{name}{index}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConnectorError;

    #[test]
    fn test_operation_parse() {
        assert_eq!("CamelHBaseGet".parse::<Operation>().unwrap(), Operation::Get);
        assert_eq!("scan".parse::<Operation>().unwrap(), Operation::Scan);
        assert_eq!(" DELETE ".parse::<Operation>().unwrap(), Operation::Delete);
        let err = "upsert".parse::<Operation>().unwrap_err();
        assert!(matches!(err, ConnectorError::ConfigurationError(ref m) if m.contains("upsert")));
    }

    #[test]
    fn test_operation_header_value_round_trip() {
        for op in [Operation::Put, Operation::Get, Operation::Delete, Operation::Scan] {
            assert_eq!(op.header_value().parse::<Operation>().unwrap(), op);
            assert_eq!(op.to_string(), op.header_value());
        }
        assert_eq!(Operation::default(), Operation::Put);
    }

    #[test]
    fn test_indexed_header() {
        assert_eq!(indexed_header(ROW_ID, 1), "CamelHBaseRowId");
        assert_eq!(indexed_header(ROW_ID, 2), "CamelHBaseRowId2");
        assert_eq!(indexed_header(VALUE, 12), "CamelHBaseValue12");
    }
}
