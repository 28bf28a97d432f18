//! HBase endpoint configuration.
//!
//! Parsed from a flat [`ConnectorConfig`]:
//!
//! | key | default |
//! |-----|---------|
//! | `table` | required |
//! | `operation` | none (PUT at dispatch time) |
//! | `max.results` | 100 |
//! | `mapping.strategy.name` | none |
//! | `mapping.strategy.class.name` | none |
//! | `pool.max.size` | 10 |
//! | `row.type` | none (UTF-8) |
//! | `family`, `qualifier`, `value.type` | first row model cell |
//! | `family2`, `qualifier2`, `value.type2`, ... | further row model cells |

use cellbridge_core::{Cell, Row, ValueType, DEFAULT_POOL_MAX_SIZE};
use serde::{Deserialize, Serialize};

use super::{indexed_header, Operation};
use crate::config::ConnectorConfig;
use crate::error::ConnectorError;

/// Default upper bound on rows returned by a scan.
pub const DEFAULT_MAX_RESULTS: usize = 100;

fn default_max_results() -> usize {
    DEFAULT_MAX_RESULTS
}

fn default_pool_max_size() -> usize {
    DEFAULT_POOL_MAX_SIZE
}

/// Endpoint-level settings shared by every message sent to the endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HBaseEndpointConfig {
    /// Target table.
    pub table_name: String,
    /// Default operation when a message carries none.
    #[serde(default)]
    pub operation: Option<Operation>,
    /// Default scan bound; 0 disables defaulting of the header.
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    /// Default mapping strategy name.
    #[serde(default)]
    pub mapping_strategy_name: Option<String>,
    /// Default custom mapping strategy name.
    #[serde(default)]
    pub mapping_strategy_class_name: Option<String>,
    /// Maximum pooled table handles.
    #[serde(default = "default_pool_max_size")]
    pub pool_max_size: usize,
    /// Row model merged into every row before it is processed.
    #[serde(default)]
    pub row_model: Row,
}

impl HBaseEndpointConfig {
    /// Creates a config for `table_name` with every other setting defaulted.
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            operation: None,
            max_results: DEFAULT_MAX_RESULTS,
            mapping_strategy_name: None,
            mapping_strategy_class_name: None,
            pool_max_size: DEFAULT_POOL_MAX_SIZE,
            row_model: Row::new(),
        }
    }

    /// Builds a config from a flat property map.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::MissingConfig`] if `table` is absent, or
    /// [`ConnectorError::ConfigurationError`] if a value does not parse or a
    /// row model cell names only one of family and qualifier.
    pub fn from_config(config: &ConnectorConfig) -> Result<Self, ConnectorError> {
        let table_name = config.require("table")?.to_string();
        let operation = config
            .get("operation")
            .map(str::parse::<Operation>)
            .transpose()?;
        let max_results = config
            .get_parsed("max.results")?
            .unwrap_or(DEFAULT_MAX_RESULTS);
        let pool_max_size: usize = config
            .get_parsed("pool.max.size")?
            .unwrap_or(DEFAULT_POOL_MAX_SIZE);
        if pool_max_size == 0 {
            return Err(ConnectorError::ConfigurationError(
                "pool.max.size must be at least 1".into(),
            ));
        }

        Ok(Self {
            table_name,
            operation,
            max_results,
            mapping_strategy_name: config.get("mapping.strategy.name").map(ToString::to_string),
            mapping_strategy_class_name: config
                .get("mapping.strategy.class.name")
                .map(ToString::to_string),
            pool_max_size,
            row_model: row_model_from_config(config)?,
        })
    }
}

fn row_model_from_config(config: &ConnectorConfig) -> Result<Row, ConnectorError> {
    let mut model = Row::new();
    model.row_type = config.get_parsed::<ValueType>("row.type")?;

    for index in 1.. {
        let family = config.get(&indexed_header("family", index));
        let qualifier = config.get(&indexed_header("qualifier", index));
        let (family, qualifier) = match (family, qualifier) {
            (None, None) => break,
            (Some(f), Some(q)) => (f, q),
            _ => {
                return Err(ConnectorError::ConfigurationError(format!(
                    "row model cell {index} needs both family and qualifier"
                )));
            }
        };
        let mut cell = Cell::new(family, qualifier);
        cell.value_type = config.get_parsed(&indexed_header("value.type", index))?;
        model.add_cell(cell);
    }
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let mut config = ConnectorConfig::new("hbase");
        config.set("table", "customers");

        let cfg = HBaseEndpointConfig::from_config(&config).unwrap();
        assert_eq!(cfg, HBaseEndpointConfig::new("customers"));
        assert_eq!(cfg.max_results, 100);
        assert_eq!(cfg.pool_max_size, 10);
        assert!(cfg.operation.is_none());
        assert!(cfg.row_model.cells().is_empty());
    }

    #[test]
    fn test_missing_table() {
        let config = ConnectorConfig::new("hbase");
        let err = HBaseEndpointConfig::from_config(&config).unwrap_err();
        assert!(matches!(err, ConnectorError::MissingConfig(ref k) if k == "table"));
    }

    #[test]
    fn test_full_config() {
        let mut config = ConnectorConfig::new("hbase");
        config.set("table", "t");
        config.set("operation", "CamelHBaseScan");
        config.set("max.results", "5");
        config.set("mapping.strategy.name", "body");
        config.set("pool.max.size", "3");
        config.set("row.type", "long");
        config.set("family", "info");
        config.set("qualifier", "name");
        config.set("family2", "info");
        config.set("qualifier2", "age");
        config.set("value.type2", "int32");

        let cfg = HBaseEndpointConfig::from_config(&config).unwrap();
        assert_eq!(cfg.operation, Some(Operation::Scan));
        assert_eq!(cfg.max_results, 5);
        assert_eq!(cfg.mapping_strategy_name.as_deref(), Some("body"));
        assert_eq!(cfg.pool_max_size, 3);
        assert_eq!(cfg.row_model.row_type, Some(ValueType::Int64));
        assert_eq!(cfg.row_model.cells().len(), 2);
        assert_eq!(cfg.row_model.cell("info", "name").unwrap().value_type, None);
        assert_eq!(
            cfg.row_model.cell("info", "age").unwrap().value_type,
            Some(ValueType::Int32)
        );
    }

    #[test]
    fn test_half_specified_model_cell() {
        let mut config = ConnectorConfig::new("hbase");
        config.set("table", "t");
        config.set("family", "info");
        let err = HBaseEndpointConfig::from_config(&config).unwrap_err();
        assert!(matches!(err, ConnectorError::ConfigurationError(_)));
    }

    #[test]
    fn test_invalid_values() {
        for (key, value) in [
            ("operation", "upsert"),
            ("max.results", "lots"),
            ("pool.max.size", "0"),
            ("row.type", "uuid"),
        ] {
            let mut config = ConnectorConfig::new("hbase");
            config.set("table", "t");
            config.set(key, value);
            assert!(
                HBaseEndpointConfig::from_config(&config).is_err(),
                "{key}={value} should be rejected"
            );
        }
    }

    #[test]
    fn test_serde_defaults() {
        let cfg: HBaseEndpointConfig =
            serde_json::from_str(r#"{"table_name":"t","operation":"CamelHBaseGet"}"#).unwrap();
        assert_eq!(cfg.operation, Some(Operation::Get));
        assert_eq!(cfg.max_results, DEFAULT_MAX_RESULTS);
        assert_eq!(cfg.pool_max_size, DEFAULT_POOL_MAX_SIZE);
    }
}
