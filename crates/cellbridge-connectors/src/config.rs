//! Flat key/value connector configuration.
//!
//! Connectors receive their settings as a string property map and parse it
//! into typed configs (see [`crate::hbase::HBaseEndpointConfig::from_config`]).

use std::collections::HashMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConnectorError;

/// Untyped connector properties.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectorConfig {
    connector_type: String,
    properties: HashMap<String, String>,
}

impl ConnectorConfig {
    /// Creates an empty config for `connector_type`.
    pub fn new(connector_type: impl Into<String>) -> Self {
        Self {
            connector_type: connector_type.into(),
            properties: HashMap::new(),
        }
    }

    /// Connector type name.
    #[must_use]
    pub fn connector_type(&self) -> &str {
        &self.connector_type
    }

    /// Returns a property value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// Returns a property value or a [`ConnectorError::MissingConfig`].
    ///
    /// # Errors
    ///
    /// Fails if `key` is not set.
    pub fn require(&self, key: &str) -> Result<&str, ConnectorError> {
        self.get(key)
            .ok_or_else(|| ConnectorError::MissingConfig(key.to_string()))
    }

    /// Parses a property value, `None` if it is not set.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::ConfigurationError`] if the value does not parse.
    pub fn get_parsed<T: FromStr>(&self, key: &str) -> Result<Option<T>, ConnectorError>
    where
        T::Err: std::fmt::Display,
    {
        self.get(key)
            .map(|v| {
                v.trim().parse().map_err(|e| {
                    ConnectorError::ConfigurationError(format!("invalid value for '{key}': {e}"))
                })
            })
            .transpose()
    }

    /// Sets a property.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.properties.insert(key.into(), value.into());
    }

    /// Properties under `prefix`, with the prefix stripped.
    #[must_use]
    pub fn properties_with_prefix(&self, prefix: &str) -> HashMap<String, String> {
        self.properties
            .iter()
            .filter_map(|(k, v)| {
                k.strip_prefix(prefix)
                    .map(|rest| (rest.to_string(), v.clone()))
            })
            .collect()
    }
}
