//! Connector metrics snapshot shared by every connector.

use serde::{Deserialize, Serialize};

/// Point-in-time connector statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConnectorMetrics {
    /// Records processed.
    pub records_total: u64,
    /// Payload bytes processed.
    pub bytes_total: u64,
    /// Failed operations.
    pub errors_total: u64,
    /// Connector-specific gauges and counters.
    pub custom: Vec<(String, f64)>,
}

impl ConnectorMetrics {
    /// Appends a connector-specific metric.
    pub fn add_custom(&mut self, name: impl Into<String>, value: f64) {
        self.custom.push((name.into(), value));
    }

    /// Looks up a connector-specific metric by name.
    #[must_use]
    pub fn custom_value(&self, name: &str) -> Option<f64> {
        self.custom
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| *v)
    }
}
