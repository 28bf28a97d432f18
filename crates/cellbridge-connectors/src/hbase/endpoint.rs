//! HBase endpoint: configuration, table pool, strategies and filters.

use std::sync::Arc;

use cellbridge_core::{build_table_pool, FilterTemplate, Row, TableConnection, TablePool};
use tracing::info;

use super::config::HBaseEndpointConfig;
use super::mapping::{CellMappingStrategy, CellMappingStrategyFactory};
use super::producer::HBaseProducer;
use crate::config::ConnectorConfig;
use crate::error::ConnectorError;

/// Everything producers for one table share.
pub struct HBaseEndpoint {
    config: HBaseEndpointConfig,
    pool: TablePool,
    strategies: CellMappingStrategyFactory,
    filters: Vec<FilterTemplate>,
}

impl std::fmt::Debug for HBaseEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HBaseEndpoint")
            .field("config", &self.config)
            .field("strategies", &self.strategies)
            .field("filters", &self.filters)
            .finish_non_exhaustive()
    }
}

impl HBaseEndpoint {
    /// Creates an endpoint over `connection`. Table handles are opened lazily.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::ConnectionFailed`] if the pool cannot be built.
    pub fn new(
        config: HBaseEndpointConfig,
        connection: Arc<dyn TableConnection>,
    ) -> Result<Self, ConnectorError> {
        let pool = build_table_pool(connection, &config.table_name, config.pool_max_size)
            .map_err(|e| ConnectorError::ConnectionFailed(e.to_string()))?;
        info!(
            table = %config.table_name,
            operation = ?config.operation,
            max_results = config.max_results,
            model_cells = config.row_model.cells().len(),
            "created HBase endpoint"
        );
        Ok(Self {
            config,
            pool,
            strategies: CellMappingStrategyFactory::new(),
            filters: Vec::new(),
        })
    }

    /// Creates an endpoint from flat properties.
    ///
    /// # Errors
    ///
    /// Fails if the properties do not describe a valid endpoint.
    pub fn from_config(
        config: &ConnectorConfig,
        connection: Arc<dyn TableConnection>,
    ) -> Result<Self, ConnectorError> {
        Self::new(HBaseEndpointConfig::from_config(config)?, connection)
    }

    /// Adds a scan filter template.
    #[must_use]
    pub fn with_filter(mut self, filter: FilterTemplate) -> Self {
        self.filters.push(filter);
        self
    }

    /// Registers a custom mapping strategy under `class_name`.
    #[must_use]
    pub fn with_strategy(
        mut self,
        class_name: impl Into<String>,
        strategy: Arc<dyn CellMappingStrategy>,
    ) -> Self {
        self.strategies.register(class_name, strategy);
        self
    }

    /// Wraps the endpoint in a producer.
    #[must_use]
    pub fn into_producer(self) -> HBaseProducer {
        HBaseProducer::new(Arc::new(self))
    }

    /// Endpoint configuration.
    #[must_use]
    pub fn config(&self) -> &HBaseEndpointConfig {
        &self.config
    }

    /// Target table.
    #[must_use]
    pub fn table_name(&self) -> &str {
        &self.config.table_name
    }

    /// Row model merged into every row.
    #[must_use]
    pub fn row_model(&self) -> &Row {
        &self.config.row_model
    }

    /// Table handle pool.
    #[must_use]
    pub fn pool(&self) -> &TablePool {
        &self.pool
    }

    /// Mapping strategy lookup.
    #[must_use]
    pub fn strategies(&self) -> &CellMappingStrategyFactory {
        &self.strategies
    }

    /// Scan filter templates.
    #[must_use]
    pub fn filters(&self) -> &[FilterTemplate] {
        &self.filters
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cellbridge_core::{ColumnMatchingFilter, InMemoryConnection};

    #[test]
    fn test_from_config() {
        let mut config = ConnectorConfig::new("hbase");
        config.set("table", "t");
        config.set("pool.max.size", "4");
        let endpoint = HBaseEndpoint::from_config(&config, Arc::new(InMemoryConnection::new()))
            .unwrap()
            .with_filter(FilterTemplate::model_aware(ColumnMatchingFilter));

        assert_eq!(endpoint.table_name(), "t");
        assert_eq!(endpoint.pool().status().max_size, 4);
        assert_eq!(endpoint.filters().len(), 1);
    }

    #[test]
    fn test_pool_is_lazy() {
        // No table "t" exists yet; creating the endpoint must still succeed.
        let endpoint = HBaseEndpoint::new(
            HBaseEndpointConfig::new("t"),
            Arc::new(InMemoryConnection::new()),
        )
        .unwrap();
        assert_eq!(endpoint.pool().status().size, 0);
    }
}
