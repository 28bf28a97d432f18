//! HBase producer: operation dispatch, row builders and result mapping.
//!
//! Each [`HBaseProducer::process`] call:
//!
//! 1. checks a table handle out of the endpoint pool,
//! 2. fills missing headers from the endpoint defaults,
//! 3. resolves the operation and the mapping strategy,
//! 4. builds the row batch and merges the endpoint row model into each row,
//! 5. runs exactly one operation family over the batch,
//! 6. writes GET/SCAN results to the outbound message when any row came back.
//!
//! The handle goes back to the pool when it is dropped, on every exit path.

use std::sync::Arc;

use bytes::Bytes;
use cellbridge_core::convert::{coerce, field_bytes, from_bytes, to_bytes};
use cellbridge_core::{
    bind_templates, checkout, Cell, Delete, Get, Put, ResultScanner, Row, RowBatch, Scan, Table,
};
use tracing::{debug, warn};

use super::endpoint::HBaseEndpoint;
use super::mapping::CellMappingStrategy;
use super::metrics::HBaseProducerMetrics;
use super::{Operation, FROM_ROW, MAX_SCAN_RESULTS, OPERATION, STRATEGY, STRATEGY_CLASS_NAME};
use crate::error::ConnectorError;
use crate::message::{Exchange, Message};

/// Executes store operations for messages sent to an [`HBaseEndpoint`].
///
/// The producer is `Send + Sync`; concurrent `process` calls each check out
/// their own table handle.
#[derive(Debug)]
pub struct HBaseProducer {
    endpoint: Arc<HBaseEndpoint>,
    metrics: HBaseProducerMetrics,
}

impl HBaseProducer {
    /// Creates a producer for `endpoint`.
    #[must_use]
    pub fn new(endpoint: Arc<HBaseEndpoint>) -> Self {
        Self {
            endpoint,
            metrics: HBaseProducerMetrics::new(),
        }
    }

    /// The endpoint this producer writes to.
    #[must_use]
    pub fn endpoint(&self) -> &Arc<HBaseEndpoint> {
        &self.endpoint
    }

    /// Producer statistics.
    #[must_use]
    pub fn metrics(&self) -> &HBaseProducerMetrics {
        &self.metrics
    }

    /// Runs the operation the exchange's inbound message asks for.
    ///
    /// Missing headers on the inbound message are filled in place.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::MissingField`] when a row lacks an id, cells,
    /// family or qualifier the operation needs (nothing is sent to the store
    /// in that case), [`ConnectorError::ConfigurationError`] for unknown
    /// operations or strategies, and conversion or store errors unchanged.
    pub async fn process(&self, exchange: &mut Exchange) -> Result<(), ConnectorError> {
        let result = self.dispatch(exchange).await;
        if let Err(ref e) = result {
            self.metrics.record_error();
            warn!(table = %self.endpoint.table_name(), error = %e, "HBase operation failed");
        }
        result
    }

    async fn dispatch(&self, exchange: &mut Exchange) -> Result<(), ConnectorError> {
        let mut table = checkout(self.endpoint.pool()).await?;

        self.update_headers(exchange.input_mut());
        let input = exchange.input();
        let operation = match input.header_string(OPERATION) {
            Some(op) => op.parse::<Operation>()?,
            None => Operation::default(),
        };
        let strategy = self.endpoint.strategies().get_strategy(input)?;

        let mut data = strategy.resolve_model(input)?;
        for row in &mut data.rows {
            row.apply(self.endpoint.row_model());
        }
        debug!(
            table = %table.name(),
            %operation,
            rows = data.len(),
            "dispatching HBase operation"
        );

        match operation {
            Operation::Put => {
                let puts = data
                    .rows
                    .iter()
                    .map(Self::create_put)
                    .collect::<Result<Vec<_>, _>>()?;
                if puts.is_empty() {
                    return Ok(());
                }
                let rows = puts.len() as u64;
                let bytes = puts.iter().map(Put::heap_size).sum::<usize>() as u64;
                let written = match table.put(puts).await {
                    Ok(()) => table.flush_commits().await,
                    Err(e) => Err(e),
                };
                if let Err(e) = written {
                    // The handle goes back to the pool; the failed batch must not.
                    table.discard_pending();
                    return Err(e.into());
                }
                self.metrics.record_put(rows, bytes);
            }
            Operation::Get => {
                let mut results = Vec::with_capacity(data.len());
                for row in &data.rows {
                    results.push(Self::get_cells(&**table, row).await?);
                }
                self.metrics.record_get(results.len() as u64);
                if !results.is_empty() {
                    Self::write_output(exchange, strategy.as_ref(), results, false)?;
                }
            }
            Operation::Delete => {
                let deletes = data
                    .rows
                    .iter()
                    .map(Self::create_delete)
                    .collect::<Result<Vec<_>, _>>()?;
                if deletes.is_empty() {
                    return Ok(());
                }
                let rows = deletes.len() as u64;
                table.delete(deletes).await?;
                self.metrics.record_delete(rows);
            }
            Operation::Scan => {
                let max_results = match input.header_parsed::<usize>(MAX_SCAN_RESULTS) {
                    Some(Ok(max)) => max,
                    Some(Err(e)) => {
                        return Err(ConnectorError::ConfigurationError(format!(
                            "invalid {MAX_SCAN_RESULTS}: {e}"
                        )));
                    }
                    None => return Err(ConnectorError::MissingField("HBase max scan results")),
                };
                let start_row = input.header_string(FROM_ROW);

                // Each template row runs its own scan; the last one is returned.
                let mut results = Vec::new();
                for row in &data.rows {
                    results =
                        self.scan_cells(&**table, row, start_row.as_deref(), max_results).await?;
                }
                self.metrics.record_scan(results.len() as u64);
                if !results.is_empty() {
                    Self::write_output(exchange, strategy.as_ref(), results, true)?;
                }
            }
        }
        Ok(())
    }

    /// Fills gaps in the inbound headers with endpoint defaults.
    fn update_headers(&self, message: &mut Message) {
        let config = self.endpoint.config();
        if config.max_results != 0 && !message.has_header(MAX_SCAN_RESULTS) {
            message.set_header(MAX_SCAN_RESULTS, config.max_results);
        }
        if let Some(name) = &config.mapping_strategy_name {
            if !message.has_header(STRATEGY) {
                message.set_header(STRATEGY, name.as_str());
            }
        }
        if let Some(class_name) = &config.mapping_strategy_class_name {
            if !message.has_header(STRATEGY_CLASS_NAME) {
                message.set_header(STRATEGY_CLASS_NAME, class_name.as_str());
            }
        }
        if !message.has_header(OPERATION) {
            let operation = config.operation.unwrap_or_default();
            message.set_header(OPERATION, operation.header_value());
        }
    }

    /// Copies the inbound headers to the outbound message and lets the
    /// strategy write the results.
    fn write_output(
        exchange: &mut Exchange,
        strategy: &dyn CellMappingStrategy,
        rows: Vec<Row>,
        scan: bool,
    ) -> Result<(), ConnectorError> {
        let headers = exchange.input().headers().clone();
        let out = exchange.output_mut();
        for (name, value) in headers {
            out.set_header(name, value);
        }
        let data = RowBatch::from(rows);
        if scan {
            strategy.apply_scan_results(out, data)
        } else {
            strategy.apply_get_results(out, data)
        }
    }

    fn row_key(row: &Row) -> Result<Bytes, ConnectorError> {
        row.id
            .as_ref()
            .map(to_bytes)
            .ok_or(ConnectorError::MissingField("HBase row id"))
    }

    fn require_cells(row: &Row) -> Result<(), ConnectorError> {
        if row.cells().is_empty() {
            return Err(ConnectorError::MissingField("HBase cells"));
        }
        Ok(())
    }

    fn column(cell: &Cell) -> Result<(&str, &str), ConnectorError> {
        let family = cell
            .family
            .as_deref()
            .ok_or(ConnectorError::MissingField("HBase column family"))?;
        let qualifier = cell
            .qualifier
            .as_deref()
            .ok_or(ConnectorError::MissingField("HBase column"))?;
        Ok((family, qualifier))
    }

    /// One mutation writing every cell of the row; null values are written
    /// as empty byte strings. Values are converted to the cell's declared
    /// type first so reads with that type decode them.
    fn create_put(row: &Row) -> Result<Put, ConnectorError> {
        let key = Self::row_key(row)?;
        Self::require_cells(row)?;
        let mut put = Put::new(key);
        for cell in row.cells() {
            let (family, qualifier) = Self::column(cell)?;
            let value = match (&cell.value, cell.value_type) {
                (Some(value), Some(declared)) => to_bytes(&coerce(value, declared)?),
                (Some(value), None) => to_bytes(value),
                (None, _) => Bytes::new(),
            };
            put.add(field_bytes(family), field_bytes(qualifier), value);
        }
        Ok(put)
    }

    /// Reads the latest version of each requested cell of one row.
    async fn get_cells(table: &dyn Table, row: &Row) -> Result<Row, ConnectorError> {
        let key = Self::row_key(row)?;
        Self::require_cells(row)?;

        let mut get = Get::new(key);
        for cell in row.cells() {
            let (family, qualifier) = Self::column(cell)?;
            get.add_column(field_bytes(family), field_bytes(qualifier));
        }
        let result = table.get(&get).await?;

        let mut result_row = Row::new();
        result_row.id.clone_from(&row.id);
        result_row.row_type = row.row_type;
        result_row.timestamp = result.raw().first().map(|kv| kv.timestamp);

        for cell in row.cells() {
            let (family, qualifier) = Self::column(cell)?;
            let mut result_cell = Cell::new(family, qualifier);
            result_cell.value_type = cell.value_type;
            if let Some(latest) = result.column(family.as_bytes(), qualifier.as_bytes()).first() {
                result_cell.value = Some(from_bytes(&latest.value, cell.value_type())?);
                result_cell.timestamp = Some(latest.timestamp);
            }
            result_row.add_cell(result_cell);
        }
        Ok(result_row)
    }

    fn create_delete(row: &Row) -> Result<Delete, ConnectorError> {
        Ok(Delete::new(Self::row_key(row)?))
    }

    /// Scans from `start_row` using `model` as the cell template.
    async fn scan_cells(
        &self,
        table: &dyn Table,
        model: &Row,
        start_row: Option<&str>,
        max_results: usize,
    ) -> Result<Vec<Row>, ConnectorError> {
        let mut scan = match start_row {
            Some(start) => Scan::starting_at(field_bytes(start)),
            None => Scan::new(),
        };
        if let Some(filter) = bind_templates(self.endpoint.filters(), model)? {
            scan.set_filter(filter);
        }
        for (family, qualifier) in template_columns(model) {
            scan.add_column(field_bytes(family), field_bytes(qualifier));
        }

        let mut scanner = table.scanner(&scan).await?;
        let rows = Self::collect_scan(scanner.as_mut(), model, max_results).await;
        scanner.close();
        rows
    }

    async fn collect_scan(
        scanner: &mut dyn ResultScanner,
        model: &Row,
        max_results: usize,
    ) -> Result<Vec<Row>, ConnectorError> {
        let mut rows = Vec::new();
        while rows.len() < max_results {
            let Some(result) = scanner.next().await? else {
                break;
            };
            let mut row = Row::new();
            row.id = Some(from_bytes(result.row(), model.row_type())?);
            row.row_type = model.row_type;
            row.timestamp = result.raw().first().map(|kv| kv.timestamp);

            // One result cell per template cell; unnamed ones stay null.
            for cell in model.cells() {
                let mut result_cell = Cell {
                    family: cell.family.clone(),
                    qualifier: cell.qualifier.clone(),
                    value_type: cell.value_type,
                    ..Cell::default()
                };
                if let Some((family, qualifier)) = non_empty_column(cell) {
                    if let Some(value) = result.value(family.as_bytes(), qualifier.as_bytes()) {
                        result_cell.value = Some(from_bytes(value, cell.value_type())?);
                    }
                    result_cell.timestamp = result
                        .column_latest(family.as_bytes(), qualifier.as_bytes())
                        .map(|kv| kv.timestamp);
                }
                row.add_cell(result_cell);
            }
            rows.push(row);
        }
        Ok(rows)
    }
}

fn non_empty_column(cell: &Cell) -> Option<(&str, &str)> {
    match (cell.family.as_deref(), cell.qualifier.as_deref()) {
        (Some(f), Some(q)) if !f.is_empty() && !q.is_empty() => Some((f, q)),
        _ => None,
    }
}

fn template_columns(model: &Row) -> impl Iterator<Item = (&str, &str)> {
    model.cells().iter().filter_map(non_empty_column)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hbase::{HBaseEndpointConfig, FAMILY, QUALIFIER, ROW_ID, VALUE};
    use cellbridge_core::{CellValue, InMemoryConnection, ValueType};

    fn producer(config: HBaseEndpointConfig) -> (InMemoryConnection, HBaseProducer) {
        let conn = InMemoryConnection::new();
        conn.create_table(&config.table_name);
        let endpoint = HBaseEndpoint::new(config, Arc::new(conn.clone())).unwrap();
        (conn, endpoint.into_producer())
    }

    #[test]
    fn test_create_put_requires_id_and_columns() {
        let row = Row::new().with_cell(Cell::new("f", "c"));
        assert!(matches!(
            HBaseProducer::create_put(&row),
            Err(ConnectorError::MissingField("HBase row id"))
        ));

        let row = Row::new().with_id("r1");
        assert!(matches!(
            HBaseProducer::create_put(&row),
            Err(ConnectorError::MissingField("HBase cells"))
        ));

        let mut cell = Cell::new("f", "c");
        cell.family = None;
        let row = Row::new().with_id("r1").with_cell(cell);
        assert!(matches!(
            HBaseProducer::create_put(&row),
            Err(ConnectorError::MissingField("HBase column family"))
        ));
    }

    #[test]
    fn test_create_put_encodes_cells() {
        let row = Row::new()
            .with_id("r1")
            .with_cell(Cell::new("f", "n").with_value(7i64))
            .with_cell(Cell::new("f", "empty"));
        let put = HBaseProducer::create_put(&row).unwrap();
        assert_eq!(put.row(), &Bytes::from_static(b"r1"));
        assert_eq!(&put.cells()[0].1[..], &7i64.to_be_bytes());
        assert!(put.cells()[1].1.is_empty());
    }

    #[test]
    fn test_create_delete_ignores_cells() {
        let row = Row::new().with_id("r1");
        assert_eq!(
            HBaseProducer::create_delete(&row).unwrap().row(),
            &Bytes::from_static(b"r1")
        );
        assert!(HBaseProducer::create_delete(&Row::new()).is_err());
    }

    #[test]
    fn test_template_columns_skip_incomplete_cells() {
        let mut no_family = Cell::new("", "c");
        no_family.value_type = Some(ValueType::Int32);
        let model = Row::new()
            .with_cell(Cell::new("f", "a"))
            .with_cell(no_family);
        let columns: Vec<_> = template_columns(&model).collect();
        assert_eq!(columns, vec![("f", "a")]);
    }

    #[test]
    fn test_create_put_converts_to_declared_type() {
        let row = Row::new().with_id("r1").with_cell(
            Cell::new("f", "n")
                .with_value("42")
                .with_value_type(ValueType::Int64),
        );
        let put = HBaseProducer::create_put(&row).unwrap();
        assert_eq!(&put.cells()[0].1[..], &42i64.to_be_bytes());

        let row = Row::new().with_id("r1").with_cell(
            Cell::new("f", "n")
                .with_value("abc")
                .with_value_type(ValueType::Int64),
        );
        assert!(matches!(
            HBaseProducer::create_put(&row),
            Err(ConnectorError::Conversion(_))
        ));
    }

    #[tokio::test]
    async fn test_scan_keeps_unnamed_template_cells() {
        let (conn, producer) = producer(HBaseEndpointConfig::new("t"));
        let mut exchange = Exchange::new(
            Message::new()
                .with_header(ROW_ID, "r1")
                .with_header(FAMILY, "f")
                .with_header(QUALIFIER, "a")
                .with_header(VALUE, "x"),
        );
        producer.process(&mut exchange).await.unwrap();
        assert_eq!(conn.row_count("t"), 1);

        let model = Row::new()
            .with_cell(Cell::new("f", "a"))
            .with_cell(Cell::new("", "c"));
        let table = checkout(producer.endpoint().pool()).await.unwrap();
        let rows = producer.scan_cells(&**table, &model, None, 10).await.unwrap();

        assert_eq!(rows.len(), 1);
        let cells = rows[0].cells();
        assert_eq!(cells.len(), 2);
        assert_eq!(cells[0].value, Some(CellValue::from("x")));
        assert_eq!(cells[1].family.as_deref(), Some(""));
        assert_eq!(cells[1].qualifier.as_deref(), Some("c"));
        assert!(cells[1].value.is_none());
        assert!(cells[1].timestamp.is_none());
    }

    #[tokio::test]
    async fn test_update_headers_fills_defaults() {
        let mut config = HBaseEndpointConfig::new("t");
        config.operation = Some(Operation::Scan);
        config.mapping_strategy_name = Some("header".into());
        let (_conn, producer) = producer(config);

        let mut msg = Message::new();
        producer.update_headers(&mut msg);
        assert_eq!(msg.header_string(OPERATION).as_deref(), Some("CamelHBaseScan"));
        assert_eq!(msg.header_parsed::<usize>(MAX_SCAN_RESULTS).unwrap().unwrap(), 100);
        assert_eq!(msg.header_string(STRATEGY).as_deref(), Some("header"));
        assert!(!msg.has_header(STRATEGY_CLASS_NAME));

        let mut msg = Message::new()
            .with_header(OPERATION, "CamelHBaseGet")
            .with_header(MAX_SCAN_RESULTS, 3);
        producer.update_headers(&mut msg);
        assert_eq!(msg.header_string(OPERATION).as_deref(), Some("CamelHBaseGet"));
        assert_eq!(msg.header_parsed::<usize>(MAX_SCAN_RESULTS).unwrap().unwrap(), 3);
    }

    #[tokio::test]
    async fn test_zero_max_results_is_not_defaulted() {
        let mut config = HBaseEndpointConfig::new("t");
        config.max_results = 0;
        let (_conn, producer) = producer(config);

        let mut msg = Message::new();
        producer.update_headers(&mut msg);
        assert!(!msg.has_header(MAX_SCAN_RESULTS));
        assert_eq!(msg.header_string(OPERATION).as_deref(), Some("CamelHBasePut"));
    }

    #[tokio::test]
    async fn test_scan_without_max_results_fails() {
        let mut config = HBaseEndpointConfig::new("t");
        config.max_results = 0;
        let (_conn, producer) = producer(config);

        let mut exchange = Exchange::new(
            Message::new()
                .with_header(OPERATION, "CamelHBaseScan")
                .with_header(FAMILY, "f")
                .with_header(QUALIFIER, "c"),
        );
        let err = producer.process(&mut exchange).await.unwrap_err();
        assert!(matches!(err, ConnectorError::MissingField("HBase max scan results")));
        assert_eq!(producer.metrics().to_connector_metrics().errors_total, 1);
    }

    #[tokio::test]
    async fn test_get_timestamps_follow_first_raw_cell() {
        let (_conn, producer) = producer(HBaseEndpointConfig::new("t"));
        let mut exchange = Exchange::new(
            Message::new()
                .with_header(ROW_ID, "r1")
                .with_header(FAMILY, "f")
                .with_header(QUALIFIER, "c")
                .with_header(VALUE, "v"),
        );
        producer.process(&mut exchange).await.unwrap();

        let table = checkout(producer.endpoint().pool()).await.unwrap();
        let row = Row::new()
            .with_id("r1")
            .with_cell(Cell::new("f", "c"))
            .with_cell(Cell::new("f", "missing"));
        let result = HBaseProducer::get_cells(&**table, &row).await.unwrap();
        let cell = result.cell("f", "c").unwrap();
        assert_eq!(cell.value, Some(CellValue::from("v")));
        assert_eq!(result.timestamp, cell.timestamp);
        assert!(result.cell("f", "missing").unwrap().value.is_none());
        assert!(result.cell("f", "missing").unwrap().timestamp.is_none());
    }
}
