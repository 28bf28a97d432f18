//! HBase producer metrics.
//!
//! [`HBaseProducerMetrics`] provides lock-free atomic counters for the
//! producer, convertible to the SDK's [`ConnectorMetrics`] type.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::metrics::ConnectorMetrics;

/// Atomic counters for HBase producer statistics.
#[derive(Debug, Default)]
pub struct HBaseProducerMetrics {
    /// PUT invocations.
    pub puts: AtomicU64,
    /// GET invocations.
    pub gets: AtomicU64,
    /// DELETE invocations.
    pub deletes: AtomicU64,
    /// SCAN invocations.
    pub scans: AtomicU64,
    /// Rows written by PUT.
    pub rows_written: AtomicU64,
    /// Rows removed by DELETE.
    pub rows_deleted: AtomicU64,
    /// Rows returned by GET and SCAN.
    pub rows_returned: AtomicU64,
    /// Approximate payload bytes written.
    pub bytes_written: AtomicU64,
    /// Failed invocations.
    pub errors: AtomicU64,
}

impl HBaseProducerMetrics {
    /// Creates a new metrics instance with all counters at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a flushed PUT batch.
    pub fn record_put(&self, rows: u64, bytes: u64) {
        self.puts.fetch_add(1, Ordering::Relaxed);
        self.rows_written.fetch_add(rows, Ordering::Relaxed);
        self.bytes_written.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Records a GET batch returning `rows` rows.
    pub fn record_get(&self, rows: u64) {
        self.gets.fetch_add(1, Ordering::Relaxed);
        self.rows_returned.fetch_add(rows, Ordering::Relaxed);
    }

    /// Records a DELETE batch.
    pub fn record_delete(&self, rows: u64) {
        self.deletes.fetch_add(1, Ordering::Relaxed);
        self.rows_deleted.fetch_add(rows, Ordering::Relaxed);
    }

    /// Records a SCAN returning `rows` rows.
    pub fn record_scan(&self, rows: u64) {
        self.scans.fetch_add(1, Ordering::Relaxed);
        self.rows_returned.fetch_add(rows, Ordering::Relaxed);
    }

    /// Records a failed invocation.
    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Converts to the SDK's [`ConnectorMetrics`].
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn to_connector_metrics(&self) -> ConnectorMetrics {
        let rows_written = self.rows_written.load(Ordering::Relaxed);
        let rows_deleted = self.rows_deleted.load(Ordering::Relaxed);
        let rows_returned = self.rows_returned.load(Ordering::Relaxed);
        let mut m = ConnectorMetrics {
            records_total: rows_written + rows_deleted + rows_returned,
            bytes_total: self.bytes_written.load(Ordering::Relaxed),
            errors_total: self.errors.load(Ordering::Relaxed),
            custom: Vec::new(),
        };
        m.add_custom("hbase.puts", self.puts.load(Ordering::Relaxed) as f64);
        m.add_custom("hbase.gets", self.gets.load(Ordering::Relaxed) as f64);
        m.add_custom("hbase.deletes", self.deletes.load(Ordering::Relaxed) as f64);
        m.add_custom("hbase.scans", self.scans.load(Ordering::Relaxed) as f64);
        m.add_custom("hbase.rows_written", rows_written as f64);
        m.add_custom("hbase.rows_deleted", rows_deleted as f64);
        m.add_custom("hbase.rows_returned", rows_returned as f64);
        m
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_zeros() {
        let cm = HBaseProducerMetrics::new().to_connector_metrics();
        assert_eq!(cm.records_total, 0);
        assert_eq!(cm.bytes_total, 0);
        assert_eq!(cm.errors_total, 0);
        assert_eq!(cm.custom.len(), 7);
    }

    #[test]
    fn test_combined_operations() {
        let m = HBaseProducerMetrics::new();
        m.record_put(3, 120);
        m.record_get(1);
        m.record_scan(2);
        m.record_delete(1);
        m.record_error();

        let cm = m.to_connector_metrics();
        assert_eq!(cm.records_total, 7);
        assert_eq!(cm.bytes_total, 120);
        assert_eq!(cm.errors_total, 1);
        assert_eq!(cm.custom_value("hbase.puts"), Some(1.0));
        assert_eq!(cm.custom_value("hbase.rows_returned"), Some(3.0));
        assert_eq!(cm.custom_value("hbase.scans"), Some(1.0));
    }
}
