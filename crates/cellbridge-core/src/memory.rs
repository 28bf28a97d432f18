//! In-memory column-family store.
//!
//! [`InMemoryConnection`] implements [`TableConnection`] over sorted,
//! versioned, in-process tables. Writes are buffered per handle until
//! [`Table::flush_commits`], deletes apply immediately, and scans evaluate
//! filters against the projected newest versions. Used by the test suites
//! and for embedded deployments without a cluster.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::SystemTime;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use tracing::debug;

use crate::client::{
    Column, Delete, Get, KeyValue, Put, ResultScanner, Scan, StoreError, StoreResult, Table,
    TableConnection,
};

/// Versions kept per cell unless configured otherwise.
pub const DEFAULT_MAX_VERSIONS: usize = 3;

/// `(timestamp, value)` pairs, newest first.
type Versions = Vec<(i64, Bytes)>;
type RowData = BTreeMap<Column, Versions>;

#[derive(Debug)]
struct MemTable {
    name: String,
    rows: RwLock<BTreeMap<Bytes, RowData>>,
}

/// Monotonic millisecond clock shared by every table of a connection.
#[derive(Debug, Default)]
struct VersionClock {
    last: AtomicI64,
}

impl VersionClock {
    /// Wall-clock milliseconds, bumped so consecutive calls never repeat.
    #[allow(clippy::cast_possible_truncation)]
    fn next(&self) -> i64 {
        let now = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as i64;
        let mut ts = now;
        let _ = self
            .last
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |last| {
                ts = now.max(last + 1);
                Some(ts)
            });
        ts
    }
}

#[derive(Debug)]
struct ConnectionInner {
    tables: RwLock<HashMap<String, Arc<MemTable>>>,
    clock: VersionClock,
    max_versions: usize,
}

/// An in-process "cluster" holding named tables.
///
/// Cloning is cheap; clones share the same tables.
#[derive(Debug, Clone)]
pub struct InMemoryConnection {
    inner: Arc<ConnectionInner>,
}

impl Default for InMemoryConnection {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryConnection {
    /// Creates an empty store keeping [`DEFAULT_MAX_VERSIONS`] per cell.
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_versions(DEFAULT_MAX_VERSIONS)
    }

    /// Creates an empty store keeping `max_versions` per cell (at least 1).
    #[must_use]
    pub fn with_max_versions(max_versions: usize) -> Self {
        Self {
            inner: Arc::new(ConnectionInner {
                tables: RwLock::new(HashMap::new()),
                clock: VersionClock::default(),
                max_versions: max_versions.max(1),
            }),
        }
    }

    /// Creates `name` if it does not exist yet.
    pub fn create_table(&self, name: &str) {
        self.inner
            .tables
            .write()
            .entry(name.to_string())
            .or_insert_with(|| {
                Arc::new(MemTable {
                    name: name.to_string(),
                    rows: RwLock::new(BTreeMap::new()),
                })
            });
    }

    /// Number of rows currently stored in `name` (0 for unknown tables).
    #[must_use]
    pub fn row_count(&self, name: &str) -> usize {
        self.inner
            .tables
            .read()
            .get(name)
            .map_or(0, |t| t.rows.read().len())
    }
}

#[async_trait]
impl TableConnection for InMemoryConnection {
    async fn table(&self, name: &str) -> Result<Box<dyn Table>, StoreError> {
        let table = self
            .inner
            .tables
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::TableNotFound(name.to_string()))?;
        Ok(Box::new(InMemoryTable {
            table,
            connection: Arc::clone(&self.inner),
            write_buffer: Vec::new(),
        }))
    }
}

/// A handle on one in-memory table with its own write buffer.
#[derive(Debug)]
pub struct InMemoryTable {
    table: Arc<MemTable>,
    connection: Arc<ConnectionInner>,
    write_buffer: Vec<Put>,
}

/// Projects a stored row onto the requested columns, newest versions first.
fn project(row: &Bytes, data: &RowData, columns: &[Column], max_versions: usize) -> Vec<KeyValue> {
    data.iter()
        .filter(|(column, _)| columns.is_empty() || columns.contains(column))
        .flat_map(|(column, versions)| {
            versions.iter().take(max_versions).map(|(ts, value)| KeyValue {
                row: row.clone(),
                family: column.family.clone(),
                qualifier: column.qualifier.clone(),
                timestamp: *ts,
                value: value.clone(),
            })
        })
        .collect()
}

#[async_trait]
impl Table for InMemoryTable {
    fn name(&self) -> &str {
        &self.table.name
    }

    async fn put(&mut self, puts: Vec<Put>) -> Result<(), StoreError> {
        if puts.iter().any(|p| p.row().is_empty()) {
            return Err(StoreError::Request("row key must not be empty".into()));
        }
        self.write_buffer.extend(puts);
        Ok(())
    }

    fn discard_pending(&mut self) -> usize {
        let dropped = self.write_buffer.len();
        self.write_buffer.clear();
        dropped
    }

    async fn flush_commits(&mut self) -> Result<(), StoreError> {
        if self.write_buffer.is_empty() {
            return Ok(());
        }
        let puts = std::mem::take(&mut self.write_buffer);
        let max_versions = self.connection.max_versions;
        let mut rows = self.table.rows.write();
        for put in &puts {
            let ts = self.connection.clock.next();
            let data = rows.entry(put.row().clone()).or_default();
            for (column, value) in put.cells() {
                let versions = data.entry(column.clone()).or_default();
                versions.insert(0, (ts, value.clone()));
                versions.truncate(max_versions);
            }
        }
        debug!(table = %self.table.name, mutations = puts.len(), "flushed commits");
        Ok(())
    }

    async fn get(&self, get: &Get) -> Result<StoreResult, StoreError> {
        let rows = self.table.rows.read();
        let Some(data) = rows.get(get.row()) else {
            return Ok(StoreResult::empty());
        };
        let cells = project(get.row(), data, get.columns(), get.max_versions());
        if cells.is_empty() {
            return Ok(StoreResult::empty());
        }
        Ok(StoreResult::new(get.row().clone(), cells))
    }

    async fn delete(&mut self, deletes: Vec<Delete>) -> Result<(), StoreError> {
        let mut rows = self.table.rows.write();
        for delete in &deletes {
            rows.remove(delete.row());
        }
        Ok(())
    }

    async fn scanner(&self, scan: &Scan) -> Result<Box<dyn ResultScanner>, StoreError> {
        let rows = self.table.rows.read();
        let range = match scan.start_row() {
            Some(start) => rows.range(start.clone()..),
            None => rows.range::<Bytes, _>(..),
        };
        // Snapshot at open time; later writes are not observed.
        let results: VecDeque<StoreResult> = range
            .filter_map(|(key, data)| {
                let cells = project(key, data, scan.columns(), 1);
                if cells.is_empty() {
                    return None;
                }
                if let Some(filter) = scan.filter() {
                    if !filter.matches(key, &cells) {
                        return None;
                    }
                }
                Some(StoreResult::new(key.clone(), cells))
            })
            .collect();
        Ok(Box::new(InMemoryScanner { results }))
    }
}

struct InMemoryScanner {
    results: VecDeque<StoreResult>,
}

#[async_trait]
impl ResultScanner for InMemoryScanner {
    async fn next(&mut self) -> Result<Option<StoreResult>, StoreError> {
        Ok(self.results.pop_front())
    }

    fn close(&mut self) {
        self.results.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{CompareOp, Filter};

    fn b(s: &'static str) -> Bytes {
        Bytes::from_static(s.as_bytes())
    }

    fn put(row: &'static str, qualifier: &'static str, value: &'static str) -> Put {
        let mut put = Put::new(b(row));
        put.add(b("f"), b(qualifier), b(value));
        put
    }

    async fn drain(mut scanner: Box<dyn ResultScanner>) -> Vec<StoreResult> {
        let mut out = Vec::new();
        while let Some(r) = scanner.next().await.unwrap() {
            out.push(r);
        }
        out
    }

    #[tokio::test]
    async fn test_unknown_table() {
        let conn = InMemoryConnection::new();
        let err = conn.table("missing").await.err().unwrap();
        assert!(matches!(err, StoreError::TableNotFound(name) if name == "missing"));
    }

    #[tokio::test]
    async fn test_puts_invisible_until_flush() {
        let conn = InMemoryConnection::new();
        conn.create_table("t");
        let mut table = conn.table("t").await.unwrap();

        table.put(vec![put("r1", "c", "a")]).await.unwrap();
        let mut get = Get::new(b("r1"));
        get.add_column(b("f"), b("c"));
        assert!(table.get(&get).await.unwrap().is_empty());
        assert_eq!(conn.row_count("t"), 0);

        table.flush_commits().await.unwrap();
        let result = table.get(&get).await.unwrap();
        assert_eq!(result.value(b"f", b"c").unwrap(), "a");
        assert_eq!(conn.row_count("t"), 1);
    }

    #[tokio::test]
    async fn test_empty_row_key_rejected() {
        let conn = InMemoryConnection::new();
        conn.create_table("t");
        let mut table = conn.table("t").await.unwrap();

        let err = table.put(vec![put("", "c", "a")]).await.unwrap_err();
        assert!(matches!(err, StoreError::Request(_)));
        table.flush_commits().await.unwrap();
        assert_eq!(conn.row_count("t"), 0);
    }

    #[tokio::test]
    async fn test_discard_pending_drops_buffer() {
        let conn = InMemoryConnection::new();
        conn.create_table("t");
        let mut table = conn.table("t").await.unwrap();

        table.put(vec![put("r1", "c", "a"), put("r2", "c", "b")]).await.unwrap();
        assert_eq!(table.discard_pending(), 2);
        table.flush_commits().await.unwrap();
        assert_eq!(conn.row_count("t"), 0);
    }

    #[tokio::test]
    async fn test_versions_retained_and_capped() {
        let conn = InMemoryConnection::with_max_versions(2);
        conn.create_table("t");
        let mut table = conn.table("t").await.unwrap();
        for v in ["v1", "v2", "v3"] {
            table.put(vec![put("r1", "c", v)]).await.unwrap();
            table.flush_commits().await.unwrap();
        }

        let mut get = Get::new(b("r1"));
        get.add_column(b("f"), b("c")).set_max_versions(10);
        let result = table.get(&get).await.unwrap();
        let versions = result.column(b"f", b"c");
        assert_eq!(versions.len(), 2);
        assert_eq!(versions[0].value, "v3");
        assert_eq!(versions[1].value, "v2");
        assert!(versions[0].timestamp > versions[1].timestamp);
    }

    #[tokio::test]
    async fn test_delete_removes_all_families() {
        let conn = InMemoryConnection::new();
        conn.create_table("t");
        let mut table = conn.table("t").await.unwrap();
        let mut p = Put::new(b("r1"));
        p.add(b("f"), b("c"), b("a")).add(b("g"), b("c"), b("b"));
        table.put(vec![p]).await.unwrap();
        table.flush_commits().await.unwrap();

        table.delete(vec![Delete::new(b("r1"))]).await.unwrap();
        assert!(table.get(&Get::new(b("r1"))).await.unwrap().is_empty());
        assert_eq!(conn.row_count("t"), 0);
    }

    #[tokio::test]
    async fn test_scan_start_row_columns_and_filter() {
        let conn = InMemoryConnection::new();
        conn.create_table("t");
        let mut table = conn.table("t").await.unwrap();
        let mut p0 = put("r0", "c", "z");
        p0.add(b("f"), b("d"), b("extra"));
        table
            .put(vec![p0, put("r1", "c", "a"), put("r2", "c", "b"), put("r3", "d", "only-d")])
            .await
            .unwrap();
        table.flush_commits().await.unwrap();

        let mut scan = Scan::starting_at(b("r1"));
        scan.add_column(b("f"), b("c"));
        let results = drain(table.scanner(&scan).await.unwrap()).await;
        let keys: Vec<_> = results.iter().map(|r| r.row().clone()).collect();
        // r3 has no f:c so it is not returned
        assert_eq!(keys, vec![b("r1"), b("r2")]);

        let mut scan = Scan::new();
        scan.add_column(b("f"), b("c"));
        scan.set_filter(Filter::single_column_value("f", "c", CompareOp::Equal, b("b")));
        let results = drain(table.scanner(&scan).await.unwrap()).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].row(), &b("r2"));
        assert_eq!(results[0].raw().len(), 1);
    }

    #[tokio::test]
    async fn test_handles_have_independent_buffers() {
        let conn = InMemoryConnection::new();
        conn.create_table("t");
        let mut first = conn.table("t").await.unwrap();
        let mut second = conn.table("t").await.unwrap();

        first.put(vec![put("r1", "c", "a")]).await.unwrap();
        second.flush_commits().await.unwrap();
        assert_eq!(conn.row_count("t"), 0);

        first.flush_commits().await.unwrap();
        assert_eq!(conn.row_count("t"), 1);
    }

    #[test]
    fn test_clock_is_monotonic() {
        let clock = VersionClock::default();
        let a = clock.next();
        let b = clock.next();
        assert!(b > a);
    }
}
