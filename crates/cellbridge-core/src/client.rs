//! Store client contract for column-family tables.
//!
//! [`TableConnection`] opens [`Table`] handles; a handle issues batched
//! puts with an explicit flush, point gets, batched deletes and range
//! scans. Everything on this layer is raw bytes; typed conversion lives in
//! [`crate::convert`].
//!
//! ## Result ordering
//!
//! [`StoreResult`] keeps its cells sorted by family, then qualifier, then
//! timestamp descending, the order the store returns them in. Callers that
//! need the newest version of a column use [`StoreResult::column_latest`]
//! or [`StoreResult::value`]; [`StoreResult::raw`] exposes the store order.

use async_trait::async_trait;
use bytes::Bytes;

use crate::filter::Filter;

/// Errors from the store client or its connection pool.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Connection to the cluster failed.
    #[error("connection failed: {0}")]
    Connection(String),

    /// The requested table does not exist.
    #[error("table not found: {0}")]
    TableNotFound(String),

    /// The store rejected or failed a request.
    #[error("request failed: {0}")]
    Request(String),

    /// A table handle could not be checked out of the pool.
    #[error("pool: {0}")]
    Pool(String),
}

/// A `(family, qualifier)` column address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Column {
    /// Column family
    pub family: Bytes,
    /// Column qualifier
    pub qualifier: Bytes,
}

impl Column {
    /// Creates a column address.
    pub fn new(family: impl Into<Bytes>, qualifier: impl Into<Bytes>) -> Self {
        Self {
            family: family.into(),
            qualifier: qualifier.into(),
        }
    }
}

/// One stored version of one cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValue {
    /// Row key
    pub row: Bytes,
    /// Column family
    pub family: Bytes,
    /// Column qualifier
    pub qualifier: Bytes,
    /// Version timestamp (milliseconds)
    pub timestamp: i64,
    /// Stored value
    pub value: Bytes,
}

impl KeyValue {
    /// Whether this entry belongs to `family:qualifier`.
    #[must_use]
    pub fn matches_column(&self, family: &[u8], qualifier: &[u8]) -> bool {
        self.family.as_ref() == family && self.qualifier.as_ref() == qualifier
    }
}

/// A single-row mutation writing one or more cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Put {
    row: Bytes,
    cells: Vec<(Column, Bytes)>,
}

impl Put {
    /// Creates a mutation for `row`.
    pub fn new(row: impl Into<Bytes>) -> Self {
        Self {
            row: row.into(),
            cells: Vec::new(),
        }
    }

    /// Adds a cell write.
    pub fn add(&mut self, family: Bytes, qualifier: Bytes, value: Bytes) -> &mut Self {
        self.cells.push((Column::new(family, qualifier), value));
        self
    }

    /// Row key.
    #[must_use]
    pub fn row(&self) -> &Bytes {
        &self.row
    }

    /// Cell writes in insertion order.
    #[must_use]
    pub fn cells(&self) -> &[(Column, Bytes)] {
        &self.cells
    }

    /// Approximate payload size in bytes.
    #[must_use]
    pub fn heap_size(&self) -> usize {
        self.row.len()
            + self
                .cells
                .iter()
                .map(|(c, v)| c.family.len() + c.qualifier.len() + v.len())
                .sum::<usize>()
    }
}

/// A single-row point query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Get {
    row: Bytes,
    columns: Vec<Column>,
    max_versions: usize,
}

impl Get {
    /// Creates a point query for `row`, returning the newest version only.
    pub fn new(row: impl Into<Bytes>) -> Self {
        Self {
            row: row.into(),
            columns: Vec::new(),
            max_versions: 1,
        }
    }

    /// Restricts the query to `family:qualifier`. No columns means all.
    pub fn add_column(&mut self, family: Bytes, qualifier: Bytes) -> &mut Self {
        self.columns.push(Column::new(family, qualifier));
        self
    }

    /// Sets how many versions per column to return.
    pub fn set_max_versions(&mut self, max_versions: usize) -> &mut Self {
        self.max_versions = max_versions.max(1);
        self
    }

    /// Row key.
    #[must_use]
    pub fn row(&self) -> &Bytes {
        &self.row
    }

    /// Requested columns.
    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Versions per column.
    #[must_use]
    pub fn max_versions(&self) -> usize {
        self.max_versions
    }
}

/// A whole-row delete (all families, all versions).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delete {
    row: Bytes,
}

impl Delete {
    /// Creates a delete for `row`.
    pub fn new(row: impl Into<Bytes>) -> Self {
        Self { row: row.into() }
    }

    /// Row key.
    #[must_use]
    pub fn row(&self) -> &Bytes {
        &self.row
    }
}

/// A range query over rows in key order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scan {
    start_row: Option<Bytes>,
    columns: Vec<Column>,
    filter: Option<Filter>,
}

impl Scan {
    /// Scans from the first row.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Scans from `start_row` (inclusive).
    pub fn starting_at(start_row: impl Into<Bytes>) -> Self {
        Self {
            start_row: Some(start_row.into()),
            ..Self::default()
        }
    }

    /// Restricts the scan to `family:qualifier`. No columns means all.
    pub fn add_column(&mut self, family: Bytes, qualifier: Bytes) -> &mut Self {
        self.columns.push(Column::new(family, qualifier));
        self
    }

    /// Sets the server-side filter.
    pub fn set_filter(&mut self, filter: Filter) -> &mut Self {
        self.filter = Some(filter);
        self
    }

    /// Inclusive start row, if any.
    #[must_use]
    pub fn start_row(&self) -> Option<&Bytes> {
        self.start_row.as_ref()
    }

    /// Requested columns.
    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Server-side filter, if any.
    #[must_use]
    pub fn filter(&self) -> Option<&Filter> {
        self.filter.as_ref()
    }
}

/// The cells returned for one row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreResult {
    row: Bytes,
    cells: Vec<KeyValue>,
}

impl StoreResult {
    /// Builds a result, sorting cells into store order.
    #[must_use]
    pub fn new(row: Bytes, mut cells: Vec<KeyValue>) -> Self {
        cells.sort_by(|a, b| {
            a.family
                .cmp(&b.family)
                .then_with(|| a.qualifier.cmp(&b.qualifier))
                .then_with(|| b.timestamp.cmp(&a.timestamp))
        });
        Self { row, cells }
    }

    /// An empty result (row not found).
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether the result carries no cells.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Row key; empty for an empty result.
    #[must_use]
    pub fn row(&self) -> &Bytes {
        &self.row
    }

    /// All cells in store order.
    #[must_use]
    pub fn raw(&self) -> &[KeyValue] {
        &self.cells
    }

    /// All returned versions of `family:qualifier`, newest first.
    #[must_use]
    pub fn column(&self, family: &[u8], qualifier: &[u8]) -> Vec<&KeyValue> {
        self.cells
            .iter()
            .filter(|kv| kv.matches_column(family, qualifier))
            .collect()
    }

    /// Newest version of `family:qualifier`.
    #[must_use]
    pub fn column_latest(&self, family: &[u8], qualifier: &[u8]) -> Option<&KeyValue> {
        self.cells
            .iter()
            .filter(|kv| kv.matches_column(family, qualifier))
            .max_by_key(|kv| kv.timestamp)
    }

    /// Value of the newest version of `family:qualifier`.
    #[must_use]
    pub fn value(&self, family: &[u8], qualifier: &[u8]) -> Option<&Bytes> {
        self.column_latest(family, qualifier).map(|kv| &kv.value)
    }
}

/// Iterator over scan results.
#[async_trait]
pub trait ResultScanner: Send {
    /// Next row in store order, or `None` once exhausted.
    async fn next(&mut self) -> Result<Option<StoreResult>, StoreError>;

    /// Releases server-side scanner resources. Default: no-op.
    fn close(&mut self) {}
}

/// A handle on one table.
///
/// Handles are not required to be shared across tasks; pools hand out
/// one handle per concurrent user.
#[async_trait]
pub trait Table: Send + Sync {
    /// Table name for logging and metrics.
    fn name(&self) -> &str;

    /// Buffers mutations. They become visible after [`flush_commits`](Self::flush_commits).
    async fn put(&mut self, puts: Vec<Put>) -> Result<(), StoreError>;

    /// Sends all buffered mutations.
    async fn flush_commits(&mut self) -> Result<(), StoreError>;

    /// Drops buffered mutations without sending them. Returns how many
    /// were dropped.
    fn discard_pending(&mut self) -> usize;

    /// Executes a point query.
    async fn get(&self, get: &Get) -> Result<StoreResult, StoreError>;

    /// Deletes whole rows.
    async fn delete(&mut self, deletes: Vec<Delete>) -> Result<(), StoreError>;

    /// Opens a scanner.
    async fn scanner(&self, scan: &Scan) -> Result<Box<dyn ResultScanner>, StoreError>;
}

/// A cluster connection that opens table handles.
#[async_trait]
pub trait TableConnection: Send + Sync {
    /// Opens a handle on `name`.
    async fn table(&self, name: &str) -> Result<Box<dyn Table>, StoreError>;
}
