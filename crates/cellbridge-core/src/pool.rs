//! Pooled table handles.
//!
//! A [`TablePool`] hands out [`Table`] handles for one table name, opened
//! lazily through a shared [`TableConnection`]. Mutations are only sent by
//! an explicit flush; whatever a handle still buffers when it is recycled
//! is dropped, so a failed write never commits under a later checkout.

use std::sync::Arc;

use deadpool::managed::{self, Metrics, PoolError, RecycleResult};
use tracing::{debug, info, warn};

use crate::client::{StoreError, Table, TableConnection};

/// Default upper bound on pooled handles per table.
pub const DEFAULT_POOL_MAX_SIZE: usize = 10;

/// Pool of handles on one table.
pub type TablePool = managed::Pool<TableManager>;

/// A handle checked out of a [`TablePool`]; returns to the pool on drop.
pub type PooledTable = managed::Object<TableManager>;

/// Opens and recycles handles on one table.
pub struct TableManager {
    connection: Arc<dyn TableConnection>,
    table_name: String,
}

impl std::fmt::Debug for TableManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableManager")
            .field("table_name", &self.table_name)
            .finish_non_exhaustive()
    }
}

impl TableManager {
    /// Creates a manager for `table_name`.
    pub fn new(connection: Arc<dyn TableConnection>, table_name: impl Into<String>) -> Self {
        Self {
            connection,
            table_name: table_name.into(),
        }
    }

    /// Table this manager opens.
    #[must_use]
    pub fn table_name(&self) -> &str {
        &self.table_name
    }
}

impl managed::Manager for TableManager {
    type Type = Box<dyn Table>;
    type Error = StoreError;

    async fn create(&self) -> Result<Box<dyn Table>, StoreError> {
        debug!(table = %self.table_name, "opening table handle");
        self.connection.table(&self.table_name).await
    }

    async fn recycle(
        &self,
        table: &mut Box<dyn Table>,
        _metrics: &Metrics,
    ) -> RecycleResult<StoreError> {
        let dropped = table.discard_pending();
        if dropped > 0 {
            warn!(table = %self.table_name, dropped, "discarded unflushed mutations");
        }
        Ok(())
    }
}

/// Builds a pool of at most `max_size` handles on `table_name`.
///
/// No handle is opened until the first checkout.
///
/// # Errors
///
/// Returns [`StoreError::Pool`] if the pool cannot be built.
pub fn build_table_pool(
    connection: Arc<dyn TableConnection>,
    table_name: &str,
    max_size: usize,
) -> Result<TablePool, StoreError> {
    let max_size = max_size.max(1);
    let pool = managed::Pool::builder(TableManager::new(connection, table_name))
        .max_size(max_size)
        .build()
        .map_err(|e| StoreError::Pool(format!("pool creation failed: {e}")))?;
    info!(table = %table_name, max_size, "created table pool");
    Ok(pool)
}

/// Checks a handle out of `pool`.
///
/// # Errors
///
/// Backend failures while opening the handle are returned as-is; every
/// other pool failure becomes [`StoreError::Pool`].
pub async fn checkout(pool: &TablePool) -> Result<PooledTable, StoreError> {
    pool.get().await.map_err(|e| match e {
        PoolError::Backend(e) => e,
        other => StoreError::Pool(format!("pool get failed: {other}")),
    })
}
