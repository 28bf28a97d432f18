//! # cellbridge core
//!
//! Row and cell model, type conversion, scan filters and the store client
//! contract shared by the cellbridge connectors.
//!
//! - [`model`]: rows, cells and typed values
//! - [`convert`]: typed values to and from store bytes
//! - [`client`]: table handles, mutations, queries and results
//! - [`filter`]: server-side filters and model-aware filter templates
//! - [`memory`]: an in-process store implementing [`client::TableConnection`]
//! - [`pool`]: pooled table handles

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod client;
pub mod convert;
pub mod filter;
pub mod memory;
pub mod model;
pub mod pool;

pub use client::{
    Column, Delete, Get, KeyValue, Put, ResultScanner, Scan, StoreError, StoreResult, Table,
    TableConnection,
};
pub use convert::ConversionError;
pub use filter::{
    bind_templates, ColumnMatchingFilter, CompareOp, Filter, FilterListOperator, FilterTemplate,
    ModelAwareFilter,
};
pub use memory::InMemoryConnection;
pub use model::{Cell, CellValue, Row, RowBatch, ValueType};
pub use pool::{build_table_pool, checkout, PooledTable, TablePool, DEFAULT_POOL_MAX_SIZE};
