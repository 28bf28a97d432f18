//! # cellbridge connectors
//!
//! Bridges routed messages to column-family stores.
//!
//! The [`hbase`] connector translates a message into a PUT, GET, DELETE or
//! SCAN against a pooled table handle and maps results back onto the
//! outbound message. [`config`], [`error`] and [`metrics`] hold the
//! connector SDK types shared by connectors; [`message`] is the minimal
//! message/exchange model producers operate on.

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

#[macro_use]
mod macros;

/// Flat key/value connector configuration
pub mod config;

/// Connector error type
pub mod error;

/// Connector metrics snapshot
pub mod metrics;

/// Message and exchange model
pub mod message;

/// HBase-style column store producer
pub mod hbase;

pub use config::ConnectorConfig;
pub use error::ConnectorError;
pub use message::{Exchange, Message};
pub use metrics::ConnectorMetrics;
