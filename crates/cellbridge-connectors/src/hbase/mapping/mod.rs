//! Cell mapping strategies.
//!
//! A strategy turns an inbound [`Message`] into a [`RowBatch`] and writes
//! GET/SCAN results back onto the outbound message. Two strategies are
//! built in: [`HeaderMappingStrategy`] (numbered headers) and
//! [`BodyMappingStrategy`] (JSON body). Applications can register their own
//! under a name and select them with the `CamelMappingStrategyClassName`
//! header.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use cellbridge_core::RowBatch;

use super::{STRATEGY, STRATEGY_CLASS_NAME};
use crate::error::ConnectorError;
use crate::message::Message;

mod body;
mod header;

pub use body::BodyMappingStrategy;
pub use header::HeaderMappingStrategy;

/// Converts between messages and the row/cell model.
pub trait CellMappingStrategy: Send + Sync + fmt::Debug {
    /// Builds the rows a message describes.
    ///
    /// # Errors
    ///
    /// Fails if the message cannot be interpreted as rows.
    fn resolve_model(&self, message: &Message) -> Result<RowBatch, ConnectorError>;

    /// Writes GET results onto `out`.
    ///
    /// # Errors
    ///
    /// Fails if the results cannot be encoded.
    fn apply_get_results(&self, out: &mut Message, data: RowBatch) -> Result<(), ConnectorError>;

    /// Writes SCAN results onto `out`.
    ///
    /// # Errors
    ///
    /// Fails if the results cannot be encoded.
    fn apply_scan_results(&self, out: &mut Message, data: RowBatch)
        -> Result<(), ConnectorError>;
}

/// Built-in strategy names accepted by the `CamelMappingStrategy` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingStrategyName {
    /// [`HeaderMappingStrategy`]
    Header,
    /// [`BodyMappingStrategy`]
    Body,
}

str_enum!(MappingStrategyName, lowercase, "unknown mapping strategy",
    Header => "header";
    Body => "body"
);

/// Resolves the strategy for a message.
///
/// Resolution order: registered strategy named by
/// `CamelMappingStrategyClassName`, then the built-in named by
/// `CamelMappingStrategy`, then [`HeaderMappingStrategy`].
#[derive(Clone)]
pub struct CellMappingStrategyFactory {
    header: Arc<dyn CellMappingStrategy>,
    body: Arc<dyn CellMappingStrategy>,
    registered: HashMap<String, Arc<dyn CellMappingStrategy>>,
}

impl fmt::Debug for CellMappingStrategyFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.registered.keys().collect();
        names.sort();
        f.debug_struct("CellMappingStrategyFactory")
            .field("registered", &names)
            .finish_non_exhaustive()
    }
}

impl Default for CellMappingStrategyFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl CellMappingStrategyFactory {
    /// Creates a factory with only the built-in strategies.
    #[must_use]
    pub fn new() -> Self {
        Self {
            header: Arc::new(HeaderMappingStrategy),
            body: Arc::new(BodyMappingStrategy),
            registered: HashMap::new(),
        }
    }

    /// Registers a custom strategy under `class_name`, replacing any previous one.
    pub fn register(&mut self, class_name: impl Into<String>, strategy: Arc<dyn CellMappingStrategy>) {
        self.registered.insert(class_name.into(), strategy);
    }

    /// Looks up the strategy a message asks for.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::ConfigurationError`] for an unregistered
    /// class name or an unknown strategy name.
    pub fn get_strategy(
        &self,
        message: &Message,
    ) -> Result<Arc<dyn CellMappingStrategy>, ConnectorError> {
        if let Some(class_name) = message.header_string(STRATEGY_CLASS_NAME) {
            return self.registered.get(&class_name).cloned().ok_or_else(|| {
                ConnectorError::ConfigurationError(format!(
                    "unknown mapping strategy class: '{class_name}'"
                ))
            });
        }
        let strategy = match message.header_string(STRATEGY) {
            Some(name) => match name.parse::<MappingStrategyName>()? {
                MappingStrategyName::Header => &self.header,
                MappingStrategyName::Body => &self.body,
            },
            None => &self.header,
        };
        Ok(Arc::clone(strategy))
    }
}
