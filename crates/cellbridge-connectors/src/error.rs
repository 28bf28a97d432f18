//! Connector error type.

use cellbridge_core::{ConversionError, StoreError};
use thiserror::Error;

/// Errors raised by connectors.
#[derive(Debug, Error)]
pub enum ConnectorError {
    /// A message did not carry a field the operation needs.
    #[error("{0} must be specified")]
    MissingField(&'static str),

    /// A required configuration key is missing.
    #[error("missing config: {0}")]
    MissingConfig(String),

    /// A configuration value is invalid.
    #[error("configuration error: {0}")]
    ConfigurationError(String),

    /// Could not reach the external system.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// A value could not be converted to or from store bytes.
    #[error("conversion error: {0}")]
    Conversion(#[from] ConversionError),

    /// The store rejected or failed a request.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// A message body could not be (de)serialized.
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_field_message() {
        let err = ConnectorError::MissingField("HBase row id");
        assert_eq!(err.to_string(), "HBase row id must be specified");
    }

    #[test]
    fn test_from_store_error() {
        let err: ConnectorError = StoreError::TableNotFound("t".into()).into();
        assert!(matches!(err, ConnectorError::Store(StoreError::TableNotFound(ref t)) if t == "t"));
    }

    #[test]
    fn test_from_conversion_error() {
        let err: ConnectorError = ConversionError::UnknownType("uuid".into()).into();
        assert!(err.to_string().contains("uuid"));
    }
}
