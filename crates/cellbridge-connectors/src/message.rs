//! Minimal message and exchange model.
//!
//! A [`Message`] carries named JSON headers and an optional JSON body. An
//! [`Exchange`] pairs the inbound message with the outbound message a
//! producer writes its results to.

use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A routed message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(default)]
    headers: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    body: Option<Value>,
}

impl Message {
    /// Creates a message with no headers and no body.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a header, builder style.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set_header(name, value);
        self
    }

    /// Sets the body, builder style.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Value>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Raw header value. A JSON `null` counts as absent.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&Value> {
        self.headers.get(name).filter(|v| !v.is_null())
    }

    /// Whether a non-null header is present.
    #[must_use]
    pub fn has_header(&self, name: &str) -> bool {
        self.header(name).is_some()
    }

    /// Header rendered as text: strings as-is, other scalars via JSON.
    #[must_use]
    pub fn header_string(&self, name: &str) -> Option<String> {
        self.header(name).map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }

    /// Header parsed from its text form.
    ///
    /// Returns `Some(Err(..))` when the header is present but does not parse.
    pub fn header_parsed<T: FromStr>(&self, name: &str) -> Option<Result<T, T::Err>> {
        self.header_string(name).map(|s| s.trim().parse())
    }

    /// Sets a header, replacing any previous value.
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.headers.insert(name.into(), value.into());
    }

    /// All headers.
    #[must_use]
    pub fn headers(&self) -> &BTreeMap<String, Value> {
        &self.headers
    }

    /// Message body.
    #[must_use]
    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    /// Replaces the body.
    pub fn set_body(&mut self, body: impl Into<Value>) {
        self.body = Some(body.into());
    }
}

/// An inbound message and the outbound message produced for it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Exchange {
    input: Message,
    output: Option<Message>,
}

impl Exchange {
    /// Wraps an inbound message.
    #[must_use]
    pub fn new(input: Message) -> Self {
        Self {
            input,
            output: None,
        }
    }

    /// Inbound message.
    #[must_use]
    pub fn input(&self) -> &Message {
        &self.input
    }

    /// Inbound message, mutable.
    pub fn input_mut(&mut self) -> &mut Message {
        &mut self.input
    }

    /// Outbound message, if anything was written to it.
    #[must_use]
    pub fn output(&self) -> Option<&Message> {
        self.output.as_ref()
    }

    /// Outbound message, created empty on first access.
    pub fn output_mut(&mut self) -> &mut Message {
        self.output.get_or_insert_with(Message::default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_null_header_is_absent() {
        let msg = Message::new().with_header("a", Value::Null).with_header("b", 0);
        assert!(!msg.has_header("a"));
        assert!(msg.header_string("a").is_none());
        assert!(msg.has_header("b"));
    }

    #[test]
    fn test_header_string_and_parsed() {
        let msg = Message::new()
            .with_header("n", 42)
            .with_header("s", "r1")
            .with_header("t", " 7 ");
        assert_eq!(msg.header_string("n").as_deref(), Some("42"));
        assert_eq!(msg.header_string("s").as_deref(), Some("r1"));
        assert_eq!(msg.header_parsed::<usize>("t").unwrap().unwrap(), 7);
        assert!(msg.header_parsed::<usize>("s").unwrap().is_err());
        assert!(msg.header_parsed::<usize>("missing").is_none());
    }

    #[test]
    fn test_output_created_on_demand() {
        let mut exchange = Exchange::new(Message::new().with_body(json!({"k": 1})));
        assert!(exchange.output().is_none());
        exchange.output_mut().set_header("x", "y");
        let out = exchange.output().unwrap();
        assert_eq!(out.header_string("x").as_deref(), Some("y"));
        assert!(out.body().is_none());
    }
}
