//! Message - one producer notification

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::Label;

/// Endpoint used when the producer does not name one
pub const DEFAULT_ENDPOINT: &str = "key";

/// Immutable notification payload.
///
/// Created once per `notify` call. The payload is `Bytes`, so handing the
/// message to N concurrent sends only bumps a reference count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Topic the message is published on
    pub label: Label,

    /// Producer-supplied endpoint, if any
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Raw payload
    pub payload: Bytes,
}

impl Message {
    pub fn new(label: impl Into<Label>, payload: impl Into<Bytes>) -> Self {
        Self {
            label: label.into(),
            endpoint: None,
            payload: payload.into(),
        }
    }

    /// Set the destination hint
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Endpoint handed to transports, falling back to `default`
    pub fn endpoint_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.endpoint.as_deref().unwrap_or(default)
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_fallback() {
        let msg = Message::new("FOO", &b"hi"[..]);
        assert_eq!(msg.endpoint_or(DEFAULT_ENDPOINT), "key");

        let msg = msg.with_endpoint("jobs");
        assert_eq!(msg.endpoint_or(DEFAULT_ENDPOINT), "jobs");
    }

    #[test]
    fn test_clone_shares_payload() {
        let msg = Message::new("FOO", vec![1u8, 2, 3]);
        let copy = msg.clone();
        assert_eq!(msg.payload.as_ptr(), copy.payload.as_ptr());
        assert_eq!(copy.len(), 3);
    }
}
